// src/session/register.rs

use std::collections::HashMap;

/// In-memory record of a test-taker's choices during one session.
///
/// Maps question id to the chosen option id. Re-selecting a question
/// overwrites the prior choice; entries are never accumulated. Pure and
/// synchronous; validation of the ids against the loaded assessment is
/// the session's job.
#[derive(Debug, Clone, Default)]
pub struct AnswerRegister {
    choices: HashMap<i64, i64>,
}

impl AnswerRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets or overwrites the choice for a question.
    pub fn select(&mut self, question_id: i64, option_id: i64) {
        self.choices.insert(question_id, option_id);
    }

    pub fn choice_for(&self, question_id: i64) -> Option<i64> {
        self.choices.get(&question_id).copied()
    }

    pub fn answered_count(&self) -> usize {
        self.choices.len()
    }

    /// True iff every given question id has an entry.
    pub fn is_complete(&self, question_ids: &[i64]) -> bool {
        question_ids
            .iter()
            .all(|id| self.choices.contains_key(id))
    }

    /// Frozen copy for grading and persistence.
    pub fn snapshot(&self) -> HashMap<i64, i64> {
        self.choices.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_with_one_entry_per_question() {
        let ids = [1, 2, 3, 4];
        let mut reg = AnswerRegister::new();
        for id in ids {
            reg.select(id, 100 + id);
        }
        assert!(reg.is_complete(&ids));
        assert_eq!(reg.answered_count(), 4);
    }

    #[test]
    fn incomplete_with_one_missing() {
        let ids = [1, 2, 3, 4];
        let mut reg = AnswerRegister::new();
        for id in &ids[..3] {
            reg.select(*id, 9);
        }
        assert!(!reg.is_complete(&ids));
        assert_eq!(reg.answered_count(), 3);
    }

    #[test]
    fn reselect_overwrites_instead_of_accumulating() {
        let mut reg = AnswerRegister::new();
        reg.select(7, 70);
        reg.select(7, 71);
        assert_eq!(reg.answered_count(), 1);
        assert_eq!(reg.choice_for(7), Some(71));
    }

    #[test]
    fn empty_register_is_complete_for_no_questions() {
        let reg = AnswerRegister::new();
        assert!(reg.is_complete(&[]));
        assert!(!reg.is_complete(&[1]));
    }
}
