// src/session/grader.rs

use serde::Serialize;

use crate::config::PASSING_PERCENTAGE;
use crate::session::loader::Assessment;
use crate::session::register::AnswerRegister;

/// Outcome of grading one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GradeOutcome {
    /// Count of questions whose chosen option is flagged correct.
    pub score: i64,
    /// Question count of the assessment.
    pub total: i64,
    /// Rounded percentage, 0-100. Defined as 0 for an empty assessment.
    pub percentage: i64,
    /// True iff percentage reached the passing threshold.
    pub passed: bool,
}

/// Grades an answer register against an assessment snapshot.
///
/// Pure and deterministic, no I/O. An unanswered question, or a choice
/// that does not resolve to an option of that question, counts as
/// incorrect. This matters for timer-expiry submissions, which proceed
/// with whatever answers exist.
pub fn grade(assessment: &Assessment, answers: &AnswerRegister) -> GradeOutcome {
    let total = assessment.question_count() as i64;

    let mut score = 0;
    for q in &assessment.questions {
        let chosen = answers
            .choice_for(q.question.id)
            .and_then(|option_id| assessment.option(q.question.id, option_id));
        if let Some(option) = chosen {
            if option.is_correct {
                score += 1;
            }
        }
    }

    // Guard: a zero-question assessment grades to 0%, not a division by zero.
    let percentage = if total == 0 {
        0
    } else {
        ((score as f64 / total as f64) * 100.0).round() as i64
    };

    GradeOutcome {
        score,
        total,
        percentage,
        passed: percentage >= PASSING_PERCENTAGE,
    }
}
