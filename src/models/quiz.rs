// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Time limit for one session, in minutes.
    pub time_limit: i64,

    /// Class/grade the quiz is addressed to (e.g., "Terminale A").
    pub target_class: String,

    /// 'Active' quizzes are visible to students; 'Draft' ones are not.
    pub status: String,

    pub teacher_id: i64,
    pub school_id: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// Order of the question within the quiz.
    pub position: i64,

    /// The prompt text.
    pub text: String,

    /// Optional explanation shown during result review.
    pub explanation: Option<String>,
}

/// Represents the 'quiz_options' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: i64,
    pub question_id: i64,
    pub position: i64,
    pub text: String,
    pub is_correct: bool,
}

/// One question with its ordered options, as stored.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<QuizOption>,
}

/// Question DTO for students taking a quiz: the correct-answer flags and
/// the explanation stay server-side until the result review.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub position: i64,
    pub text: String,
    pub options: Vec<PublicOption>,
}

#[derive(Debug, Serialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

impl From<&QuestionDetail> for PublicQuestion {
    fn from(q: &QuestionDetail) -> Self {
        PublicQuestion {
            id: q.question.id,
            position: q.question.position,
            text: q.question.text.clone(),
            options: q
                .options
                .iter()
                .map(|o| PublicOption {
                    id: o.id,
                    text: o.text.clone(),
                })
                .collect(),
        }
    }
}

/// DTO for an option within a quiz save request. Serialize is needed by
/// the validator derive, which embeds offending values in its errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct OptionInput {
    pub text: String,
    pub is_correct: bool,
}

/// DTO for a question within a quiz save request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct QuestionInput {
    #[validate(length(min = 1, max = 2000, message = "Question text is required."))]
    pub text: String,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Vec<OptionInput>,
}

/// DTO for creating or updating a quiz with its full question set.
/// An update replaces the previous question set wholesale.
#[derive(Debug, Deserialize, Validate)]
pub struct SaveQuizRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required."))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 600, message = "Time limit must be between 1 and 600 minutes."))]
    pub time_limit: i64,
    #[validate(length(min = 1, max = 50, message = "Target class is required."))]
    pub target_class: String,
    /// Admins may author for any school; teachers fall back to their own.
    pub school_id: Option<i64>,
    #[validate(length(min = 1, message = "At least one question is required."), nested)]
    pub questions: Vec<QuestionInput>,
}

fn validate_options(options: &[OptionInput]) -> Result<(), validator::ValidationError> {
    if options.len() < 2 {
        return Err(validator::ValidationError::new("at_least_two_options"));
    }
    for opt in options {
        if opt.text.is_empty() || opt.text.len() > 500 {
            return Err(validator::ValidationError::new("option_text_length"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(option_count: usize) -> QuestionInput {
        QuestionInput {
            text: "A question".to_string(),
            explanation: None,
            options: (0..option_count)
                .map(|i| OptionInput {
                    text: format!("Option {}", i),
                    is_correct: i == 0,
                })
                .collect(),
        }
    }

    fn request(questions: Vec<QuestionInput>) -> SaveQuizRequest {
        SaveQuizRequest {
            title: "A quiz".to_string(),
            description: None,
            time_limit: 15,
            target_class: "T1".to_string(),
            school_id: None,
            questions,
        }
    }

    #[test]
    fn well_formed_request_validates() {
        assert!(request(vec![question(2), question(4)]).validate().is_ok());
    }

    #[test]
    fn empty_question_set_is_rejected() {
        assert!(request(vec![]).validate().is_err());
    }

    #[test]
    fn single_option_question_is_rejected() {
        assert!(request(vec![question(1)]).validate().is_err());
    }

    #[test]
    fn blank_option_text_is_rejected() {
        let mut q = question(2);
        q.options[1].text = String::new();
        assert!(request(vec![q]).validate().is_err());
    }
}
