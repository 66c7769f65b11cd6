// src/session/loader.rs

use std::collections::HashMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::quiz::{Question, QuestionDetail, Quiz, QuizOption},
};

/// Immutable snapshot of one quiz, taken when a session starts.
///
/// The whole session (answering, grading, review payload) works off this
/// snapshot; server-side edits made mid-session are not observed.
#[derive(Debug, Clone, Serialize)]
pub struct Assessment {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionDetail>,
}

impl Assessment {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question_ids(&self) -> Vec<i64> {
        self.questions.iter().map(|q| q.question.id).collect()
    }

    pub fn question(&self, question_id: i64) -> Option<&QuestionDetail> {
        self.questions.iter().find(|q| q.question.id == question_id)
    }

    /// Looks up one option under one question. `None` if either id is
    /// unknown or the option does not belong to that question.
    pub fn option(&self, question_id: i64, option_id: i64) -> Option<&QuizOption> {
        self.question(question_id)?
            .options
            .iter()
            .find(|o| o.id == option_id)
    }

    pub fn time_limit_seconds(&self) -> u64 {
        self.quiz.time_limit.max(0) as u64 * 60
    }
}

/// Fetches a full assessment (quiz + ordered questions + ordered options)
/// in one logical read.
///
/// Surfaces not-found and transport failures to the caller; never retries.
pub async fn load_assessment(pool: &SqlitePool, quiz_id: i64) -> Result<Assessment, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE quiz_id = ? ORDER BY position, id",
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let options = sqlx::query_as::<_, QuizOption>(
        r#"
        SELECT o.*
        FROM quiz_options o
        JOIN questions q ON q.id = o.question_id
        WHERE q.quiz_id = ?
        ORDER BY o.position, o.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool)
    .await?;

    let mut by_question: HashMap<i64, Vec<QuizOption>> = HashMap::new();
    for option in options {
        by_question.entry(option.question_id).or_default().push(option);
    }

    let questions = questions
        .into_iter()
        .map(|question| {
            let options = by_question.remove(&question.id).unwrap_or_default();
            QuestionDetail { question, options }
        })
        .collect();

    Ok(Assessment { quiz, questions })
}
