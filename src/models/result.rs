// src/models/result.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::models::quiz::QuestionDetail;

/// Represents the 'student_results' table in the database.
/// One immutable row per completed assessment session.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentResult {
    pub id: i64,

    /// Session id, doubling as the idempotency key for the insert.
    pub session_id: String,

    pub student_id: i64,
    pub quiz_id: i64,

    /// Count of correctly answered questions.
    pub score: i64,

    /// Question count of the quiz at session time.
    pub total_score: i64,

    /// Rounded percentage, 0-100.
    pub percentage: i64,

    pub passed: bool,

    /// Whole minutes spent before submission.
    pub duration_taken: i64,

    /// Frozen answer register: question id -> chosen option id.
    pub answers: Json<HashMap<i64, i64>>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A student's own result row, joined with the quiz title.
#[derive(Debug, Serialize, FromRow)]
pub struct MyResultRow {
    pub id: i64,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub score: i64,
    pub total_score: i64,
    pub percentage: i64,
    pub passed: bool,
    pub duration_taken: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A result row as seen by teachers and admins, joined with student
/// and quiz info.
#[derive(Debug, Serialize, FromRow)]
pub struct ResultOverviewRow {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub student_class: Option<String>,
    pub quiz_id: i64,
    pub quiz_title: String,
    pub target_class: String,
    pub score: i64,
    pub total_score: i64,
    pub percentage: i64,
    pub passed: bool,
    pub duration_taken: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregate stats over a set of results.
#[derive(Debug, Serialize)]
pub struct ResultStats {
    pub total_results: i64,
    pub average_percentage: i64,
    pub pass_rate: i64,
    pub distinct_students: i64,
}

/// Review payload for one result: the outcome plus the original
/// question/option data and the frozen answers, so the viewer needs
/// no second fetch.
#[derive(Debug, Serialize)]
pub struct ResultReview {
    pub result: StudentResult,
    pub quiz_title: String,
    pub questions: Vec<QuestionDetail>,
}
