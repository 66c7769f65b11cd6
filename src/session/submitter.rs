// src/session/submitter.rs

use std::collections::HashMap;

use sqlx::{SqlitePool, types::Json};

use crate::{error::AppError, models::result::StudentResult, session::grader::GradeOutcome};

/// Everything needed to persist one assessment result.
#[derive(Debug, Clone)]
pub struct NewResult {
    /// Session id; unique index on the table makes the insert idempotent.
    pub session_id: String,
    pub student_id: i64,
    pub quiz_id: i64,
    pub grade: GradeOutcome,
    /// Whole minutes spent before submission.
    pub duration_minutes: i64,
    /// Frozen answer register at submission time.
    pub answers: HashMap<i64, i64>,
}

/// Persists one immutable result row.
///
/// At-least-once safe: a replay of the same session id hits the unique
/// index and resolves to the already-persisted row, so retries after a
/// failed or ambiguous first attempt cannot duplicate results.
pub async fn persist_result(pool: &SqlitePool, record: &NewResult) -> Result<StudentResult, AppError> {
    let insert = sqlx::query(
        r#"
        INSERT INTO student_results
            (session_id, student_id, quiz_id, score, total_score, percentage, passed, duration_taken, answers)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.session_id)
    .bind(record.student_id)
    .bind(record.quiz_id)
    .bind(record.grade.score)
    .bind(record.grade.total)
    .bind(record.grade.percentage)
    .bind(record.grade.passed)
    .bind(record.duration_minutes)
    .bind(Json(&record.answers))
    .execute(pool)
    .await;

    match insert {
        Ok(_) => {}
        Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
            tracing::info!(session_id = %record.session_id, "result already persisted, treating replay as success");
        }
        Err(e) => {
            tracing::error!(session_id = %record.session_id, "failed to persist result: {}", e);
            return Err(AppError::from(e));
        }
    }

    let row = sqlx::query_as::<_, StudentResult>(
        "SELECT * FROM student_results WHERE session_id = ?",
    )
    .bind(&record.session_id)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
