// src/handlers/results.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::result::{MyResultRow, ResultOverviewRow, ResultReview, ResultStats, StudentResult},
    session::loader::load_assessment,
    utils::jwt::Claims,
};

/// The authenticated student's own results, newest first.
pub async fn my_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = sqlx::query_as::<_, MyResultRow>(
        r#"
        SELECT
            r.id,
            r.quiz_id,
            COALESCE(q.title, 'Unknown quiz') AS quiz_title,
            r.score,
            r.total_score,
            r.percentage,
            r.passed,
            r.duration_taken,
            r.created_at
        FROM student_results r
        LEFT JOIN quizzes q ON q.id = r.quiz_id
        WHERE r.student_id = ?
        ORDER BY r.created_at DESC
        "#,
    )
    .bind(claims.user_id()?)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch student results: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(rows))
}

const OVERVIEW_QUERY: &str = r#"
    SELECT
        r.id,
        r.student_id,
        COALESCE(u.full_name, 'Unknown student') AS student_name,
        u.class_level AS student_class,
        r.quiz_id,
        COALESCE(q.title, 'Unknown quiz') AS quiz_title,
        COALESCE(q.target_class, '') AS target_class,
        r.score,
        r.total_score,
        r.percentage,
        r.passed,
        r.duration_taken,
        r.created_at
    FROM student_results r
    LEFT JOIN users u ON u.id = r.student_id
    LEFT JOIN quizzes q ON q.id = r.quiz_id
"#;

/// Results for the quizzes the authenticated teacher owns, with
/// aggregate stats. Admins see every result.
pub async fn overview_results(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = if claims.role == "admin" {
        sqlx::query_as::<_, ResultOverviewRow>(&format!(
            "{} ORDER BY r.created_at DESC",
            OVERVIEW_QUERY
        ))
        .fetch_all(&pool)
        .await?
    } else {
        sqlx::query_as::<_, ResultOverviewRow>(&format!(
            "{} WHERE q.teacher_id = ? ORDER BY r.created_at DESC",
            OVERVIEW_QUERY
        ))
        .bind(claims.user_id()?)
        .fetch_all(&pool)
        .await?
    };

    let stats = compute_stats(&rows);

    Ok(Json(serde_json::json!({
        "results": rows,
        "stats": stats,
    })))
}

/// One persisted result with the quiz's question/option data for review.
///
/// Visible to the student who took it, the teacher who owns the quiz,
/// and admins. If the quiz was deleted since, the review degrades to the
/// bare result with no question breakdown instead of failing.
pub async fn result_review(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query_as::<_, StudentResult>("SELECT * FROM student_results WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("No result to display".to_string()))?;

    let assessment = match load_assessment(&pool, result.quiz_id).await {
        Ok(assessment) => Some(assessment),
        Err(AppError::NotFound(_)) => None,
        Err(e) => return Err(e),
    };

    let user_id = claims.user_id()?;
    let authorized = match claims.role.as_str() {
        "admin" => true,
        "teacher" => assessment
            .as_ref()
            .is_some_and(|a| a.quiz.teacher_id == user_id),
        _ => result.student_id == user_id,
    };
    if !authorized {
        return Err(AppError::Forbidden(
            "You cannot view this result".to_string(),
        ));
    }

    let (quiz_title, questions) = match assessment {
        Some(a) => (a.quiz.title, a.questions),
        None => ("Unknown quiz".to_string(), Vec::new()),
    };

    Ok(Json(ResultReview {
        result,
        quiz_title,
        questions,
    }))
}

fn compute_stats(rows: &[ResultOverviewRow]) -> ResultStats {
    let total = rows.len() as i64;
    if total == 0 {
        return ResultStats {
            total_results: 0,
            average_percentage: 0,
            pass_rate: 0,
            distinct_students: 0,
        };
    }

    let sum: i64 = rows.iter().map(|r| r.percentage).sum();
    let passed = rows.iter().filter(|r| r.passed).count() as i64;
    let distinct_students = rows
        .iter()
        .map(|r| r.student_id)
        .collect::<std::collections::HashSet<_>>()
        .len() as i64;

    ResultStats {
        total_results: total,
        average_percentage: ((sum as f64 / total as f64).round()) as i64,
        pass_rate: ((passed as f64 / total as f64) * 100.0).round() as i64,
        distinct_students,
    }
}
