// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        quiz::{QuestionInput, Quiz, SaveQuizRequest},
        user::User,
    },
    session::loader::load_assessment,
    utils::{html::clean_html, jwt::Claims},
};

/// A quiz row with its question and attempt counts, for list screens.
#[derive(Debug, Serialize, FromRow)]
pub struct QuizListRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub time_limit: i64,
    pub target_class: String,
    pub status: String,
    pub teacher_id: i64,
    pub school_id: Option<i64>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub question_count: i64,
    pub result_count: i64,
}

const LIST_COLUMNS: &str = r#"
    q.*,
    (SELECT COUNT(*) FROM questions WHERE quiz_id = q.id) AS question_count,
    (SELECT COUNT(*) FROM student_results WHERE quiz_id = q.id) AS result_count
"#;

/// Lists the authenticated teacher's quizzes. Admins see all quizzes
/// (the admin exam screen reuses this endpoint).
pub async fn list_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let rows = if claims.role == "admin" {
        sqlx::query_as::<_, QuizListRow>(&format!(
            "SELECT {} FROM quizzes q ORDER BY q.created_at DESC",
            LIST_COLUMNS
        ))
        .fetch_all(&pool)
        .await?
    } else {
        sqlx::query_as::<_, QuizListRow>(&format!(
            "SELECT {} FROM quizzes q WHERE q.teacher_id = ? ORDER BY q.created_at DESC",
            LIST_COLUMNS
        ))
        .bind(claims.user_id()?)
        .fetch_all(&pool)
        .await?
    };

    Ok(Json(rows))
}

/// Lists Active quizzes addressed to the authenticated student's class
/// and school.
pub async fn available_quizzes(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let student = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(claims.user_id()?)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::AuthError("Unknown user".to_string()))?;

    // A student with no class assigned has no quizzes addressed to them.
    let Some(class_level) = student.class_level else {
        return Ok(Json(Vec::<QuizListRow>::new()));
    };

    let rows = sqlx::query_as::<_, QuizListRow>(&format!(
        r#"
        SELECT {}
        FROM quizzes q
        WHERE q.status = 'Active'
          AND q.target_class = ?
          AND (q.school_id IS NULL OR q.school_id = ?)
        ORDER BY q.created_at DESC
        "#,
        LIST_COLUMNS
    ))
    .bind(&class_level)
    .bind(student.school_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(rows))
}

/// Fetches one quiz with its full question/option tree, for editing.
/// Owner or admin only: the tree includes the correct-answer flags.
pub async fn get_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let assessment = load_assessment(&pool, id).await?;

    if claims.role != "admin" && assessment.quiz.teacher_id != claims.user_id()? {
        return Err(AppError::Forbidden(
            "You do not own this quiz".to_string(),
        ));
    }

    Ok(Json(assessment))
}

/// Creates a quiz together with its full question set in one transaction.
pub async fn create_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SaveQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let teacher_id = claims.user_id()?;
    let school_id = resolve_school(&pool, &claims, &payload).await?;

    let mut tx = pool.begin().await?;

    let quiz = sqlx::query_as::<_, Quiz>(
        r#"
        INSERT INTO quizzes (title, description, time_limit, target_class, status, teacher_id, school_id)
        VALUES (?, ?, ?, ?, 'Active', ?, ?)
        RETURNING *
        "#,
    )
    .bind(clean_html(&payload.title))
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.time_limit)
    .bind(&payload.target_class)
    .bind(teacher_id)
    .bind(school_id)
    .fetch_one(&mut *tx)
    .await?;

    insert_questions(&mut tx, quiz.id, &payload.questions).await?;

    tx.commit().await?;

    tracing::info!(quiz_id = quiz.id, teacher_id, "quiz created");

    Ok((StatusCode::CREATED, Json(quiz)))
}

/// Updates a quiz. The previous question set is replaced wholesale by
/// the submitted one, in the same transaction.
pub async fn update_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<SaveQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let quiz = fetch_owned_quiz(&pool, &claims, id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE quizzes
        SET title = ?, description = ?, time_limit = ?, target_class = ?, school_id = ?
        WHERE id = ?
        "#,
    )
    .bind(clean_html(&payload.title))
    .bind(payload.description.as_deref().map(clean_html))
    .bind(payload.time_limit)
    .bind(&payload.target_class)
    .bind(payload.school_id.or(quiz.school_id))
    .bind(id)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "DELETE FROM quiz_options WHERE question_id IN (SELECT id FROM questions WHERE quiz_id = ?)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM questions WHERE quiz_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    insert_questions(&mut tx, id, &payload.questions).await?;

    tx.commit().await?;

    Ok(StatusCode::OK)
}

/// Deletes a quiz and its questions. Persisted results are kept; the
/// result listings fall back to a placeholder title for them.
pub async fn delete_quiz(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    fetch_owned_quiz(&pool, &claims, id).await?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "DELETE FROM quiz_options WHERE question_id IN (SELECT id FROM questions WHERE quiz_id = ?)",
    )
    .bind(id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM questions WHERE quiz_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM quizzes WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Loads a quiz row and enforces ownership (admins own everything).
async fn fetch_owned_quiz(
    pool: &SqlitePool,
    claims: &Claims,
    quiz_id: i64,
) -> Result<Quiz, AppError> {
    let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = ?")
        .bind(quiz_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    if claims.role != "admin" && quiz.teacher_id != claims.user_id()? {
        return Err(AppError::Forbidden("You do not own this quiz".to_string()));
    }

    Ok(quiz)
}

/// Teachers author for their own school; admins may target any school
/// through the request.
async fn resolve_school(
    pool: &SqlitePool,
    claims: &Claims,
    payload: &SaveQuizRequest,
) -> Result<Option<i64>, AppError> {
    if claims.role == "admin" {
        return Ok(payload.school_id);
    }

    let school_id: Option<i64> = sqlx::query_scalar("SELECT school_id FROM users WHERE id = ?")
        .bind(claims.user_id()?)
        .fetch_one(pool)
        .await?;

    school_id
        .map(Some)
        .ok_or_else(|| AppError::BadRequest("No school associated with this account".to_string()))
}

/// Inserts the question/option tree for a quiz. Text is sanitized: quiz
/// content is teacher input rendered to every student in the class.
async fn insert_questions(
    tx: &mut Transaction<'_, Sqlite>,
    quiz_id: i64,
    questions: &[QuestionInput],
) -> Result<(), AppError> {
    for (qi, question) in questions.iter().enumerate() {
        let question_id: i64 = sqlx::query_scalar(
            "INSERT INTO questions (quiz_id, position, text, explanation) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(quiz_id)
        .bind(qi as i64)
        .bind(clean_html(&question.text))
        .bind(question.explanation.as_deref().map(clean_html))
        .fetch_one(&mut **tx)
        .await?;

        for (oi, option) in question.options.iter().enumerate() {
            sqlx::query(
                "INSERT INTO quiz_options (question_id, position, text, is_correct) VALUES (?, ?, ?, ?)",
            )
            .bind(question_id)
            .bind(oi as i64)
            .bind(clean_html(&option.text))
            .bind(option.is_correct)
            .execute(&mut **tx)
            .await?;
        }
    }

    Ok(())
}
