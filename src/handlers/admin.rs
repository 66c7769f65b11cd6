// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{error::AppError, models::user::User, utils::hash::hash_password};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(users))
}

/// DTO for Admin creating a user (can specify role and school).
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    /// 'admin', 'teacher' or 'student'.
    pub role: String,
    pub school_id: Option<i64>,
    #[validate(length(max = 50))]
    pub class_level: Option<String>,
}

/// Creates a new user with a specific role.
/// Admin only.
pub async fn create_user(
    State(pool): State<SqlitePool>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if !matches!(payload.role.as_str(), "admin" | "teacher" | "student") {
        return Err(AppError::BadRequest(format!(
            "Unknown role '{}'",
            payload.role
        )));
    }

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password, full_name, role, school_id, class_level)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&payload.full_name)
    .bind(&payload.role)
    .bind(payload.school_id)
    .bind(&payload.class_level)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            AppError::Conflict(format!("Email '{}' is already registered", payload.email))
        } else {
            tracing::error!("Failed to create user: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// DTO for updating a user. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
    pub school_id: Option<i64>,
    pub class_level: Option<String>,
}

/// Updates user information.
/// Admin only.
pub async fn update_user(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Check existence
    let _exists = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    // Perform updates sequentially if fields are present
    if let Some(new_name) = payload.full_name {
        sqlx::query("UPDATE users SET full_name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(new_role) = payload.role {
        if !matches!(new_role.as_str(), "admin" | "teacher" | "student") {
            return Err(AppError::BadRequest(format!("Unknown role '{}'", new_role)));
        }
        sqlx::query("UPDATE users SET role = ? WHERE id = ?")
            .bind(new_role)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(new_password) = payload.password {
        let hashed = hash_password(&new_password)?;
        sqlx::query("UPDATE users SET password = ? WHERE id = ?")
            .bind(hashed)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(new_school) = payload.school_id {
        sqlx::query("UPDATE users SET school_id = ? WHERE id = ?")
            .bind(new_school)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(new_class) = payload.class_level {
        sqlx::query("UPDATE users SET class_level = ? WHERE id = ?")
            .bind(new_class)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    Ok(StatusCode::OK)
}

/// Deletes a user.
/// Admin only.
pub async fn delete_user(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Platform-wide dashboard numbers: user/quiz/result/school counts and
/// the average result percentage.
/// Admin only.
pub async fn overview(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;
    let active_quiz_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM quizzes WHERE status = 'Active'")
            .fetch_one(&pool)
            .await?;
    let result_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM student_results")
        .fetch_one(&pool)
        .await?;
    let school_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schools")
        .fetch_one(&pool)
        .await?;
    let average_percentage: Option<f64> =
        sqlx::query_scalar("SELECT AVG(percentage) FROM student_results")
            .fetch_one(&pool)
            .await?;

    Ok(Json(serde_json::json!({
        "users": user_count,
        "active_quizzes": active_quiz_count,
        "results": result_count,
        "schools": school_count,
        "average_percentage": average_percentage.map(|p| p.round() as i64).unwrap_or(0),
    })))
}
