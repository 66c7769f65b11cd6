// src/handlers/school.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    error::AppError,
    models::school::{CreateSchoolRequest, School, UpdateSchoolRequest},
};

/// Lists all schools, newest first. Public: the registration form needs
/// this before any account exists.
pub async fn list_schools(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    let schools = sqlx::query_as::<_, School>("SELECT * FROM schools ORDER BY created_at DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list schools: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(schools))
}

/// Creates a school. Admin only.
pub async fn create_school(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateSchoolRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let school = sqlx::query_as::<_, School>(
        "INSERT INTO schools (name, city) VALUES (?, ?) RETURNING *",
    )
    .bind(&payload.name)
    .bind(&payload.city)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(school)))
}

/// Updates a school. Admin only. Fields are optional.
pub async fn update_school(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSchoolRequest>,
) -> Result<impl IntoResponse, AppError> {
    let _exists = sqlx::query_as::<_, School>("SELECT * FROM schools WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("School not found".to_string()))?;

    if let Some(new_name) = payload.name {
        sqlx::query("UPDATE schools SET name = ? WHERE id = ?")
            .bind(new_name)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    if let Some(new_city) = payload.city {
        sqlx::query("UPDATE schools SET city = ? WHERE id = ?")
            .bind(new_city)
            .bind(id)
            .execute(&pool)
            .await?;
    }

    Ok(StatusCode::OK)
}

/// Deletes a school. Admin only.
pub async fn delete_school(
    State(pool): State<SqlitePool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = sqlx::query("DELETE FROM schools WHERE id = ?")
        .bind(id)
        .execute(&pool)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("School not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
