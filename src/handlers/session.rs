// src/handlers/session.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        quiz::PublicQuestion,
        result::{ResultReview, StudentResult},
    },
    session::{
        ExamSession, SUBMITTED_SESSION_LINGER, SessionRegistry, SharedSession, SubmissionAttempt,
        SubmissionState, SubmitTrigger, loader::load_assessment, spawn_ticker, submitter,
    },
    utils::jwt::Claims,
};

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub quiz_id: i64,
}

/// Starts a timed assessment session for the authenticated student.
///
/// Loads the quiz snapshot in one logical read, starts the countdown at
/// `time_limit * 60` seconds and spawns the per-second ticker. The
/// response carries the questions without correct-answer flags.
pub async fn start_session(
    State(pool): State<SqlitePool>,
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role != "student" {
        return Err(AppError::Forbidden(
            "Only students can take quizzes".to_string(),
        ));
    }

    // Load failure means no session and no timer.
    let assessment = load_assessment(&pool, payload.quiz_id).await?;

    if assessment.quiz.status != "Active" {
        return Err(AppError::BadRequest(
            "This quiz is not open for taking".to_string(),
        ));
    }

    let session = ExamSession::new(claims.user_id()?, assessment);
    let session_id = session.id;
    let remaining_seconds = session.remaining_seconds();
    let total_questions = session.assessment.question_count();

    let questions: Vec<PublicQuestion> = session
        .assessment
        .questions
        .iter()
        .map(PublicQuestion::from)
        .collect();
    let quiz = serde_json::json!({
        "id": session.assessment.quiz.id,
        "title": session.assessment.quiz.title,
        "description": session.assessment.quiz.description,
        "time_limit": session.assessment.quiz.time_limit,
    });

    let (_, shared) = sessions.insert(session).await;
    spawn_ticker(pool.clone(), sessions.clone(), shared);

    tracing::info!(%session_id, quiz_id = payload.quiz_id, "assessment session started");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "session_id": session_id,
            "quiz": quiz,
            "questions": questions,
            "remaining_seconds": remaining_seconds,
            "total_questions": total_questions,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct SelectAnswerRequest {
    pub question_id: i64,
    pub option_id: i64,
}

/// Records (or overwrites) one answer.
pub async fn select_answer(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = owned_session(&sessions, &claims, id).await?;
    let mut guard = session.lock().await;

    guard.select_answer(payload.question_id, payload.option_id)?;

    Ok(Json(serde_json::json!({
        "answered": guard.answered_count(),
        "total": guard.assessment.question_count(),
        "is_complete": guard.is_complete(),
    })))
}

/// Live session state: remaining time, progress and submission status.
/// Once the session is submitted (manually or by expiry) the response
/// carries the full result review.
pub async fn session_state(
    State(pool): State<SqlitePool>,
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = owned_session(&sessions, &claims, id).await?;
    let guard = session.lock().await;

    let result = if guard.submission_state() == SubmissionState::Submitted {
        Some(build_review(&pool, &guard).await?)
    } else {
        None
    };

    Ok(Json(serde_json::json!({
        "session_id": guard.id,
        "remaining_seconds": guard.remaining_seconds(),
        "countdown": guard.countdown_state(),
        "submission": guard.submission_state(),
        "answered": guard.answered_count(),
        "total": guard.assessment.question_count(),
        "is_complete": guard.is_complete(),
        "result": result,
    })))
}

/// Manual submission.
///
/// Refused while unanswered questions remain and time is left. Converges
/// with the expiry ticker on the session's single submission path: if the
/// other path already submitted, this returns the persisted result
/// instead of submitting twice. A failed persist leaves the session
/// intact so this endpoint can be retried with the same session id.
pub async fn submit_session(
    State(pool): State<SqlitePool>,
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = owned_session(&sessions, &claims, id).await?;
    let mut guard = session.lock().await;

    match guard.begin_submission(SubmitTrigger::Manual) {
        SubmissionAttempt::Started {
            grade,
            duration_minutes,
        } => {
            let record = guard.result_record(grade, duration_minutes);
            match submitter::persist_result(&pool, &record).await {
                Ok(_) => {
                    guard.finish_submission(true);
                    sessions.remove_after(id, SUBMITTED_SESSION_LINGER);
                    tracing::info!(session_id = %guard.id, "session submitted");
                    let review = build_review(&pool, &guard).await?;
                    Ok(Json(review))
                }
                Err(e) => {
                    guard.finish_submission(false);
                    Err(e)
                }
            }
        }
        SubmissionAttempt::AlreadyHandled => match guard.submission_state() {
            // Duplicate submit of an already-persisted session is
            // answered with the same result, not an error.
            SubmissionState::Submitted => {
                let review = build_review(&pool, &guard).await?;
                Ok(Json(review))
            }
            _ => Err(AppError::Conflict(
                "Submission already in progress".to_string(),
            )),
        },
        SubmissionAttempt::Incomplete { answered, total } => Err(AppError::BadRequest(format!(
            "All questions must be answered before submitting ({} of {} answered)",
            answered, total
        ))),
    }
}

/// Tears the session down: stops the countdown, drops the session, never
/// submits.
pub async fn cancel_session(
    State(sessions): State<SessionRegistry>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = owned_session(&sessions, &claims, id).await?;
    session.lock().await.cancel();
    sessions.remove(id).await;

    tracing::info!(session_id = %id, "session cancelled");

    Ok(StatusCode::NO_CONTENT)
}

/// Looks a session up and enforces that it belongs to the caller.
async fn owned_session(
    sessions: &SessionRegistry,
    claims: &Claims,
    id: Uuid,
) -> Result<SharedSession, AppError> {
    let session = sessions
        .get(id)
        .await
        .ok_or(AppError::NotFound("Session not found".to_string()))?;

    if session.lock().await.student_id != claims.user_id()? {
        return Err(AppError::Forbidden("Not your session".to_string()));
    }

    Ok(session)
}

/// Assembles the result review from the persisted row and the session's
/// own snapshot, so the viewer needs no second fetch.
async fn build_review(pool: &SqlitePool, session: &ExamSession) -> Result<ResultReview, AppError> {
    let result = sqlx::query_as::<_, StudentResult>(
        "SELECT * FROM student_results WHERE session_id = ?",
    )
    .bind(session.id.to_string())
    .fetch_one(pool)
    .await?;

    Ok(ResultReview {
        result,
        quiz_title: session.assessment.quiz.title.clone(),
        questions: session.assessment.questions.clone(),
    })
}
