// src/session/mod.rs
//
// Timed assessment sessions: an immutable quiz snapshot, an in-memory
// answer register, a per-second countdown, and a single authoritative
// submission path shared by the expiry ticker and the manual endpoint.

pub mod countdown;
pub mod grader;
pub mod loader;
pub mod register;
pub mod submitter;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::AppError;
use countdown::{Countdown, CountdownState, TickOutcome};
use grader::{GradeOutcome, grade};
use loader::Assessment;
use register::AnswerRegister;
use submitter::NewResult;

/// The single authoritative submission variable for one session.
///
/// Both the ticker callback and the manual submit handler transition it
/// through `begin_submission` only; whichever arrives second observes
/// `InFlight`/`Submitted` and becomes a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubmissionState {
    NotSubmitted,
    InFlight,
    /// Persistence failed; answers and elapsed time are kept for a retry.
    Failed,
    Submitted,
}

/// Which path requested submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Expiry,
}

/// Outcome of asking a session to begin submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SubmissionAttempt {
    /// Submission is now in flight; the caller must persist and then call
    /// `finish_submission`.
    Started {
        grade: GradeOutcome,
        duration_minutes: i64,
    },
    /// Another path already submitted (or is submitting). No-op.
    AlreadyHandled,
    /// Manual submit while unanswered questions remain and time is left.
    Incomplete { answered: usize, total: usize },
}

/// One in-flight assessment session for one student.
pub struct ExamSession {
    pub id: Uuid,
    pub student_id: i64,
    pub assessment: Assessment,
    register: AnswerRegister,
    countdown: Countdown,
    submission: SubmissionState,
}

impl ExamSession {
    /// Builds a session over a loaded snapshot and starts the countdown
    /// at `time_limit * 60` seconds.
    pub fn new(student_id: i64, assessment: Assessment) -> Self {
        let mut countdown = Countdown::new(assessment.time_limit_seconds());
        countdown.start();

        Self {
            id: Uuid::new_v4(),
            student_id,
            assessment,
            register: AnswerRegister::new(),
            countdown,
            submission: SubmissionState::NotSubmitted,
        }
    }

    /// Records (or overwrites) the student's choice for one question.
    ///
    /// Both ids must resolve inside the session snapshot; answers are
    /// rejected once the countdown has stopped or submission has begun.
    pub fn select_answer(&mut self, question_id: i64, option_id: i64) -> Result<(), AppError> {
        if matches!(
            self.submission,
            SubmissionState::InFlight | SubmissionState::Submitted
        ) {
            return Err(AppError::Conflict("Session already submitted".to_string()));
        }
        if !self.countdown.is_running() {
            return Err(AppError::BadRequest(
                "Session is no longer accepting answers".to_string(),
            ));
        }
        if self.assessment.option(question_id, option_id).is_none() {
            return Err(AppError::BadRequest(
                "Unknown question or option for this quiz".to_string(),
            ));
        }

        self.register.select(question_id, option_id);
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.register.is_complete(&self.assessment.question_ids())
    }

    pub fn answered_count(&self) -> usize {
        self.register.answered_count()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.countdown.remaining_seconds()
    }

    pub fn countdown_state(&self) -> CountdownState {
        self.countdown.state()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.submission
    }

    pub fn answers_snapshot(&self) -> HashMap<i64, i64> {
        self.register.snapshot()
    }

    /// Advances the countdown by one second. Driven by the ticker task.
    pub fn tick(&mut self) -> TickOutcome {
        self.countdown.tick()
    }

    /// Stops the countdown without submitting. Terminal unless already
    /// expired, in which case the expiry stands.
    pub fn cancel(&mut self) {
        self.countdown.cancel();
    }

    /// The single entry point for both submission paths.
    ///
    /// A manual submit is refused while questions remain unanswered and
    /// time is left; an expiry submit proceeds regardless, grading the
    /// missing answers as incorrect. A manual submit also stops the
    /// countdown so the ticker winds down.
    pub fn begin_submission(&mut self, trigger: SubmitTrigger) -> SubmissionAttempt {
        match self.submission {
            SubmissionState::InFlight | SubmissionState::Submitted => {
                return SubmissionAttempt::AlreadyHandled;
            }
            SubmissionState::NotSubmitted | SubmissionState::Failed => {}
        }

        if trigger == SubmitTrigger::Manual && !self.is_complete() && !self.countdown.is_expired() {
            return SubmissionAttempt::Incomplete {
                answered: self.answered_count(),
                total: self.assessment.question_count(),
            };
        }

        if trigger == SubmitTrigger::Manual {
            self.countdown.cancel();
        }

        self.submission = SubmissionState::InFlight;

        SubmissionAttempt::Started {
            grade: grade(&self.assessment, &self.register),
            duration_minutes: (self.countdown.elapsed_seconds() / 60) as i64,
        }
    }

    /// Settles an in-flight submission. Failure keeps the session alive
    /// for a manual retry; an expired countdown stays expired.
    pub fn finish_submission(&mut self, success: bool) {
        self.submission = if success {
            SubmissionState::Submitted
        } else {
            SubmissionState::Failed
        };
    }

    /// Snapshot of everything the submitter persists.
    pub fn result_record(&self, grade: GradeOutcome, duration_minutes: i64) -> NewResult {
        NewResult {
            session_id: self.id.to_string(),
            student_id: self.student_id,
            quiz_id: self.assessment.quiz.id,
            grade,
            duration_minutes,
            answers: self.register.snapshot(),
        }
    }
}

pub type SharedSession = Arc<Mutex<ExamSession>>;

/// How long a submitted session stays in the registry, so duplicate
/// submits and state polls still resolve to the persisted result before
/// the entry is dropped.
pub const SUBMITTED_SESSION_LINGER: Duration = Duration::from_secs(300);

/// All live sessions, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, SharedSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: ExamSession) -> (Uuid, SharedSession) {
        let id = session.id;
        let shared = Arc::new(Mutex::new(session));
        self.inner.write().await.insert(id, shared.clone());
        (id, shared)
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.inner.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) {
        self.inner.write().await.remove(&id);
    }

    /// Drops the entry after a grace period. Used for submitted sessions
    /// so the registry does not grow with every quiz ever taken; failed
    /// sessions are kept for retry and cancelled ones removed directly.
    pub fn remove_after(&self, id: Uuid, delay: Duration) {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.write().await.remove(&id);
        });
    }
}

/// Drives one session's countdown, one tick per second.
///
/// Exits as soon as the countdown leaves `Running` (manual submission,
/// cancellation, or the expiry handled here), so a torn-down session
/// never keeps a timer firing behind it.
pub fn spawn_ticker(
    pool: SqlitePool,
    registry: SessionRegistry,
    session: SharedSession,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // The first interval tick completes immediately; consume it so the
        // countdown starts decrementing a full second after session start.
        interval.tick().await;

        loop {
            interval.tick().await;
            let mut guard = session.lock().await;

            match guard.tick() {
                TickOutcome::Ticked => {}
                TickOutcome::Noop => break,
                TickOutcome::Expired => {
                    if let SubmissionAttempt::Started {
                        grade,
                        duration_minutes,
                    } = guard.begin_submission(SubmitTrigger::Expiry)
                    {
                        let record = guard.result_record(grade, duration_minutes);
                        match submitter::persist_result(&pool, &record).await {
                            Ok(row) => {
                                guard.finish_submission(true);
                                registry.remove_after(guard.id, SUBMITTED_SESSION_LINGER);
                                tracing::info!(
                                    session_id = %guard.id,
                                    result_id = row.id,
                                    "session expired, result auto-submitted"
                                );
                            }
                            Err(e) => {
                                // Kept as Failed: the student can retry the
                                // submit endpoint with the same session id.
                                guard.finish_submission(false);
                                tracing::error!(
                                    session_id = %guard.id,
                                    "auto-submission failed after expiry: {}",
                                    e
                                );
                            }
                        }
                    }
                    break;
                }
            }
        }
    })
}
