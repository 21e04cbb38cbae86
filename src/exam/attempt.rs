// src/exam/attempt.rs

use async_trait::async_trait;
use thiserror::Error;

use super::status::{ExamStatus, ExamWindow, resolve_status};
use crate::{
    models::attempt::AttemptResult,
    query::QueryState,
    session::{
        storage::KeyValueStorage,
        store::{Answers, SessionAnswerStore},
    },
    utils::clock::Clock,
};

/// Where final answers go. Implemented by the HTTP client; tests use fakes.
#[async_trait]
pub trait AttemptSubmitter: Send + Sync {
    async fn submit_attempt(
        &self,
        exam_id: i64,
        answers: &Answers,
    ) -> Result<AttemptResult, SubmitError>;
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// The backend already holds an attempt for this exam and candidate.
    #[error("an attempt for this exam was already recorded")]
    AlreadySubmitted,

    /// The backend refused the attempt for good (closed, deleted...).
    #[error("submission rejected: {0}")]
    Rejected(String),

    /// Transient failure; the same submission may succeed later.
    #[error("backend unreachable: {0}")]
    Unreachable(String),
}

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("exam is {0}; attempts are not allowed")]
    NotOpen(ExamStatus),

    #[error("attempt already submitted")]
    AlreadySubmitted,

    #[error(transparent)]
    Submit(SubmitError),
}

/// Outcome of the candidate access gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The exam lookup has not resolved yet.
    Pending,
    NotFound,
    Denied(ExamStatus),
    Granted,
}

/// Decides whether a candidate may start or continue an attempt.
pub fn gate_access(exam: &QueryState<ExamWindow>, now: i64) -> AccessDecision {
    match exam {
        QueryState::Loading => AccessDecision::Pending,
        QueryState::NotFound => AccessDecision::NotFound,
        QueryState::Found(window) => match resolve_status(window, now) {
            ExamStatus::Active => AccessDecision::Granted,
            status => AccessDecision::Denied(status),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    TimerExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running { remaining_ms: i64 },
    /// The window ran out; submit with `SubmitTrigger::TimerExpired`.
    Expired,
    /// The exam was deactivated or moved back to upcoming. Submitting would be refused.
    Closed(ExamStatus),
}

/// A candidate's in-progress run through one exam.
///
/// Every answer change is written through to the session store so that a reload
/// can pick the attempt back up with `Attempt::start`.
pub struct Attempt<'s, S, C> {
    exam_id: i64,
    key: String,
    window: ExamWindow,
    answers: Answers,
    restored: bool,
    submitted: bool,
    store: &'s SessionAnswerStore<S, C>,
}

impl<'s, S: KeyValueStorage, C: Clock> Attempt<'s, S, C> {
    /// Opens an attempt if the exam is active at `now`, hydrating saved answers.
    pub fn start(
        exam_id: i64,
        window: ExamWindow,
        store: &'s SessionAnswerStore<S, C>,
        now: i64,
    ) -> Result<Self, AttemptError> {
        let key = exam_id.to_string();
        let status = resolve_status(&window, now);
        if !status.permits_attempt() {
            if status == ExamStatus::Completed {
                // Nothing can submit these any more.
                store.clear(&key);
            }
            return Err(AttemptError::NotOpen(status));
        }

        let saved = store.load(&key);
        let restored = saved.is_some();
        if restored {
            tracing::info!(exam_id, "Restored saved answers");
        }

        Ok(Self {
            exam_id,
            key,
            window,
            answers: saved.unwrap_or_default(),
            restored,
            submitted: false,
            store,
        })
    }

    pub fn exam_id(&self) -> i64 {
        self.exam_id
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    /// Whether saved answers were picked up when the attempt started.
    pub fn was_restored(&self) -> bool {
        self.restored
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Records an answer and persists the full mapping.
    pub fn select(
        &mut self,
        question_id: impl Into<String>,
        answer: impl Into<String>,
    ) -> Result<(), AttemptError> {
        if self.submitted {
            return Err(AttemptError::AlreadySubmitted);
        }
        self.answers.insert(question_id.into(), answer.into());
        self.store.save(&self.key, &self.answers);
        Ok(())
    }

    /// Takes in a freshly fetched window, e.g. after an admin edit or deactivation.
    pub fn update_window(&mut self, window: ExamWindow) {
        self.window = window;
    }

    pub fn time_remaining_ms(&self, now: i64) -> i64 {
        (self.window.end_date - now).max(0)
    }

    /// Timer hook.
    pub fn tick(&self, now: i64) -> Tick {
        match resolve_status(&self.window, now) {
            ExamStatus::Active => Tick::Running {
                remaining_ms: self.time_remaining_ms(now),
            },
            ExamStatus::Completed => Tick::Expired,
            status => Tick::Closed(status),
        }
    }

    /// Sends the answers to the backend.
    ///
    /// On success the saved copy is cleared. A transient failure keeps it, whichever
    /// trigger fired, so the candidate can retry while the cache is still fresh; a
    /// rejection clears it since no retry can succeed.
    pub async fn submit<B>(
        &mut self,
        backend: &B,
        trigger: SubmitTrigger,
    ) -> Result<AttemptResult, AttemptError>
    where
        B: AttemptSubmitter + ?Sized,
    {
        if self.submitted {
            return Err(AttemptError::AlreadySubmitted);
        }

        match backend.submit_attempt(self.exam_id, &self.answers).await {
            Ok(result) => {
                self.submitted = true;
                self.store.clear(&self.key);
                tracing::info!(exam_id = self.exam_id, ?trigger, "Attempt submitted");
                Ok(result)
            }
            Err(SubmitError::AlreadySubmitted) => {
                // The backend's copy is authoritative; the local one is useless now.
                self.submitted = true;
                self.store.clear(&self.key);
                Err(AttemptError::AlreadySubmitted)
            }
            Err(e @ SubmitError::Rejected(_)) => {
                self.store.clear(&self.key);
                tracing::warn!(
                    exam_id = self.exam_id,
                    ?trigger,
                    "Submission rejected, dropping saved answers: {}",
                    e
                );
                Err(AttemptError::Submit(e))
            }
            Err(e) => {
                tracing::warn!(
                    exam_id = self.exam_id,
                    ?trigger,
                    "Submission failed, keeping saved answers: {}",
                    e
                );
                Err(AttemptError::Submit(e))
            }
        }
    }
}
