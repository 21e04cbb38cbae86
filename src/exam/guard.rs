// src/exam/guard.rs

use std::future::Future;

use thiserror::Error;

use super::status::{ExamStatus, ExamWindow, resolve_status};

/// Where an admin mutation currently stands.
///
/// `A` is the pending action (edit payload, deactivate, delete...). It travels with
/// the state so that it can only be handed to the backend once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState<A> {
    Idle,
    Confirming(A),
    Applying(A),
}

impl<A> GuardState<A> {
    pub fn name(&self) -> &'static str {
        match self {
            GuardState::Idle => "idle",
            GuardState::Confirming(_) => "confirming",
            GuardState::Applying(_) => "applying",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("cannot {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// Gate in front of edit/deactivate/delete on an exam.
///
/// ```text
/// idle --request(active)--> confirming --confirm--> applying --apply--> idle
///   \                          |
///    \--request(other)--> applying     cancel --> idle
/// ```
#[derive(Debug)]
pub struct MutationGuard<A> {
    state: GuardState<A>,
    observed: Option<ExamStatus>,
}

impl<A> Default for MutationGuard<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> MutationGuard<A> {
    pub fn new() -> Self {
        Self {
            state: GuardState::Idle,
            observed: None,
        }
    }

    pub fn state(&self) -> &GuardState<A> {
        &self.state
    }

    /// Status resolved by the last `request`.
    pub fn observed_status(&self) -> Option<ExamStatus> {
        self.observed
    }

    pub fn is_confirming(&self) -> bool {
        matches!(self.state, GuardState::Confirming(_))
    }

    /// Starts a mutation. Live exams park in `Confirming`; anything else goes
    /// straight to `Applying`.
    pub fn request(
        &mut self,
        action: A,
        exam: &ExamWindow,
        now: i64,
    ) -> Result<&GuardState<A>, GuardError> {
        if !matches!(self.state, GuardState::Idle) {
            return Err(self.invalid("request"));
        }

        let status = resolve_status(exam, now);
        self.observed = Some(status);
        self.state = if status.requires_confirmation() {
            GuardState::Confirming(action)
        } else {
            GuardState::Applying(action)
        };

        Ok(&self.state)
    }

    /// The admin acknowledged that candidates may be mid-attempt.
    pub fn confirm(&mut self) -> Result<&GuardState<A>, GuardError> {
        match std::mem::replace(&mut self.state, GuardState::Idle) {
            GuardState::Confirming(action) => {
                self.state = GuardState::Applying(action);
                Ok(&self.state)
            }
            other => {
                self.state = other;
                Err(self.invalid("confirm"))
            }
        }
    }

    /// Drops the pending action without touching the backend.
    pub fn cancel(&mut self) -> Result<Option<A>, GuardError> {
        match std::mem::replace(&mut self.state, GuardState::Idle) {
            GuardState::Confirming(action) => Ok(Some(action)),
            GuardState::Idle => Ok(None),
            other => {
                self.state = other;
                Err(self.invalid("cancel"))
            }
        }
    }

    /// Hands the pending action to `mutate` exactly once and returns to `Idle`.
    ///
    /// The mutation's own result is passed through untouched; a failure does not
    /// reopen the confirmation step.
    pub async fn apply<F, Fut, T, E>(&mut self, mutate: F) -> Result<Result<T, E>, GuardError>
    where
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let action = match std::mem::replace(&mut self.state, GuardState::Idle) {
            GuardState::Applying(action) => action,
            other => {
                self.state = other;
                return Err(self.invalid("apply"));
            }
        };

        let result = mutate(action).await;
        if result.is_err() {
            tracing::warn!("Guarded exam mutation was rejected by the backend");
        }
        Ok(result)
    }

    fn invalid(&self, event: &'static str) -> GuardError {
        GuardError::InvalidTransition {
            state: self.state.name(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const HOUR: i64 = 3_600_000;
    const NOW: i64 = 1_700_000_000_000;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Action {
        Deactivate,
        Delete,
    }

    fn live_exam() -> ExamWindow {
        ExamWindow {
            is_active: true,
            start_date: NOW - HOUR,
            end_date: NOW + HOUR,
        }
    }

    fn finished_exam() -> ExamWindow {
        ExamWindow {
            is_active: true,
            start_date: NOW - 2 * HOUR,
            end_date: NOW - HOUR,
        }
    }

    #[tokio::test]
    async fn deactivating_live_exam_waits_for_confirmation() {
        let calls = AtomicUsize::new(0);
        let mut guard = MutationGuard::new();

        let state = guard.request(Action::Deactivate, &live_exam(), NOW).unwrap();
        assert_eq!(state, &GuardState::Confirming(Action::Deactivate));
        assert_eq!(guard.observed_status(), Some(ExamStatus::Active));

        // Applying from confirming is refused and nothing reaches the backend.
        let err = guard
            .apply(|_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ()>(())
            })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GuardError::InvalidTransition {
                state: "confirming",
                event: "apply"
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(guard.is_confirming());

        guard.confirm().unwrap();
        let result = guard
            .apply(|action| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, ()>(action) }
            })
            .await
            .unwrap();
        assert_eq!(result, Ok(Action::Deactivate));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.state(), &GuardState::Idle);
    }

    #[tokio::test]
    async fn deleting_finished_exam_skips_confirmation() {
        let mut guard = MutationGuard::new();

        let state = guard.request(Action::Delete, &finished_exam(), NOW).unwrap();
        assert_eq!(state, &GuardState::Applying(Action::Delete));
        assert_eq!(guard.observed_status(), Some(ExamStatus::Completed));

        let result = guard.apply(|a| async move { Ok::<_, ()>(a) }).await.unwrap();
        assert_eq!(result, Ok(Action::Delete));
    }

    #[test]
    fn inactive_and_upcoming_exams_skip_confirmation() {
        let mut inactive = live_exam();
        inactive.is_active = false;
        let upcoming = ExamWindow {
            is_active: true,
            start_date: NOW + HOUR,
            end_date: NOW + 2 * HOUR,
        };

        for exam in [inactive, upcoming] {
            let mut guard = MutationGuard::new();
            guard.request(Action::Delete, &exam, NOW).unwrap();
            assert_eq!(guard.state(), &GuardState::Applying(Action::Delete));
        }
    }

    #[test]
    fn cancel_returns_to_idle_without_applying() {
        let mut guard = MutationGuard::new();
        guard.request(Action::Delete, &live_exam(), NOW).unwrap();

        assert_eq!(guard.cancel().unwrap(), Some(Action::Delete));
        assert_eq!(guard.state(), &GuardState::Idle);
        assert_eq!(guard.cancel().unwrap(), None);
    }

    #[test]
    fn confirm_outside_confirming_is_rejected() {
        let mut guard: MutationGuard<Action> = MutationGuard::new();
        assert!(guard.confirm().is_err());

        guard.request(Action::Delete, &finished_exam(), NOW).unwrap();
        assert!(guard.confirm().is_err());
        assert!(guard.cancel().is_err());
        assert_eq!(guard.state(), &GuardState::Applying(Action::Delete));
    }

    #[test]
    fn second_request_while_pending_is_rejected() {
        let mut guard = MutationGuard::new();
        guard.request(Action::Delete, &live_exam(), NOW).unwrap();

        let err = guard
            .request(Action::Deactivate, &live_exam(), NOW)
            .unwrap_err();
        assert_eq!(
            err,
            GuardError::InvalidTransition {
                state: "confirming",
                event: "request"
            }
        );
        assert_eq!(guard.state(), &GuardState::Confirming(Action::Delete));
    }

    #[tokio::test]
    async fn backend_failure_does_not_reopen_confirmation() {
        let mut guard = MutationGuard::new();
        guard.request(Action::Deactivate, &live_exam(), NOW).unwrap();
        guard.confirm().unwrap();

        let result = guard
            .apply(|_| async { Err::<(), _>("conflict") })
            .await
            .unwrap();
        assert_eq!(result, Err("conflict"));
        assert_eq!(guard.state(), &GuardState::Idle);
    }
}
