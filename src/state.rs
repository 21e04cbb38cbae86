// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    config::Config,
    repository::{ExamRepository, UserRepository},
    utils::clock::{Clock, SystemClock},
};

#[derive(Clone)]
pub struct AppState {
    pub exams: Arc<dyn ExamRepository>,
    pub users: Arc<dyn UserRepository>,
    pub config: Config,
    /// Source of `now` for status decisions; read fresh on every request.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// State whose exam and user repositories are the same backend.
    pub fn new<R>(repo: Arc<R>, config: Config) -> Self
    where
        R: ExamRepository + UserRepository + 'static,
    {
        Self {
            exams: repo.clone(),
            users: repo,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
