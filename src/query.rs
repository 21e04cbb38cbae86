// src/query.rs

use serde::Serialize;

/// Result of a backend lookup as seen by a consumer that may be waiting on it.
///
/// Unlike `Option`, this keeps "still loading" apart from "does not exist", so
/// callers cannot treat an in-flight query as a missing exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum QueryState<T> {
    Loading,
    NotFound,
    Found(T),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn as_ref(&self) -> QueryState<&T> {
        match self {
            QueryState::Loading => QueryState::Loading,
            QueryState::NotFound => QueryState::NotFound,
            QueryState::Found(value) => QueryState::Found(value),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> QueryState<U> {
        match self {
            QueryState::Loading => QueryState::Loading,
            QueryState::NotFound => QueryState::NotFound,
            QueryState::Found(value) => QueryState::Found(f(value)),
        }
    }

    /// Collapses to `Option`, treating loading as absent.
    pub fn found(self) -> Option<T> {
        match self {
            QueryState::Found(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for QueryState<T> {
    /// A finished lookup: `None` means the record does not exist.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => QueryState::Found(value),
            None => QueryState::NotFound,
        }
    }
}
