// src/session/store.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::storage::KeyValueStorage;
use crate::utils::clock::{Clock, SystemClock};

/// Question id → selected answer.
pub type Answers = HashMap<String, String>;

/// How long a saved answer set stays usable.
pub const ANSWER_TTL_MS: i64 = 24 * 60 * 60 * 1000;

const KEY_PREFIX: &str = "exam_answers_";

/// On-disk shape: `{"answers": {...}, "savedAt": <epoch-ms>}`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAnswerSet {
    answers: Answers,
    saved_at: i64,
}

pub fn storage_key(exam_id: &str) -> String {
    format!("{KEY_PREFIX}{exam_id}")
}

/// Per-device cache of in-progress answers, one entry per exam.
///
/// Every operation is best-effort: storage failures are logged and swallowed, and
/// unreadable entries behave as if nothing was saved.
pub struct SessionAnswerStore<S, C = SystemClock> {
    storage: S,
    clock: C,
}

impl<S: KeyValueStorage> SessionAnswerStore<S, SystemClock> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: KeyValueStorage, C: Clock> SessionAnswerStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self { storage, clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Replaces the saved answers for `exam_id` with `answers`.
    pub fn save(&self, exam_id: &str, answers: &Answers) {
        let record = StoredAnswerSet {
            answers: answers.clone(),
            saved_at: self.clock.now_ms(),
        };

        let payload = match serde_json::to_string(&record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(exam_id, "Failed to encode saved answers: {}", e);
                return;
            }
        };

        if let Err(e) = self.storage.set(&storage_key(exam_id), &payload) {
            tracing::warn!(exam_id, "Failed to save answers locally: {}", e);
        }
    }

    /// Returns the saved answers if they are no older than 24 hours.
    /// Expired or unreadable entries are evicted on the way out.
    pub fn load(&self, exam_id: &str) -> Option<Answers> {
        let key = storage_key(exam_id);

        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(exam_id, "Failed to read saved answers: {}", e);
                return None;
            }
        };

        let record: StoredAnswerSet = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(exam_id, "Discarding unreadable saved answers: {}", e);
                self.evict(exam_id, &key);
                return None;
            }
        };

        let age = self.clock.now_ms().saturating_sub(record.saved_at);
        if age > ANSWER_TTL_MS {
            tracing::debug!(exam_id, age_ms = age, "Saved answers expired");
            self.evict(exam_id, &key);
            return None;
        }

        Some(record.answers)
    }

    /// Forgets the saved answers. Clearing an absent entry is fine.
    pub fn clear(&self, exam_id: &str) {
        self.evict(exam_id, &storage_key(exam_id));
    }

    fn evict(&self, exam_id: &str, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            tracing::warn!(exam_id, "Failed to remove saved answers: {}", e);
        }
    }
}
