// src/session/mod.rs

//! Device-local persistence of in-progress answers.

pub mod storage;
pub mod store;

pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{ANSWER_TTL_MS, Answers, SessionAnswerStore};
