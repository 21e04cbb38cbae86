// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::session::store::Answers;

/// Represents the 'exam_attempts' table in the database.
/// One row per user and exam; the final submitted answers and their score.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: i64,
    pub user_id: i64,
    pub exam_id: i64,
    pub answers: Json<Answers>,
    /// Percentage of correct answers over all questions of the exam.
    pub score: f64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Values for a new attempt row.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub user_id: i64,
    pub exam_id: i64,
    pub answers: Answers,
    pub score: f64,
    pub correct_count: i64,
    pub total_questions: i64,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAttemptRequest {
    /// User's answers map.
    /// Key: Question ID
    /// Value: User's selected option
    pub answers: Answers,
}

/// DTO returned once an attempt has been scored and recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub score: f64,
    pub correct_count: i64,
    pub total_questions: i64,
    pub passed: bool,
}
