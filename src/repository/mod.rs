// src/repository/mod.rs

//! Backend collaborator: where exams, questions, attempts and users live.
//!
//! Handlers only see the traits; `postgres` is the production implementation and
//! `memory` backs tests and local runs without a database.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    attempt::{AttemptRecord, NewAttempt},
    exam::{CreateExamRequest, Exam, UpdateExamRequest},
    question::{CreateQuestionRequest, Question, QuestionFilter},
    user::{NewUser, User},
};

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    /// A uniqueness rule was violated (duplicate username, second attempt...).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait ExamRepository: Send + Sync {
    async fn list_exams(&self) -> Result<Vec<Exam>, RepoError>;
    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, RepoError>;
    async fn create_exam(&self, new: CreateExamRequest) -> Result<Exam, RepoError>;
    /// Returns `None` when the exam does not exist.
    async fn update_exam(
        &self,
        id: i64,
        changes: UpdateExamRequest,
    ) -> Result<Option<Exam>, RepoError>;
    /// Returns `false` when the exam does not exist.
    async fn set_exam_active(&self, id: i64, is_active: bool) -> Result<bool, RepoError>;
    /// Deletes the exam with its questions and attempts.
    async fn delete_exam(&self, id: i64) -> Result<bool, RepoError>;

    async fn list_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>, RepoError>;
    async fn create_question(
        &self,
        exam_id: i64,
        new: CreateQuestionRequest,
    ) -> Result<Question, RepoError>;
    async fn delete_question(&self, id: i64) -> Result<bool, RepoError>;

    /// Fails with `Conflict` if the user already has an attempt for the exam.
    async fn record_attempt(&self, attempt: NewAttempt) -> Result<AttemptRecord, RepoError>;
    async fn list_attempts_for_user(&self, user_id: i64) -> Result<Vec<AttemptRecord>, RepoError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, RepoError>;
    /// Fails with `Conflict` if the username is taken.
    async fn create_user(&self, new: NewUser) -> Result<User, RepoError>;
    async fn list_users(&self) -> Result<Vec<User>, RepoError>;
    async fn delete_user(&self, id: i64) -> Result<bool, RepoError>;
}
