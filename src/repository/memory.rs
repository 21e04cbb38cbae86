// src/repository/memory.rs

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use super::{ExamRepository, RepoError, UserRepository};
use crate::models::{
    attempt::{AttemptRecord, NewAttempt},
    exam::{CreateExamRequest, Exam, UpdateExamRequest},
    question::{CreateQuestionRequest, Question, QuestionFilter},
    user::{NewUser, User},
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    exams: Vec<Exam>,
    questions: Vec<Question>,
    attempts: Vec<AttemptRecord>,
    users: Vec<User>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Process-local repository with the same rules as the Postgres schema
/// (unique usernames, one attempt per user and exam, cascading deletes).
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn list_exams(&self) -> Result<Vec<Exam>, RepoError> {
        let tables = self.tables.read().await;
        let mut exams = tables.exams.clone();
        exams.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(exams)
    }

    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.exams.iter().find(|e| e.id == id).cloned())
    }

    async fn create_exam(&self, new: CreateExamRequest) -> Result<Exam, RepoError> {
        let mut tables = self.tables.write().await;
        let exam = Exam {
            id: tables.next_id(),
            title: new.title,
            is_active: new.is_active,
            start_date: new.start_date,
            end_date: new.end_date,
            created_at: Some(Utc::now()),
        };
        tables.exams.push(exam.clone());
        Ok(exam)
    }

    async fn update_exam(
        &self,
        id: i64,
        changes: UpdateExamRequest,
    ) -> Result<Option<Exam>, RepoError> {
        let mut tables = self.tables.write().await;
        let Some(exam) = tables.exams.iter_mut().find(|e| e.id == id) else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            exam.title = title;
        }
        if let Some(start_date) = changes.start_date {
            exam.start_date = start_date;
        }
        if let Some(end_date) = changes.end_date {
            exam.end_date = end_date;
        }

        Ok(Some(exam.clone()))
    }

    async fn set_exam_active(&self, id: i64, is_active: bool) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        match tables.exams.iter_mut().find(|e| e.id == id) {
            Some(exam) => {
                exam.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_exam(&self, id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.exams.len();
        tables.exams.retain(|e| e.id != id);
        if tables.exams.len() == before {
            return Ok(false);
        }
        tables.questions.retain(|q| q.exam_id != id);
        tables.attempts.retain(|a| a.exam_id != id);
        Ok(true)
    }

    async fn list_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .iter()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect())
    }

    async fn create_question(
        &self,
        exam_id: i64,
        new: CreateQuestionRequest,
    ) -> Result<Question, RepoError> {
        let mut tables = self.tables.write().await;
        let question = Question {
            id: tables.next_id(),
            exam_id,
            question_type: new.question_type,
            content: new.content,
            options: Json(new.options),
            answer: new.answer,
            analysis: new.analysis,
            created_at: Some(Utc::now()),
        };
        tables.questions.push(question.clone());
        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.questions.len();
        tables.questions.retain(|q| q.id != id);
        Ok(tables.questions.len() != before)
    }

    async fn record_attempt(&self, attempt: NewAttempt) -> Result<AttemptRecord, RepoError> {
        let mut tables = self.tables.write().await;
        let duplicate = tables
            .attempts
            .iter()
            .any(|a| a.user_id == attempt.user_id && a.exam_id == attempt.exam_id);
        if duplicate {
            return Err(RepoError::Conflict(format!(
                "User {} already submitted exam {}",
                attempt.user_id, attempt.exam_id
            )));
        }

        let record = AttemptRecord {
            id: tables.next_id(),
            user_id: attempt.user_id,
            exam_id: attempt.exam_id,
            answers: Json(attempt.answers),
            score: attempt.score,
            correct_count: attempt.correct_count,
            total_questions: attempt.total_questions,
            submitted_at: Some(Utc::now()),
        };
        tables.attempts.push(record.clone());
        Ok(record)
    }

    async fn list_attempts_for_user(&self, user_id: i64) -> Result<Vec<AttemptRecord>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attempts
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|u| u.username == new.username) {
            return Err(RepoError::Conflict(format!(
                "Username '{}' already exists",
                new.username
            )));
        }

        let user = User {
            id: tables.next_id(),
            username: new.username,
            password: new.password_hash,
            role: new.role,
            created_at: Some(Utc::now()),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().rev().cloned().collect())
    }

    async fn delete_user(&self, id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }
        tables.attempts.retain(|a| a.user_id != id);
        Ok(true)
    }
}
