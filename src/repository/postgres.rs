// src/repository/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use super::{ExamRepository, RepoError, UserRepository};
use crate::models::{
    attempt::{AttemptRecord, NewAttempt},
    exam::{CreateExamRequest, Exam, UpdateExamRequest},
    question::{CreateQuestionRequest, Question, QuestionFilter},
    user::{NewUser, User},
};

const EXAM_COLUMNS: &str = "id, title, is_active, start_date, end_date, created_at";
const QUESTION_COLUMNS: &str =
    "id, exam_id, type, content, options, answer, analysis, created_at";
const ATTEMPT_COLUMNS: &str =
    "id, user_id, exam_id, answers, score, correct_count, total_questions, submitted_at";
const USER_COLUMNS: &str = "id, username, password, role, created_at";

/// Postgres-backed repository.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique-constraint violations to `Conflict`, everything else to `Database`.
fn conflict_or(err: sqlx::Error, message: impl FnOnce() -> String) -> RepoError {
    let is_unique = err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());
    if is_unique {
        RepoError::Conflict(message())
    } else {
        RepoError::Database(err)
    }
}

#[async_trait]
impl ExamRepository for PgRepository {
    async fn list_exams(&self) -> Result<Vec<Exam>, RepoError> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams ORDER BY start_date DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn get_exam(&self, id: i64) -> Result<Option<Exam>, RepoError> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(exam)
    }

    async fn create_exam(&self, new: CreateExamRequest) -> Result<Exam, RepoError> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            r#"
            INSERT INTO exams (title, is_active, start_date, end_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(new.title)
        .bind(new.is_active)
        .bind(new.start_date)
        .bind(new.end_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(exam)
    }

    async fn update_exam(
        &self,
        id: i64,
        changes: UpdateExamRequest,
    ) -> Result<Option<Exam>, RepoError> {
        if changes.is_empty() {
            return self.get_exam(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE exams SET ");
        let mut separated = builder.separated(", ");

        if let Some(title) = changes.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }

        if let Some(start_date) = changes.start_date {
            separated.push("start_date = ");
            separated.push_bind_unseparated(start_date);
        }

        if let Some(end_date) = changes.end_date {
            separated.push("end_date = ");
            separated.push_bind_unseparated(end_date);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {EXAM_COLUMNS}"));

        let exam = builder
            .build_query_as::<Exam>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(exam)
    }

    async fn set_exam_active(&self, id: i64, is_active: bool) -> Result<bool, RepoError> {
        let result = sqlx::query("UPDATE exams SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_exam(&self, id: i64) -> Result<bool, RepoError> {
        // Questions and attempts go with it (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_questions(&self, filter: QuestionFilter) -> Result<Vec<Question>, RepoError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE TRUE"));

        if let Some(exam_id) = filter.exam_id {
            builder.push(" AND exam_id = ");
            builder.push_bind(exam_id);
        }

        if let Some(question_type) = filter.question_type {
            builder.push(" AND type = ");
            builder.push_bind(question_type);
        }

        builder.push(" ORDER BY id");

        let questions = builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await?;
        Ok(questions)
    }

    async fn create_question(
        &self,
        exam_id: i64,
        new: CreateQuestionRequest,
    ) -> Result<Question, RepoError> {
        let question = sqlx::query_as::<_, Question>(&format!(
            r#"
            INSERT INTO questions (exam_id, type, content, options, answer, analysis)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(exam_id)
        .bind(new.question_type)
        .bind(new.content)
        .bind(Json(new.options))
        .bind(new.answer)
        .bind(new.analysis)
        .fetch_one(&self.pool)
        .await?;
        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_attempt(&self, attempt: NewAttempt) -> Result<AttemptRecord, RepoError> {
        let (user_id, exam_id) = (attempt.user_id, attempt.exam_id);

        sqlx::query_as::<_, AttemptRecord>(&format!(
            r#"
            INSERT INTO exam_attempts
            (user_id, exam_id, answers, score, correct_count, total_questions)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ATTEMPT_COLUMNS}
            "#
        ))
        .bind(attempt.user_id)
        .bind(attempt.exam_id)
        .bind(Json(attempt.answers))
        .bind(attempt.score)
        .bind(attempt.correct_count)
        .bind(attempt.total_questions)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_or(e, || {
                format!("User {user_id} already submitted exam {exam_id}")
            })
        })
    }

    async fn list_attempts_for_user(&self, user_id: i64) -> Result<Vec<AttemptRecord>, RepoError> {
        let attempts = sqlx::query_as::<_, AttemptRecord>(&format!(
            "SELECT {ATTEMPT_COLUMNS} FROM exam_attempts WHERE user_id = $1 ORDER BY submitted_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }
}

#[async_trait]
impl UserRepository for PgRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(&self, new: NewUser) -> Result<User, RepoError> {
        let username = new.username.clone();

        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.password_hash)
        .bind(new.role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or(e, || format!("Username '{}' already exists", username)))
    }

    async fn list_users(&self) -> Result<Vec<User>, RepoError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn delete_user(&self, id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
