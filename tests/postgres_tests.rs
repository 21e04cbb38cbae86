// tests/postgres_tests.rs

//! Runs against a real database: `DATABASE_URL=... cargo test -- --ignored`.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use examprep::{
    models::{
        attempt::NewAttempt,
        exam::{CreateExamRequest, UpdateExamRequest},
        question::{CreateQuestionRequest, QuestionFilter},
        user::{NewUser, ROLE_USER},
    },
    repository::{ExamRepository, PgRepository, RepoError, UserRepository},
};
use sqlx::postgres::PgPoolOptions;

async fn repo() -> PgRepository {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    PgRepository::new(pool)
}

#[tokio::test]
#[ignore = "needs DATABASE_URL"]
async fn exam_lifecycle_round_trips_through_postgres() {
    let repo = repo().await;
    let now = Utc::now();

    let exam = repo
        .create_exam(CreateExamRequest {
            title: "Néphrologie".to_string(),
            start_date: now - Duration::hours(1),
            end_date: now + Duration::hours(1),
            is_active: true,
        })
        .await
        .unwrap();

    let renamed = repo
        .update_exam(
            exam.id,
            UpdateExamRequest {
                title: Some("Néphrologie 2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(renamed.title, "Néphrologie 2");
    assert_eq!(renamed.start_date.timestamp(), exam.start_date.timestamp());

    let question = repo
        .create_question(
            exam.id,
            CreateQuestionRequest {
                question_type: "single".to_string(),
                content: "c".to_string(),
                options: vec!["A".into(), "B".into()],
                answer: "A".to_string(),
                analysis: None,
            },
        )
        .await
        .unwrap();
    let listed = repo.list_questions(QuestionFilter::for_exam(exam.id)).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].options.0, vec!["A".to_string(), "B".to_string()]);

    let username = format!("pg_{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let user = repo
        .create_user(NewUser {
            username,
            password_hash: "x".to_string(),
            role: ROLE_USER.to_string(),
        })
        .await
        .unwrap();

    let attempt = || NewAttempt {
        user_id: user.id,
        exam_id: exam.id,
        answers: HashMap::from([(question.id.to_string(), "A".to_string())]),
        score: 100.0,
        correct_count: 1,
        total_questions: 1,
    };
    repo.record_attempt(attempt()).await.unwrap();
    assert!(matches!(
        repo.record_attempt(attempt()).await,
        Err(RepoError::Conflict(_))
    ));

    assert!(repo.delete_exam(exam.id).await.unwrap());
    assert!(repo.list_attempts_for_user(user.id).await.unwrap().is_empty());
    assert!(repo.delete_user(user.id).await.unwrap());
}
