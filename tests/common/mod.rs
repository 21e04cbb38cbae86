// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use examprep::{
    client::ApiClient,
    config::Config,
    models::{
        exam::{CreateExamRequest, ExamView},
        question::CreateQuestionRequest,
        user::{NewUser, ROLE_ADMIN},
    },
    repository::{InMemoryRepository, UserRepository},
    routes,
    state::AppState,
    utils::{clock::ManualClock, hash::hash_password},
};

pub const HOUR_MS: i64 = 3_600_000;
pub const SUBMIT_GRACE: i64 = examprep::config::SUBMIT_GRACE_PERIOD_MS;
pub const ADMIN_USERNAME: &str = "admin_test";
pub const ADMIN_PASSWORD: &str = "admin_password";

/// 2026-03-01T08:00:00Z, the instant the test clock starts at.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

pub fn at(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap()
}

pub struct TestApp {
    pub address: String,
    pub clock: ManualClock,
    pub repo: Arc<InMemoryRepository>,
}

impl TestApp {
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.address)
    }

    pub async fn admin(&self) -> ApiClient {
        let mut client = self.client();
        client
            .login(ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .expect("Admin login failed");
        client
    }

    pub async fn candidate(&self) -> ApiClient {
        let username = format!("c_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let mut client = self.client();
        client
            .register(&username, "password123")
            .await
            .expect("Register failed");
        client
            .login(&username, "password123")
            .await
            .expect("Login failed");
        client
    }

    /// Creates an exam whose window is given relative to the clock's current instant.
    pub async fn exam(&self, title: &str, start_offset_ms: i64, end_offset_ms: i64) -> ExamView {
        let now = t0().timestamp_millis();
        self.admin()
            .await
            .create_exam(&CreateExamRequest {
                title: title.to_string(),
                start_date: at(now + start_offset_ms),
                end_date: at(now + end_offset_ms),
                is_active: true,
            })
            .await
            .expect("Create exam failed")
    }

    /// Adds single-choice questions whose correct answer is always "A".
    pub async fn questions(&self, exam_id: i64, count: usize) {
        let admin = self.admin().await;
        for i in 0..count {
            admin
                .create_question(
                    exam_id,
                    &CreateQuestionRequest {
                        question_type: "single".to_string(),
                        content: format!("Question {}", i),
                        options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                        answer: "A".to_string(),
                        analysis: Some("Analysis".to_string()),
                    },
                )
                .await
                .expect("Create question failed");
        }
    }
}

/// Spawns the app on a random port, backed by the in-memory repository and a
/// manual clock set to `t0()`.
pub async fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let clock = ManualClock::new(t0().timestamp_millis());

    repo.create_user(NewUser {
        username: ADMIN_USERNAME.to_string(),
        password_hash: hash_password(ADMIN_PASSWORD).unwrap(),
        role: ROLE_ADMIN.to_string(),
    })
    .await
    .expect("Failed to seed admin");

    let config = Config {
        database_url: String::new(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_username: None,
        admin_password: None,
        port: 0,
    };

    let state = AppState::new(repo.clone(), config).with_clock(Arc::new(clock.clone()));
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        clock,
        repo,
    }
}
