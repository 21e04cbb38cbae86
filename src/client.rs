// src/client.rs

//! Typed HTTP client for the exam API, as used by a candidate or admin front-end.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;

use crate::{
    exam::{
        attempt::{AttemptSubmitter, SubmitError},
        status::ExamStatus,
    },
    models::{
        attempt::{AttemptRecord, AttemptResult},
        exam::{CreateExamRequest, ExamView, UpdateExamRequest},
        question::{CreateQuestionRequest, PublicQuestion},
    },
    query::QueryState,
    session::store::Answers,
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The exam is live; repeat the call with `confirm = true`.
    #[error("confirmation required: exam is {status}")]
    ConfirmationRequired { status: ExamStatus, message: String },

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::ConfirmationRequired { .. } => Some(StatusCode::CONFLICT.as_u16()),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Logs in and keeps the token for subsequent calls. Returns the user's role.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String, ClientError> {
        let resp = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body: serde_json::Value = check(resp).await?.json().await?;

        let (Some(token), Some(role)) = (body["token"].as_str(), body["role"].as_str()) else {
            return Err(malformed(status, "login response lacks token or role"));
        };
        self.token = Some(token.to_string());
        Ok(role.to_string())
    }

    pub async fn list_exams(&self) -> Result<Vec<ExamView>, ClientError> {
        self.get_json("/api/exams").await
    }

    /// Fetches an exam. A missing exam is `NotFound`, not an error.
    pub async fn get_exam(&self, id: i64) -> Result<QueryState<ExamView>, ClientError> {
        let resp = self
            .authed(self.http.get(self.url(&format!("/api/exams/{id}"))))
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(QueryState::NotFound);
        }
        Ok(QueryState::Found(check(resp).await?.json().await?))
    }

    pub async fn list_questions(&self, exam_id: i64) -> Result<Vec<PublicQuestion>, ClientError> {
        self.get_json(&format!("/api/exams/{exam_id}/questions")).await
    }

    pub async fn my_attempts(&self) -> Result<Vec<AttemptRecord>, ClientError> {
        self.get_json("/api/attempts/me").await
    }

    pub async fn create_exam(&self, req: &CreateExamRequest) -> Result<ExamView, ClientError> {
        let resp = self
            .authed(self.http.post(self.url("/api/admin/exams")))
            .json(req)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn create_question(
        &self,
        exam_id: i64,
        req: &CreateQuestionRequest,
    ) -> Result<i64, ClientError> {
        let resp = self
            .authed(
                self.http
                    .post(self.url(&format!("/api/admin/exams/{exam_id}/questions"))),
            )
            .json(req)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body: serde_json::Value = check(resp).await?.json().await?;
        body["id"]
            .as_i64()
            .ok_or_else(|| malformed(status, "question response lacks an id"))
    }

    pub async fn update_exam(
        &self,
        id: i64,
        changes: &UpdateExamRequest,
        confirm: bool,
    ) -> Result<ExamView, ClientError> {
        let resp = self
            .authed(self.http.put(self.url(&format!("/api/admin/exams/{id}"))))
            .query(&[("confirm", confirm)])
            .json(changes)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn deactivate_exam(&self, id: i64, confirm: bool) -> Result<(), ClientError> {
        let resp = self
            .authed(
                self.http
                    .post(self.url(&format!("/api/admin/exams/{id}/deactivate"))),
            )
            .query(&[("confirm", confirm)])
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn delete_exam(&self, id: i64, confirm: bool) -> Result<(), ClientError> {
        let resp = self
            .authed(self.http.delete(self.url(&format!("/api/admin/exams/{id}"))))
            .query(&[("confirm", confirm)])
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let resp = self.authed(self.http.get(self.url(path))).send().await?;
        Ok(check(resp).await?.json().await?)
    }
}

fn malformed(status: u16, message: &str) -> ClientError {
    ClientError::Api {
        status,
        message: message.to_string(),
    }
}

/// Turns non-2xx responses into `ClientError`, reading the `{"error": ...}` body.
async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    let message = body["error"]
        .as_str()
        .or(status.canonical_reason())
        .unwrap_or("request failed")
        .to_string();

    if body["requires_confirmation"] == true {
        let exam_status =
            serde_json::from_value(body["status"].clone()).unwrap_or(ExamStatus::Active);
        return Err(ClientError::ConfirmationRequired {
            status: exam_status,
            message,
        });
    }

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AttemptSubmitter for ApiClient {
    async fn submit_attempt(
        &self,
        exam_id: i64,
        answers: &Answers,
    ) -> Result<AttemptResult, SubmitError> {
        let resp = self
            .authed(
                self.http
                    .post(self.url(&format!("/api/exams/{exam_id}/attempts"))),
            )
            .json(&json!({ "answers": answers }))
            .send()
            .await
            .map_err(|e| SubmitError::Unreachable(e.to_string()))?;

        match check(resp).await {
            Ok(resp) => resp
                .json()
                .await
                .map_err(|e| SubmitError::Unreachable(e.to_string())),
            Err(ClientError::Api { status: 409, .. }) => Err(SubmitError::AlreadySubmitted),
            // Server trouble and throttling may clear up; anything else will not.
            Err(e @ ClientError::Api { status: 408 | 429 | 500..=599, .. }) => {
                Err(SubmitError::Unreachable(e.to_string()))
            }
            Err(e) => Err(SubmitError::Rejected(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;

    use super::*;

    /// Serves fixed responses on the routes the client talks to.
    async fn stub(router: Router) -> ApiClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        ApiClient::new(address).with_token("t")
    }

    #[tokio::test]
    async fn login_without_token_is_an_error() {
        let mut client = stub(Router::new().route(
            "/api/auth/login",
            post(|| async { Json(json!({ "role": "user" })) }),
        ))
        .await;

        let err = client.login("someone", "password123").await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 200, .. }));
    }

    #[tokio::test]
    async fn question_response_without_id_is_an_error() {
        let client = stub(Router::new().route(
            "/api/admin/exams/{id}/questions",
            post(|| async { (StatusCode::CREATED, Json(json!({}))) }),
        ))
        .await;

        let req = CreateQuestionRequest {
            question_type: "single".to_string(),
            content: "c".to_string(),
            options: vec!["A".to_string()],
            answer: "A".to_string(),
            analysis: None,
        };
        let err = client.create_question(1, &req).await.unwrap_err();
        assert!(matches!(err, ClientError::Api { status: 201, .. }));
    }

    #[tokio::test]
    async fn server_errors_are_transient_for_submission() {
        let client = stub(
            Router::new()
                .route(
                    "/api/exams/1/attempts",
                    post(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(json!({}))) }),
                )
                .route(
                    "/api/exams/2/attempts",
                    post(|| async {
                        (StatusCode::FORBIDDEN, Json(json!({ "error": "closed" })))
                    }),
                ),
        )
        .await;

        let answers = Answers::new();
        assert!(matches!(
            client.submit_attempt(1, &answers).await,
            Err(SubmitError::Unreachable(_))
        ));
        assert!(matches!(
            client.submit_attempt(2, &answers).await,
            Err(SubmitError::Rejected(_))
        ));
    }
}
