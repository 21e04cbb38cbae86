// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    exam::guard::MutationGuard,
    models::{
        exam::{ConfirmParams, CreateExamRequest, ExamView, UpdateExamRequest, validate_window},
        question::CreateQuestionRequest,
        user::{AdminCreateUserRequest, NewUser},
    },
    repository::RepoError,
    state::AppState,
    utils::{
        hash::hash_password,
        html::{sanitize_plain, sanitize_rich_text},
        jwt::Claims,
    },
};

/// Admin actions that may disturb candidates sitting a live exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamMutation {
    Edit(UpdateExamRequest),
    Deactivate,
    Delete,
}

impl ExamMutation {
    fn verb(&self) -> &'static str {
        match self {
            ExamMutation::Edit(_) => "edit",
            ExamMutation::Deactivate => "deactivate",
            ExamMutation::Delete => "delete",
        }
    }
}

/// What a guarded mutation produced.
enum Applied {
    Edited(ExamView),
    Done,
}

/// Runs `mutation` on exam `id` through the mutation guard.
///
/// The exam status is resolved with a fresh `now`. A live exam needs `confirm=true`;
/// without it the guard is cancelled and nothing reaches the repository. The status
/// is not re-checked after confirmation: the repository's answer is final.
async fn run_guarded(
    state: &AppState,
    id: i64,
    mutation: ExamMutation,
    confirm: bool,
) -> Result<Applied, AppError> {
    let exam = state
        .exams
        .get_exam(id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))?;

    let verb = mutation.verb();
    let mut guard = MutationGuard::new();
    guard.request(mutation, &exam.window(), state.now_ms())?;

    if guard.is_confirming() {
        if !confirm {
            guard.cancel()?;
            let status = guard.observed_status().unwrap_or(exam.status_at(state.now_ms()));
            tracing::info!(exam_id = id, action = verb, "Guarded action awaiting confirmation");
            return Err(AppError::ConfirmationRequired {
                status,
                message: format!(
                    "Exam '{}' is {}; candidates may be mid-attempt. Repeat with confirm=true to {}.",
                    exam.title, status, verb
                ),
            });
        }
        guard.confirm()?;
        tracing::warn!(exam_id = id, action = verb, "Admin confirmed action on a live exam");
    }

    let now = state.now_ms();
    let outcome = guard
        .apply(|mutation| async move {
            match mutation {
                ExamMutation::Edit(changes) => state
                    .exams
                    .update_exam(id, changes)
                    .await
                    .map(|exam| exam.map(|e| Applied::Edited(ExamView::from_exam(e, now)))),
                ExamMutation::Deactivate => state
                    .exams
                    .set_exam_active(id, false)
                    .await
                    .map(|found| found.then_some(Applied::Done)),
                ExamMutation::Delete => state
                    .exams
                    .delete_exam(id)
                    .await
                    .map(|found| found.then_some(Applied::Done)),
            }
        })
        .await?;

    match outcome {
        Ok(Some(applied)) => {
            tracing::info!(exam_id = id, action = verb, "Exam mutation applied");
            Ok(applied)
        }
        // Deleted between the lookup and the mutation.
        Ok(None) => Err(AppError::NotFound("Exam not found".to_string())),
        Err(RepoError::Conflict(msg)) => Err(AppError::Conflict(msg)),
        Err(e) => {
            tracing::error!(exam_id = id, action = verb, "Exam mutation failed: {}", e);
            Err(AppError::InternalServerError(e.to_string()))
        }
    }
}

/// Creates a new exam.
/// Admin only.
pub async fn create_exam(
    State(state): State<AppState>,
    Json(mut payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    validate_window(payload.start_date, payload.end_date).map_err(AppError::BadRequest)?;
    payload.title = sanitize_plain(&payload.title);

    let exam = state.exams.create_exam(payload).await?;
    tracing::info!(exam_id = exam.id, "Exam created");

    Ok((
        StatusCode::CREATED,
        Json(ExamView::from_exam(exam, state.now_ms())),
    ))
}

/// Edits an exam's title or window.
/// Admin only. Guarded: a live exam requires `?confirm=true`.
pub async fn update_exam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ConfirmParams>,
    Json(mut payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    if payload.is_empty() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }

    // The merged window must stay ordered.
    if payload.start_date.is_some() || payload.end_date.is_some() {
        let current = state
            .exams
            .get_exam(id)
            .await?
            .ok_or(AppError::NotFound("Exam not found".to_string()))?;
        validate_window(
            payload.start_date.unwrap_or(current.start_date),
            payload.end_date.unwrap_or(current.end_date),
        )
        .map_err(AppError::BadRequest)?;
    }

    payload.title = payload.title.map(|t| sanitize_plain(&t));

    match run_guarded(&state, id, ExamMutation::Edit(payload), params.confirm).await? {
        Applied::Edited(view) => Ok(Json(view)),
        Applied::Done => Err(AppError::InternalServerError(
            "edit produced no exam".to_string(),
        )),
    }
}

/// Turns the administrative kill switch off.
/// Admin only. Guarded: a live exam requires `?confirm=true`.
pub async fn deactivate_exam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ConfirmParams>,
) -> Result<impl IntoResponse, AppError> {
    run_guarded(&state, id, ExamMutation::Deactivate, params.confirm).await?;
    Ok(StatusCode::OK)
}

/// Turns the administrative kill switch back on. Not guarded.
/// Admin only.
pub async fn activate_exam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.exams.set_exam_active(id, true).await? {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }
    Ok(StatusCode::OK)
}

/// Deletes an exam with its questions and attempts.
/// Admin only. Guarded: a live exam requires `?confirm=true`.
pub async fn delete_exam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ConfirmParams>,
) -> Result<impl IntoResponse, AppError> {
    run_guarded(&state, id, ExamMutation::Delete, params.confirm).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Adds a question to an exam.
/// Admin only.
pub async fn create_question(
    State(state): State<AppState>,
    Path(exam_id): Path<i64>,
    Json(mut payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    if state.exams.get_exam(exam_id).await?.is_none() {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    payload.content = sanitize_rich_text(&payload.content);
    payload.analysis = payload.analysis.map(|a| sanitize_rich_text(&a));
    payload.options = payload.options.iter().map(|o| sanitize_plain(o)).collect();

    let question = state.exams.create_question(exam_id, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"id": question.id})),
    ))
}

/// Deletes a quiz question by ID.
/// Admin only.
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.exams.delete_question(id).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.users.list_users().await?;
    Ok(Json(users))
}

/// Creates a new user with specific role.
/// Admin only.
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<AdminCreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let password_hash = hash_password(&payload.password)?;

    let user = state
        .users
        .create_user(NewUser {
            username: payload.username,
            password_hash,
            role: payload.role,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": user.id}))))
}

/// Deletes a user by ID.
/// Admin only. Prevents deleting self.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if id == claims.user_id()? {
        return Err(AppError::BadRequest("Cannot delete yourself".to_string()));
    }

    if !state.users.delete_user(id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
