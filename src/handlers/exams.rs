// src/handlers/exams.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    config::{PASSING_SCORE_PERCENTAGE, SUBMIT_GRACE_PERIOD_MS},
    error::AppError,
    exam::status::{ExamStatus, ExamWindow, resolve_status},
    models::{
        attempt::{AttemptResult, NewAttempt, SubmitAttemptRequest},
        exam::{Exam, ExamView},
        question::{PublicQuestion, QuestionFilter},
    },
    session::store::Answers,
    state::AppState,
    utils::jwt::Claims,
};

/// Helper function to calculate score.
/// Returns (correct_count, score_percentage) over every question of the exam,
/// so unanswered questions count as wrong.
fn calculate_score(user_answers: &Answers, answer_key: &HashMap<String, String>) -> (usize, f64) {
    let total_questions = answer_key.len();

    if total_questions == 0 {
        return (0, 0.0);
    }

    let correct_count = answer_key
        .iter()
        .filter(|(q_id, correct)| user_answers.get(*q_id) == Some(*correct))
        .count();

    let score = (correct_count as f64 / total_questions as f64) * 100.0;
    (correct_count, score)
}

/// Whether a submission arriving at `now` may be recorded.
///
/// Active exams accept it; a completed exam still does for a short grace period so a
/// timer-expiry auto-submit that lands late is not lost.
fn accepts_submission(window: &ExamWindow, now: i64) -> Result<(), ExamStatus> {
    match resolve_status(window, now) {
        ExamStatus::Active => Ok(()),
        ExamStatus::Completed if now - window.end_date <= SUBMIT_GRACE_PERIOD_MS => Ok(()),
        status => Err(status),
    }
}

async fn load_exam(state: &AppState, id: i64) -> Result<Exam, AppError> {
    state
        .exams
        .get_exam(id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// Lists all exams with their status resolved now.
pub async fn list_exams(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let now = state.now_ms();
    let exams: Vec<ExamView> = state
        .exams
        .list_exams()
        .await?
        .into_iter()
        .map(|exam| ExamView::from_exam(exam, now))
        .collect();

    Ok(Json(exams))
}

/// Retrieves one exam with its current status.
pub async fn get_exam(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = load_exam(&state, id).await?;
    Ok(Json(ExamView::from_exam(exam, state.now_ms())))
}

/// Returns the exam's questions without their answers.
/// Only available while the exam is active.
pub async fn list_questions(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = load_exam(&state, id).await?;

    let status = exam.status_at(state.now_ms());
    if !status.permits_attempt() {
        return Err(AppError::Forbidden(format!("Exam is {status}")));
    }

    let questions: Vec<PublicQuestion> = state
        .exams
        .list_questions(QuestionFilter::for_exam(id))
        .await?
        .into_iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(Json(questions))
}

/// Submits a candidate's final answers for an exam.
///
/// * Checks the exam accepts submissions at this instant.
/// * Scores the answers against the exam's questions.
/// * Records the attempt; a second attempt for the same exam is a 409.
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let exam = load_exam(&state, id).await?;

    if let Err(status) = accepts_submission(&exam.window(), state.now_ms()) {
        return Err(AppError::Forbidden(format!(
            "Exam is {status}; submissions are closed"
        )));
    }

    let answer_key: HashMap<String, String> = state
        .exams
        .list_questions(QuestionFilter::for_exam(id))
        .await?
        .into_iter()
        .map(|q| (q.id.to_string(), q.answer))
        .collect();

    let (correct_count, score) = calculate_score(&req.answers, &answer_key);
    let result = AttemptResult {
        score,
        correct_count: correct_count as i64,
        total_questions: answer_key.len() as i64,
        passed: score >= PASSING_SCORE_PERCENTAGE,
    };

    state
        .exams
        .record_attempt(NewAttempt {
            user_id,
            exam_id: id,
            answers: req.answers,
            score: result.score,
            correct_count: result.correct_count,
            total_questions: result.total_questions,
        })
        .await
        .map_err(|e| {
            tracing::warn!(user_id, exam_id = id, "Attempt not recorded: {}", e);
            AppError::from(e)
        })?;

    tracing::info!(user_id, exam_id = id, score, "Attempt recorded");

    Ok((StatusCode::CREATED, Json(result)))
}

/// Lists the caller's recorded attempts, newest first.
pub async fn my_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let attempts = state
        .exams
        .list_attempts_for_user(claims.user_id()?)
        .await?;

    Ok(Json(attempts))
}
