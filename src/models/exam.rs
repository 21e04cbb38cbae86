// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::exam::status::{ExamStatus, ExamWindow, resolve_status};

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,

    pub title: String,

    /// Administrative kill switch, independent of the window.
    pub is_active: bool,

    /// The attempt window. `end_date > start_date` is checked on create/edit.
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    pub created_at: Option<DateTime<Utc>>,
}

impl Exam {
    pub fn window(&self) -> ExamWindow {
        ExamWindow {
            is_active: self.is_active,
            start_date: self.start_date.timestamp_millis(),
            end_date: self.end_date.timestamp_millis(),
        }
    }

    pub fn status_at(&self, now: i64) -> ExamStatus {
        resolve_status(&self.window(), now)
    }
}

/// DTO for sending an exam to clients, with its status resolved at request time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamView {
    pub id: i64,
    pub title: String,
    pub is_active: bool,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub status: ExamStatus,
}

impl ExamView {
    pub fn from_exam(exam: Exam, now: i64) -> Self {
        let status = exam.status_at(now);
        Self {
            id: exam.id,
            title: exam.title,
            is_active: exam.is_active,
            start_date: exam.start_date,
            end_date: exam.end_date,
            status,
        }
    }

    pub fn window(&self) -> ExamWindow {
        ExamWindow {
            is_active: self.is_active,
            start_date: self.start_date.timestamp_millis(),
            end_date: self.end_date.timestamp_millis(),
        }
    }
}

/// DTO for creating a new exam.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 characters."))]
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// DTO for editing an exam. Fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 characters."))]
    pub title: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl UpdateExamRequest {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start_date.is_none() && self.end_date.is_none()
    }
}

/// Query parameters of guarded admin actions.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
    #[serde(default)]
    pub confirm: bool,
}

/// Rejects windows that do not satisfy `end_date > start_date`.
pub fn validate_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), String> {
    if end <= start {
        return Err("end_date must be after start_date".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn exam(is_active: bool) -> Exam {
        Exam {
            id: 1,
            title: "Cardiologie".to_string(),
            is_active,
            start_date: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            created_at: None,
        }
    }

    #[test]
    fn view_carries_status_at_given_instant() {
        let e = exam(true);
        let during = e.start_date.timestamp_millis() + 1;
        let after = e.end_date.timestamp_millis() + 1;

        assert_eq!(ExamView::from_exam(e.clone(), during).status, ExamStatus::Active);
        assert_eq!(ExamView::from_exam(e, after).status, ExamStatus::Completed);
        assert_eq!(
            ExamView::from_exam(exam(false), during).status,
            ExamStatus::Inactive
        );
    }

    #[test]
    fn window_must_be_ordered() {
        let e = exam(true);
        assert!(validate_window(e.start_date, e.end_date).is_ok());
        assert!(validate_window(e.end_date, e.start_date).is_err());
        assert!(validate_window(e.start_date, e.start_date).is_err());
    }

    #[test]
    fn create_request_defaults_to_active() {
        let req: CreateExamRequest = serde_json::from_value(serde_json::json!({
            "title": "ECN blanc",
            "start_date": "2026-03-01T08:00:00Z",
            "end_date": "2026-03-01T12:00:00Z"
        }))
        .unwrap();
        assert!(req.is_active);
        assert!(req.validate().is_ok());
    }
}
