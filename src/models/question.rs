// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// Exam this question belongs to.
    pub exam_id: i64,

    /// Question type: 'single' (single choice) or 'multiple' (multiple choice).
    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub question_type: String,

    /// The text content of the question.
    pub content: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The correct answer key or content.
    pub answer: String,

    /// Explanation or analysis of the correct answer.
    pub analysis: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for sending question to candidates (excludes answer and analysis).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub content: String,
    pub options: Vec<String>,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            question_type: q.question_type,
            content: q.content,
            options: q.options.0,
        }
    }
}

/// Selects which questions a lookup returns.
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub exam_id: Option<i64>,
    pub question_type: Option<String>,
}

impl QuestionFilter {
    pub fn for_exam(exam_id: i64) -> Self {
        Self {
            exam_id: Some(exam_id),
            question_type: None,
        }
    }

    pub fn matches(&self, q: &Question) -> bool {
        self.exam_id.is_none_or(|id| q.exam_id == id)
            && self
                .question_type
                .as_deref()
                .is_none_or(|t| q.question_type == t)
    }
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(custom(function = validate_question_type))]
    pub question_type: String,
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(min = 1, max = 500))]
    pub answer: String,
    #[validate(length(max = 2000))]
    pub analysis: Option<String>,
}

fn validate_question_type(question_type: &str) -> Result<(), validator::ValidationError> {
    match question_type {
        "single" | "multiple" => Ok(()),
        _ => Err(validator::ValidationError::new("invalid_question_type")),
    }
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(question_type: &str, options: Vec<String>) -> CreateQuestionRequest {
        CreateQuestionRequest {
            question_type: question_type.to_string(),
            content: "Quel est le traitement de première intention ?".to_string(),
            options,
            answer: "A".to_string(),
            analysis: None,
        }
    }

    #[test]
    fn rejects_unknown_type_and_empty_options() {
        assert!(request("single", vec!["A".into(), "B".into()]).validate().is_ok());
        assert!(request("essay", vec!["A".into()]).validate().is_err());
        assert!(request("single", vec![]).validate().is_err());
    }

    #[test]
    fn public_question_hides_answer() {
        let q = Question {
            id: 7,
            exam_id: 1,
            question_type: "single".to_string(),
            content: "c".to_string(),
            options: Json(vec!["A".to_string()]),
            answer: "A".to_string(),
            analysis: Some("because".to_string()),
            created_at: None,
        };
        let json = serde_json::to_value(PublicQuestion::from(q)).unwrap();
        assert!(json.get("answer").is_none());
        assert_eq!(json["type"], "single");
    }
}
