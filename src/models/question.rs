// src/models/question.rs

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::grading::labels::{index_for_label, option_labels};

/// Fewest options a question may carry.
pub const MIN_OPTIONS: usize = 2;
/// Most options a question may carry (labels A..E).
pub const MAX_OPTIONS: usize = 5;

/// A multiple-choice question in the question bank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: i64,

    /// The text content of the question.
    pub content: String,

    /// Ordered option texts. Position `i` is answered with label `'A' + i`,
    /// so this order must never change once the question is authored.
    pub options: Vec<String>,

    /// The correct label, e.g. "C".
    pub answer: String,

    /// Points awarded for a correct answer.
    pub score: i64,

    pub created_by: i64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for sending a question to a student (excludes the answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub content: String,
    pub options: Vec<String>,
    /// Label to submit for each option, parallel to `options`.
    pub labels: Vec<String>,
    pub score: i64,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            content: q.content.clone(),
            options: q.options.clone(),
            labels: option_labels(q.options.len()),
            score: q.score,
        }
    }
}

/// A validated question ready to be written to the store.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub content: String,
    pub options: Vec<String>,
    pub answer: String,
    pub score: i64,
    pub created_by: i64,
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = validate_answer_in_range, skip_on_field_errors = true))]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(equal = 1))]
    pub answer: String,
    #[validate(range(min = 1, max = 1000))]
    pub score: i64,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateQuestionRequest {
    pub content: Option<String>,
    pub options: Option<Vec<String>>,
    pub answer: Option<String>,
    pub score: Option<i64>,
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.options.is_none()
            && self.answer.is_none()
            && self.score.is_none()
    }

    /// Overlays the patch on an existing question so the merged result can
    /// be validated with the same rules as a fresh one.
    pub fn merge(self, current: &Question) -> CreateQuestionRequest {
        CreateQuestionRequest {
            content: self.content.unwrap_or_else(|| current.content.clone()),
            options: self.options.unwrap_or_else(|| current.options.clone()),
            answer: self.answer.unwrap_or_else(|| current.answer.clone()),
            score: self.score.unwrap_or(current.score),
        }
    }
}

fn validate_options(options: &[String]) -> Result<(), ValidationError> {
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        return Err(ValidationError::new("options_count_out_of_range"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(ValidationError::new("option_cannot_be_empty"));
        }
        if opt.len() > 500 {
            return Err(ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_answer_in_range(req: &CreateQuestionRequest) -> Result<(), ValidationError> {
    match index_for_label(&req.answer) {
        Some(idx) if idx < req.options.len() => Ok(()),
        _ => Err(ValidationError::new("answer_not_an_option_label")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(options: &[&str], answer: &str) -> CreateQuestionRequest {
        CreateQuestionRequest {
            content: "Which dynasty built the Forbidden City?".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            answer: answer.to_string(),
            score: 2,
        }
    }

    #[test]
    fn accepts_answer_within_options() {
        assert!(request(&["Ming", "Qing", "Tang"], "C").validate().is_ok());
    }

    #[test]
    fn rejects_answer_past_last_option() {
        assert!(request(&["Ming", "Qing"], "C").validate().is_err());
    }

    #[test]
    fn rejects_lowercase_answer() {
        assert!(request(&["Ming", "Qing"], "a").validate().is_err());
    }

    #[test]
    fn rejects_option_count_out_of_range() {
        assert!(request(&["Ming"], "A").validate().is_err());
        assert!(request(&["a", "b", "c", "d", "e", "f"], "A").validate().is_err());
    }

    #[test]
    fn merge_keeps_untouched_fields() {
        let current = Question {
            id: 1,
            content: "Old".to_string(),
            options: vec!["x".to_string(), "y".to_string()],
            answer: "B".to_string(),
            score: 3,
            created_by: 9,
            created_at: None,
        };
        let patch = UpdateQuestionRequest {
            content: Some("New".to_string()),
            ..Default::default()
        };
        let merged = patch.merge(&current);
        assert_eq!(merged.content, "New");
        assert_eq!(merged.answer, "B");
        assert_eq!(merged.score, 3);
    }
}
