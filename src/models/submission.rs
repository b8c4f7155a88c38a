// src/models/submission.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::grading::QuestionOutcome;

/// One student's graded answer set for one exam.
/// Created exactly once per (student, exam); there is no edit path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,

    /// Question id -> chosen label. A missing key means unanswered.
    pub answers: HashMap<i64, String>,

    /// Score computed server-side from the answer key at submit time.
    pub score: i64,

    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A graded submission ready to be appended to the store.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub student_id: i64,
    pub exam_id: i64,
    pub answers: HashMap<i64, String>,
    pub score: i64,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    /// Key: Question ID, Value: selected option label ("A".."E").
    #[serde(default)]
    pub answers: HashMap<i64, String>,
}

/// Returned to the student right after submitting.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub result_id: i64,
    pub score: i64,
    pub total_score: i64,
    pub correct_count: usize,
    pub total_questions: usize,
}

/// Row in a student's result list.
#[derive(Debug, Serialize)]
pub struct ResultSummary {
    pub id: i64,
    pub exam_id: i64,
    /// `None` when the exam no longer exists.
    pub exam_title: Option<String>,
    pub score: i64,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// One question in the post-exam review.
#[derive(Debug, Serialize)]
pub struct ReviewItem {
    pub content: String,
    pub options: Vec<String>,
    pub labels: Vec<String>,
    pub score: i64,
    #[serde(flatten)]
    pub outcome: QuestionOutcome,
}

/// Question-by-question review of a submitted exam.
#[derive(Debug, Serialize)]
pub struct ResultReview {
    pub id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    /// The score persisted at submit time.
    pub score: i64,
    pub total_score: i64,
    pub correct_count: usize,
    pub wrong_count: usize,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
    pub questions: Vec<ReviewItem>,
}
