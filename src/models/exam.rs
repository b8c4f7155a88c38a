// src/models/exam.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    grading::QuestionStat,
    models::question::{PublicQuestion, Question},
};

/// A timed exam assembled from bank questions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub duration_minutes: i64,

    /// Entered by the teacher; independent of the sum of question scores.
    pub total_score: i64,

    /// Membership and display order of the exam's questions.
    pub question_ids: Vec<i64>,

    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Exam {
    /// Orders fetched questions by `question_ids`, dropping ids that did not
    /// resolve and repeated ids after their first occurrence.
    pub fn order_questions(&self, fetched: Vec<Question>) -> Vec<Question> {
        let mut by_id: std::collections::HashMap<i64, Question> =
            fetched.into_iter().map(|q| (q.id, q)).collect();

        self.question_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect()
    }
}

/// A validated exam ready to be written to the store.
#[derive(Debug, Clone)]
pub struct NewExam {
    pub title: String,
    pub duration_minutes: i64,
    pub total_score: i64,
    pub question_ids: Vec<i64>,
    pub created_by: i64,
}

/// DTO for creating an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(range(min = 1, max = 1440))]
    pub duration_minutes: i64,
    #[validate(range(min = 1))]
    pub total_score: i64,
    #[validate(length(min = 1, max = 200))]
    pub question_ids: Vec<i64>,
}

impl CreateExamRequest {
    /// Question ids with repeats removed, first occurrence kept.
    pub fn unique_question_ids(&self) -> Vec<i64> {
        let mut seen = std::collections::HashSet::new();
        self.question_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// An exam as served to a student taking it: answer keys stripped.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExamPaper {
    pub id: i64,
    pub title: String,
    pub duration_minutes: i64,
    pub total_score: i64,
    pub questions: Vec<PublicQuestion>,
}

/// One ranked row of an exam's result table.
#[derive(Debug, Serialize)]
pub struct RankedResult {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub score: i64,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Teacher view of an exam: ranked results and per-question error rates.
#[derive(Debug, Serialize)]
pub struct ExamAnalytics {
    pub exam: Exam,
    pub submission_count: usize,
    /// Mean score, one decimal place; 0.0 before anyone submits.
    pub average_score: f64,
    pub results: Vec<RankedResult>,
    pub question_stats: Vec<QuestionStat>,
}
