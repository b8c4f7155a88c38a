// src/grading/analytics.rs

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{question::Question, submission::Submission};

/// Error distribution for one question across a set of submissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionStat {
    pub question_id: i64,
    pub content: String,
    pub correct_answer: String,
    /// Submissions that recorded any answer for this question.
    pub total_attempts: u32,
    pub wrong_count: u32,
    /// Percentage of attempts that were wrong, one decimal place.
    pub error_rate: f64,
    /// Wrong labels and how often each was picked. Labels are tallied as
    /// recorded, even ones that name no option.
    pub wrong_answer_histogram: BTreeMap<String, u32>,
}

/// Builds one [`QuestionStat`] per question, in the order of `questions`.
///
/// Only submissions that recorded an answer for a question count towards
/// its attempts; unanswered questions never lower the error rate.
pub fn analyze(questions: &[Question], submissions: &[Submission]) -> Vec<QuestionStat> {
    questions
        .iter()
        .map(|q| question_stat(q, submissions))
        .collect()
}

fn question_stat(question: &Question, submissions: &[Submission]) -> QuestionStat {
    let mut total_attempts = 0u32;
    let mut wrong_count = 0u32;
    let mut histogram: BTreeMap<String, u32> = BTreeMap::new();

    for recorded in submissions.iter().filter_map(|s| s.answers.get(&question.id)) {
        total_attempts += 1;
        if recorded != &question.answer {
            wrong_count += 1;
            *histogram.entry(recorded.clone()).or_insert(0) += 1;
        }
    }

    QuestionStat {
        question_id: question.id,
        content: question.content.clone(),
        correct_answer: question.answer.clone(),
        total_attempts,
        wrong_count,
        error_rate: error_rate(wrong_count, total_attempts),
        wrong_answer_histogram: histogram,
    }
}

/// Mean recorded score across submissions, one decimal place, 0 with none.
pub fn average_score(submissions: &[Submission]) -> f64 {
    if submissions.is_empty() {
        return 0.0;
    }
    let total: i64 = submissions.iter().map(|s| s.score).sum();
    one_decimal(total as f64 / submissions.len() as f64)
}

/// `wrong / attempts` as a percentage rounded to one decimal, 0 with no attempts.
fn error_rate(wrong: u32, attempts: u32) -> f64 {
    if attempts == 0 {
        return 0.0;
    }
    one_decimal(wrong as f64 / attempts as f64 * 100.0)
}

fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
