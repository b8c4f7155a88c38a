// src/grading/score.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::models::question::Question;

/// How one question fared in a graded submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionOutcome {
    pub question_id: i64,
    /// The label the student picked, `None` if unanswered.
    pub chosen: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub points_awarded: i64,
}

/// Result of grading one answer set against an exam's questions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradedResult {
    pub score: i64,
    pub correct_count: usize,
    /// Includes unanswered questions.
    pub wrong_count: usize,
    pub outcomes: Vec<QuestionOutcome>,
}

/// Sums the score of every question whose recorded answer equals its key.
///
/// Answers for ids outside `questions` are ignored. Comparison is exact and
/// case-sensitive.
pub fn grade(questions: &[Question], answers: &HashMap<i64, String>) -> i64 {
    questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.answer))
        .map(|q| q.score)
        .sum()
}

/// Grades like [`grade`] and keeps the per-question breakdown, in the order
/// of `questions`.
pub fn grade_detailed(questions: &[Question], answers: &HashMap<i64, String>) -> GradedResult {
    let mut score = 0;
    let mut correct_count = 0;

    let outcomes: Vec<QuestionOutcome> = questions
        .iter()
        .map(|q| {
            let chosen = answers.get(&q.id).cloned();
            let is_correct = chosen.as_deref() == Some(q.answer.as_str());
            let points_awarded = if is_correct { q.score } else { 0 };

            if is_correct {
                score += q.score;
                correct_count += 1;
            }

            QuestionOutcome {
                question_id: q.id,
                chosen,
                correct_answer: q.answer.clone(),
                is_correct,
                points_awarded,
            }
        })
        .collect();

    GradedResult {
        score,
        correct_count,
        wrong_count: questions.len() - correct_count,
        outcomes,
    }
}
