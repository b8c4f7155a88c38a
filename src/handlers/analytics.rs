// src/handlers/analytics.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    grading::{analyze, average_score},
    handlers::exams::{exam_questions, load_exam},
    models::exam::{ExamAnalytics, RankedResult},
    store::SharedStore,
};

/// Ranked results and per-question error distribution for one exam.
/// Teacher only.
pub async fn exam_analytics(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = load_exam(&store, id).await?;
    let questions = exam_questions(&store, &exam).await?;
    let submissions = store.submissions_for_exam(exam.id).await?;

    let student_ids: Vec<i64> = submissions.iter().map(|s| s.student_id).collect();
    let names = store.usernames_for(&student_ids).await?;

    let question_stats = analyze(&questions, &submissions);
    let average_score = average_score(&submissions);

    let results: Vec<RankedResult> = submissions
        .iter()
        .map(|s| RankedResult {
            id: s.id,
            student_id: s.student_id,
            student_name: names
                .get(&s.student_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            score: s.score,
            submitted_at: s.submitted_at,
        })
        .collect();

    tracing::debug!(
        exam_id = exam.id,
        submissions = results.len(),
        average_score,
        "Exam analytics computed"
    );

    Ok(Json(ExamAnalytics {
        exam,
        submission_count: results.len(),
        average_score,
        results,
        question_stats,
    }))
}
