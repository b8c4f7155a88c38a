// src/handlers/results.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    grading::{grade_detailed, option_labels},
    handlers::exams::{exam_questions, load_exam},
    models::submission::{ResultReview, ResultSummary, ReviewItem},
    store::SharedStore,
    utils::jwt::Claims,
};

/// Lists the current student's results, newest first.
/// Student only.
pub async fn list_my_results(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = store.submissions_for_student(claims.user_id()?).await?;

    let titles: HashMap<i64, String> = store
        .list_exams()
        .await?
        .into_iter()
        .map(|e| (e.id, e.title))
        .collect();

    let results: Vec<ResultSummary> = submissions
        .into_iter()
        .map(|s| ResultSummary {
            id: s.id,
            exam_id: s.exam_id,
            exam_title: titles.get(&s.exam_id).cloned(),
            score: s.score,
            submitted_at: s.submitted_at,
        })
        .collect();

    Ok(Json(results))
}

/// Question-by-question review of one of the student's own results.
///
/// Correctness is re-derived from the current answer key; the score shown
/// is the one recorded at submission. Other students' results are 404.
/// Student only.
pub async fn get_result_review(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;

    let submission = store
        .find_submission(id)
        .await?
        .filter(|s| s.student_id == student_id)
        .ok_or(AppError::NotFound("Result not found".to_string()))?;

    let exam = load_exam(&store, submission.exam_id).await?;
    let questions = exam_questions(&store, &exam).await?;
    let graded = grade_detailed(&questions, &submission.answers);

    let items: Vec<ReviewItem> = questions
        .into_iter()
        .zip(graded.outcomes)
        .map(|(q, outcome)| ReviewItem {
            labels: option_labels(q.options.len()),
            content: q.content,
            options: q.options,
            score: q.score,
            outcome,
        })
        .collect();

    Ok(Json(ResultReview {
        id: submission.id,
        exam_id: exam.id,
        exam_title: exam.title,
        score: submission.score,
        total_score: exam.total_score,
        correct_count: graded.correct_count,
        wrong_count: graded.wrong_count,
        submitted_at: submission.submitted_at,
        questions: items,
    }))
}
