// src/handlers/exams.rs

use std::collections::HashSet;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    grading::grade_detailed,
    models::{
        exam::{CreateExamRequest, Exam, ExamPaper, NewExam},
        question::{PublicQuestion, Question},
        submission::{NewSubmission, SubmitExamRequest, SubmitResponse},
    },
    store::SharedStore,
    utils::{html::clean_html, jwt::Claims},
};

/// Fetches an exam or fails with 404.
pub(crate) async fn load_exam(store: &SharedStore, id: i64) -> Result<Exam, AppError> {
    store
        .find_exam(id)
        .await?
        .ok_or(AppError::NotFound("Exam not found".to_string()))
}

/// The exam's questions in exam order. Ids that no longer resolve are dropped.
pub(crate) async fn exam_questions(
    store: &SharedStore,
    exam: &Exam,
) -> Result<Vec<Question>, AppError> {
    let fetched = store.questions_by_ids(&exam.question_ids).await?;
    Ok(exam.order_questions(fetched))
}

/// Lists all exams, newest first.
pub async fn list_exams(State(store): State<SharedStore>) -> Result<impl IntoResponse, AppError> {
    let exams = store.list_exams().await?;
    Ok(Json(exams))
}

/// Creates an exam from existing bank questions.
///
/// Repeated question ids are collapsed, keeping the first position. Every id
/// must resolve to a stored question.
/// Teacher only.
pub async fn create_exam(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = CreateExamRequest {
        title: clean_html(payload.title.trim()),
        ..payload
    };
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let question_ids = payload.unique_question_ids();
    let found: HashSet<i64> = store
        .questions_by_ids(&question_ids)
        .await?
        .iter()
        .map(|q| q.id)
        .collect();
    let missing: Vec<i64> = question_ids
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Unknown question ids: {:?}",
            missing
        )));
    }

    let exam = store
        .create_exam(NewExam {
            title: payload.title,
            duration_minutes: payload.duration_minutes,
            total_score: payload.total_score,
            question_ids,
            created_by: claims.user_id()?,
        })
        .await?;

    tracing::info!(exam_id = exam.id, questions = exam.question_ids.len(), "Exam created");

    Ok((StatusCode::CREATED, Json(exam)))
}

/// Serves an exam for taking: questions in exam order, answer keys hidden.
/// Student only.
pub async fn get_paper(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let exam = load_exam(&store, id).await?;
    let questions = exam_questions(&store, &exam).await?;

    Ok(Json(ExamPaper {
        id: exam.id,
        title: exam.title,
        duration_minutes: exam.duration_minutes,
        total_score: exam.total_score,
        questions: questions.iter().map(PublicQuestion::from).collect(),
    }))
}

/// Grades and records a student's answers.
///
/// The score is computed here from the stored answer key; clients never
/// supply it. A student gets one submission per exam (409 afterwards).
/// Student only.
pub async fn submit_exam(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<SubmitExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id()?;
    let exam = load_exam(&store, id).await?;
    let questions = exam_questions(&store, &exam).await?;

    let graded = grade_detailed(&questions, &req.answers);

    let submission = store
        .insert_submission(NewSubmission {
            student_id,
            exam_id: exam.id,
            answers: req.answers,
            score: graded.score,
        })
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::Conflict(_)) {
                tracing::warn!(student_id, exam_id = exam.id, "Duplicate submission rejected");
            }
        })?;

    tracing::info!(
        student_id,
        exam_id = exam.id,
        result_id = submission.id,
        score = graded.score,
        "Exam submitted"
    );

    Ok(Json(SubmitResponse {
        result_id: submission.id,
        score: graded.score,
        total_score: exam.total_score,
        correct_count: graded.correct_count,
        total_questions: questions.len(),
    }))
}
