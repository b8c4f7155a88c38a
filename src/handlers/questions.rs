// src/handlers/questions.rs

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::IntoResponse,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{CreateQuestionRequest, NewQuestion, Question, UpdateQuestionRequest},
    store::SharedStore,
    utils::{html::clean_html, jwt::Claims},
};

/// Sanitizes every free-text field. Runs before validation so that markup
/// stripped down to nothing is caught as empty.
fn sanitize(req: CreateQuestionRequest) -> CreateQuestionRequest {
    CreateQuestionRequest {
        content: clean_html(req.content.trim()),
        options: req.options.iter().map(|o| clean_html(o.trim())).collect(),
        answer: req.answer.trim().to_string(),
        score: req.score,
    }
}

fn into_new_question(req: CreateQuestionRequest, created_by: i64) -> NewQuestion {
    NewQuestion {
        content: req.content,
        options: req.options,
        answer: req.answer,
        score: req.score,
        created_by,
    }
}

/// Loads a question and checks the caller authored it.
async fn owned_question(store: &SharedStore, id: i64, user_id: i64) -> Result<Question, AppError> {
    let question = store
        .find_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if question.created_by != user_id {
        return Err(AppError::Forbidden(
            "Only the author can modify this question".to_string(),
        ));
    }
    Ok(question)
}

/// Lists the question bank, answers included.
/// Teacher only.
pub async fn list_questions(
    State(store): State<SharedStore>,
) -> Result<impl IntoResponse, AppError> {
    let questions = store.list_questions().await?;
    Ok(Json(questions))
}

/// Creates a single question.
/// Teacher only.
pub async fn create_question(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let payload = sanitize(payload);
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let ids = store
        .create_questions(vec![into_new_question(payload, claims.user_id()?)])
        .await?;
    let id = ids
        .first()
        .copied()
        .ok_or(AppError::InternalServerError("Question insert returned no id".to_string()))?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({"id": id}))))
}

/// One entry of a bulk import. Mirrors `CreateQuestionRequest` but tolerates
/// a missing score and lowercase answers.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportedQuestion {
    pub content: String,
    pub options: Vec<String>,
    pub answer: String,
    #[serde(default = "default_score")]
    pub score: i64,
}

fn default_score() -> i64 {
    1
}

impl From<ImportedQuestion> for CreateQuestionRequest {
    fn from(q: ImportedQuestion) -> Self {
        CreateQuestionRequest {
            content: q.content,
            options: q.options,
            answer: q.answer.trim().to_uppercase(),
            score: q.score,
        }
    }
}

/// Reads one CSV row: `content,answer,score,option1..optionN`.
///
/// Rows with fewer than five cells are rejected outright. Empty option cells
/// are dropped, and a missing, zero or unparsable score becomes 1.
fn csv_entry(record: &csv::StringRecord) -> Option<ImportedQuestion> {
    if record.len() < 5 {
        return None;
    }
    Some(ImportedQuestion {
        content: record.get(0)?.to_string(),
        answer: record.get(1)?.to_string(),
        score: record
            .get(2)
            .and_then(|s| s.parse().ok())
            .filter(|s| *s != 0)
            .unwrap_or_else(default_score),
        options: record
            .iter()
            .skip(3)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect(),
    })
}

/// One entry per data row; the first line is a header. Unreadable rows
/// become `None` so they still count as skipped.
fn csv_entries(body: &[u8]) -> Vec<Option<ImportedQuestion>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body);

    reader
        .records()
        .map(|record| record.ok().and_then(|r| csv_entry(&r)))
        .collect()
}

/// One entry per array element. Only a body that is not a JSON array at all
/// is an error.
fn json_entries(body: &[u8]) -> Result<Vec<Option<ImportedQuestion>>, AppError> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(body)?;
    Ok(values
        .into_iter()
        .map(|entry| serde_json::from_value::<ImportedQuestion>(entry).ok())
        .collect())
}

fn is_csv(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("text/csv"))
}

/// Bulk-creates questions from a JSON array, or from CSV when sent as
/// `text/csv`.
///
/// Entries that fail to parse or validate (e.g. not 2-5 options) are skipped;
/// the valid rest is inserted together. 400 if nothing is valid.
/// Teacher only.
pub async fn import_questions(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let entries = if is_csv(&headers) {
        csv_entries(&body)
    } else {
        json_entries(&body)?
    };
    let total = entries.len();

    let batch: Vec<NewQuestion> = entries
        .into_iter()
        .flatten()
        .map(|q| sanitize(q.into()))
        .filter(|q| q.validate().is_ok())
        .map(|q| into_new_question(q, user_id))
        .collect();

    if batch.is_empty() {
        return Err(AppError::BadRequest(
            "No valid questions found. Ensure 2-5 options per question.".to_string(),
        ));
    }

    let ids = store.create_questions(batch).await?;
    tracing::info!(
        user_id,
        imported = ids.len(),
        skipped = total - ids.len(),
        "Questions imported"
    );

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "imported": ids.len(),
            "skipped": total - ids.len(),
            "ids": ids
        })),
    ))
}

/// Updates a question. 409 once the question belongs to an exam that has
/// submissions.
/// Teacher (author) only.
pub async fn update_question(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current = owned_question(&store, id, claims.user_id()?).await?;

    if payload.is_empty() {
        return Ok(StatusCode::OK);
    }

    // Reported before validation; the store re-checks it inside the write.
    if store.question_in_use(id).await? {
        return Err(AppError::Conflict(
            "Question is part of a submitted exam and can no longer change".to_string(),
        ));
    }

    let merged = sanitize(payload.merge(&current));
    if let Err(validation_errors) = merged.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let updated = Question {
        content: merged.content,
        options: merged.options,
        answer: merged.answer,
        score: merged.score,
        ..current
    };
    store.update_question(&updated).await?;

    Ok(StatusCode::OK)
}

/// Deletes a question.
/// Teacher (author) only.
pub async fn delete_question(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_question(&store, id, claims.user_id()?).await?;

    // 409 once the question is part of a submitted exam.
    store.delete_question(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
