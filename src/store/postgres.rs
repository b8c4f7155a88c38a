// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction, types::Json};

use super::DataStore;
use crate::{
    error::AppError,
    models::{
        exam::{Exam, NewExam},
        question::{NewQuestion, Question},
        submission::{NewSubmission, Submission},
        user::{NewUser, Role, User},
    },
};

const USER_COLUMNS: &str = "id, username, password, role, created_at";
const QUESTION_COLUMNS: &str = "id, content, options, answer, score, created_by, created_at";
const EXAM_COLUMNS: &str =
    "id, title, duration_minutes, total_score, question_ids, created_by, created_at";
const SUBMISSION_COLUMNS: &str = "id, student_id, exam_id, answers, score, submitted_at";

const QUESTION_IN_USE: &str = r#"
    SELECT EXISTS (
        SELECT 1
        FROM exams e
        JOIN exam_results r ON r.exam_id = e.id
        WHERE $1 = ANY(e.question_ids)
    )
"#;

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations from `./migrations`.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Row shapes as stored; converted into models at the boundary.
#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    role: String,
    created_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role).ok_or_else(|| {
            AppError::InternalServerError(format!("Unknown role '{}' for user {}", row.role, row.id))
        })?;
        Ok(User {
            id: row.id,
            username: row.username,
            password: row.password,
            role,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    content: String,
    options: Json<Vec<String>>,
    answer: String,
    score: i64,
    created_by: i64,
    created_at: Option<DateTime<Utc>>,
}

impl From<QuestionRow> for Question {
    fn from(row: QuestionRow) -> Self {
        Question {
            id: row.id,
            content: row.content,
            options: row.options.0,
            answer: row.answer,
            score: row.score,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ExamRow {
    id: i64,
    title: String,
    duration_minutes: i64,
    total_score: i64,
    question_ids: Vec<i64>,
    created_by: i64,
    created_at: Option<DateTime<Utc>>,
}

impl From<ExamRow> for Exam {
    fn from(row: ExamRow) -> Self {
        Exam {
            id: row.id,
            title: row.title,
            duration_minutes: row.duration_minutes,
            total_score: row.total_score,
            question_ids: row.question_ids,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct SubmissionRow {
    id: i64,
    student_id: i64,
    exam_id: i64,
    answers: Json<HashMap<i64, String>>,
    score: i64,
    submitted_at: Option<DateTime<Utc>>,
}

impl From<SubmissionRow> for Submission {
    fn from(row: SubmissionRow) -> Self {
        Submission {
            id: row.id,
            student_id: row.student_id,
            exam_id: row.exam_id,
            answers: row.answers.0,
            score: row.score,
            submitted_at: row.submitted_at,
        }
    }
}

fn db_error(context: &str) -> impl Fn(sqlx::Error) -> AppError + '_ {
    move |e| {
        tracing::error!("{}: {:?}", context, e);
        AppError::from(e)
    }
}

/// Row-locks a question for the rest of the transaction, then fails if it is
/// missing or already part of a submitted exam.
async fn lock_unused_question(
    tx: &mut Transaction<'static, Postgres>,
    id: i64,
) -> Result<(), AppError> {
    let locked: Option<i64> =
        sqlx::query_scalar("SELECT id FROM questions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db_error("Failed to lock question"))?;
    if locked.is_none() {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    let in_use: bool = sqlx::query_scalar(QUESTION_IN_USE)
        .bind(id)
        .fetch_one(&mut **tx)
        .await
        .map_err(db_error("Failed to check question usage"))?;
    if in_use {
        return Err(AppError::Conflict(
            "Question is part of a submitted exam and can no longer change".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl DataStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (username, password, role) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Username '{}' already exists", user.username))
            }
            other => {
                tracing::error!("Failed to register user: {:?}", other);
                other
            }
        })?;

        row.try_into()
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch user by username"))?
        .map(User::try_from)
        .transpose()
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch user by id"))?
            .map(User::try_from)
            .transpose()
    }

    async fn usernames_for(&self, ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i64, String)> =
            sqlx::query_as("SELECT id, username FROM users WHERE id = ANY($1)")
                .bind(ids)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to fetch usernames"))?;

        Ok(rows.into_iter().collect())
    }

    async fn update_username(&self, id: i64, username: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET username = $1 WHERE id = $2")
            .bind(username)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => {
                    AppError::Conflict(format!("Username '{}' already exists", username))
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to update password"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn create_questions(&self, batch: Vec<NewQuestion>) -> Result<Vec<i64>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(batch.len());

        for q in batch {
            let id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO questions (content, options, answer, score, created_by)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id
                "#,
            )
            .bind(q.content)
            .bind(Json(q.options))
            .bind(q.answer)
            .bind(q.score)
            .bind(q.created_by)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error("Failed to create question"))?;
            ids.push(id);
        }

        tx.commit().await?;
        Ok(ids)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions ORDER BY created_at DESC, id DESC",
            QUESTION_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list questions"))?;

        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let row = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {} FROM questions WHERE id = $1",
            QUESTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch question"))?;

        Ok(row.map(Question::from))
    }

    async fn questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Dynamic IN clause
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM questions WHERE id IN (", QUESTION_COLUMNS));

        let mut separated = query_builder.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows: Vec<QuestionRow> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("Failed to fetch questions by id"))?;

        Ok(rows.into_iter().map(Question::from).collect())
    }

    async fn update_question(&self, question: &Question) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        lock_unused_question(&mut tx, question.id).await?;

        sqlx::query(
            r#"
            UPDATE questions
            SET content = $1, options = $2, answer = $3, score = $4
            WHERE id = $5
            "#,
        )
        .bind(&question.content)
        .bind(Json(&question.options))
        .bind(&question.answer)
        .bind(question.score)
        .bind(question.id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to update question"))?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_question(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        lock_unused_question(&mut tx, id).await?;

        sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to delete question"))?;

        tx.commit().await?;
        Ok(())
    }

    async fn question_in_use(&self, id: i64) -> Result<bool, AppError> {
        let in_use: bool = sqlx::query_scalar(QUESTION_IN_USE)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to check question usage"))?;

        Ok(in_use)
    }

    async fn create_exam(&self, exam: NewExam) -> Result<Exam, AppError> {
        let row = sqlx::query_as::<_, ExamRow>(&format!(
            r#"
            INSERT INTO exams (title, duration_minutes, total_score, question_ids, created_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            EXAM_COLUMNS
        ))
        .bind(&exam.title)
        .bind(exam.duration_minutes)
        .bind(exam.total_score)
        .bind(&exam.question_ids)
        .bind(exam.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create exam"))?;

        Ok(row.into())
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        let rows = sqlx::query_as::<_, ExamRow>(&format!(
            "SELECT {} FROM exams ORDER BY created_at DESC, id DESC",
            EXAM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list exams"))?;

        Ok(rows.into_iter().map(Exam::from).collect())
    }

    async fn find_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        let row = sqlx::query_as::<_, ExamRow>(&format!(
            "SELECT {} FROM exams WHERE id = $1",
            EXAM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch exam"))?;

        Ok(row.map(Exam::from))
    }

    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission, AppError> {
        let mut tx = self.pool.begin().await?;

        // Holds off edits to the exam's questions until this row is committed.
        sqlx::query(
            r#"
            SELECT id FROM questions
            WHERE id = ANY(SELECT unnest(question_ids) FROM exams WHERE id = $1)
            FOR SHARE
            "#,
        )
        .bind(submission.exam_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to lock exam questions"))?;

        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            r#"
            INSERT INTO exam_results (student_id, exam_id, answers, score)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            SUBMISSION_COLUMNS
        ))
        .bind(submission.student_id)
        .bind(submission.exam_id)
        .bind(Json(&submission.answers))
        .bind(submission.score)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => {
                AppError::Conflict("Exam has already been submitted".to_string())
            }
            other => {
                tracing::error!("Failed to insert submission: {:?}", other);
                other
            }
        })?;

        tx.commit().await?;
        Ok(row.into())
    }

    async fn find_submission(&self, id: i64) -> Result<Option<Submission>, AppError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {} FROM exam_results WHERE id = $1",
            SUBMISSION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch submission"))?;

        Ok(row.map(Submission::from))
    }

    async fn submissions_for_exam(&self, exam_id: i64) -> Result<Vec<Submission>, AppError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {} FROM exam_results WHERE exam_id = $1 ORDER BY score DESC, submitted_at ASC, id ASC",
            SUBMISSION_COLUMNS
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch exam submissions"))?;

        Ok(rows.into_iter().map(Submission::from).collect())
    }

    async fn submissions_for_student(&self, student_id: i64) -> Result<Vec<Submission>, AppError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {} FROM exam_results WHERE student_id = $1 ORDER BY submitted_at DESC, id DESC",
            SUBMISSION_COLUMNS
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to fetch student submissions"))?;

        Ok(rows.into_iter().map(Submission::from).collect())
    }
}
