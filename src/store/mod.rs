// src/store/mod.rs

//! Persistence boundary.
//!
//! Handlers only talk to [`DataStore`]; the grading engine never does.
//! [`PgStore`] is the production backend, [`MemoryStore`] backs local runs
//! without a database and the integration tests.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        exam::{Exam, NewExam},
        question::{NewQuestion, Question},
        submission::{NewSubmission, Submission},
        user::{NewUser, User},
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Shared handle injected into every handler.
pub type SharedStore = Arc<dyn DataStore>;

#[async_trait]
pub trait DataStore: Send + Sync {
    // ---- users ----

    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    /// Id -> username for the ids that exist.
    async fn usernames_for(&self, ids: &[i64]) -> Result<HashMap<i64, String>, AppError>;
    /// Fails with `Conflict` when the username is taken.
    async fn update_username(&self, id: i64, username: &str) -> Result<(), AppError>;
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError>;

    // ---- questions ----

    /// Inserts the whole batch or nothing. Returns ids in input order.
    async fn create_questions(&self, batch: Vec<NewQuestion>) -> Result<Vec<i64>, AppError>;
    /// Newest first.
    async fn list_questions(&self) -> Result<Vec<Question>, AppError>;
    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError>;
    /// Rows for the ids that exist, in no particular order.
    async fn questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError>;
    /// Overwrites content, options, answer and score. `NotFound` if absent,
    /// `Conflict` if in use; the usage check and the write are atomic.
    async fn update_question(&self, question: &Question) -> Result<(), AppError>;
    /// `NotFound` if absent, `Conflict` if in use, checked atomically.
    async fn delete_question(&self, id: i64) -> Result<(), AppError>;
    /// True once any exam containing the question has a submission.
    async fn question_in_use(&self, id: i64) -> Result<bool, AppError>;

    // ---- exams ----

    async fn create_exam(&self, exam: NewExam) -> Result<Exam, AppError>;
    /// Newest first.
    async fn list_exams(&self) -> Result<Vec<Exam>, AppError>;
    async fn find_exam(&self, id: i64) -> Result<Option<Exam>, AppError>;

    // ---- submissions ----

    /// Appends a submission. Fails with `Conflict` if the student already
    /// submitted this exam.
    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission, AppError>;
    async fn find_submission(&self, id: i64) -> Result<Option<Submission>, AppError>;
    /// Highest score first, earlier submission wins ties.
    async fn submissions_for_exam(&self, exam_id: i64) -> Result<Vec<Submission>, AppError>;
    /// Newest first.
    async fn submissions_for_student(&self, student_id: i64) -> Result<Vec<Submission>, AppError>;
}
