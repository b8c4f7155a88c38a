// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::DataStore;
use crate::{
    error::AppError,
    models::{
        exam::{Exam, NewExam},
        question::{NewQuestion, Question},
        submission::{NewSubmission, Submission},
        user::{NewUser, User},
    },
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    questions: Vec<Question>,
    exams: Vec<Exam>,
    submissions: Vec<Submission>,
    last_user_id: i64,
    last_question_id: i64,
    last_exam_id: i64,
    last_submission_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

fn in_use(t: &Tables, question_id: i64) -> bool {
    t.exams
        .iter()
        .filter(|e| e.question_ids.contains(&question_id))
        .any(|e| t.submissions.iter().any(|s| s.exam_id == e.id))
}

fn ensure_unused(t: &Tables, question_id: i64) -> Result<(), AppError> {
    if in_use(t, question_id) {
        return Err(AppError::Conflict(
            "Question is part of a submitted exam and can no longer change".to_string(),
        ));
    }
    Ok(())
}

/// Process-local store. Rows are kept in insertion order, so "newest first"
/// is reverse iteration.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut t = self.tables.write().await;

        if t.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }

        let created = User {
            id: next_id(&mut t.last_user_id),
            username: user.username,
            password: user.password_hash,
            role: user.role,
            created_at: Some(Utc::now()),
        };
        t.users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn usernames_for(&self, ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        let t = self.tables.read().await;
        Ok(t.users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .map(|u| (u.id, u.username.clone()))
            .collect())
    }

    async fn update_username(&self, id: i64, username: &str) -> Result<(), AppError> {
        let mut t = self.tables.write().await;

        if t.users.iter().any(|u| u.username == username && u.id != id) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                username
            )));
        }

        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("User not found".to_string()))?;
        user.username = username.to_string();
        Ok(())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("User not found".to_string()))?;
        user.password = password_hash.to_string();
        Ok(())
    }

    async fn create_questions(&self, batch: Vec<NewQuestion>) -> Result<Vec<i64>, AppError> {
        let mut t = self.tables.write().await;
        let mut ids = Vec::with_capacity(batch.len());

        for q in batch {
            let id = next_id(&mut t.last_question_id);
            t.questions.push(Question {
                id,
                content: q.content,
                options: q.options,
                answer: q.answer,
                score: q.score,
                created_by: q.created_by,
                created_at: Some(Utc::now()),
            });
            ids.push(id);
        }

        Ok(ids)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, AppError> {
        let t = self.tables.read().await;
        Ok(t.questions.iter().rev().cloned().collect())
    }

    async fn find_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let t = self.tables.read().await;
        Ok(t.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn questions_by_ids(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        let t = self.tables.read().await;
        Ok(t.questions
            .iter()
            .filter(|q| ids.contains(&q.id))
            .cloned()
            .collect())
    }

    async fn update_question(&self, question: &Question) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        ensure_unused(&t, question.id)?;
        let stored = t
            .questions
            .iter_mut()
            .find(|q| q.id == question.id)
            .ok_or(AppError::NotFound("Question not found".to_string()))?;

        stored.content = question.content.clone();
        stored.options = question.options.clone();
        stored.answer = question.answer.clone();
        stored.score = question.score;
        Ok(())
    }

    async fn delete_question(&self, id: i64) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        ensure_unused(&t, id)?;
        let before = t.questions.len();
        t.questions.retain(|q| q.id != id);

        if t.questions.len() == before {
            return Err(AppError::NotFound("Question not found".to_string()));
        }
        Ok(())
    }

    async fn question_in_use(&self, id: i64) -> Result<bool, AppError> {
        let t = self.tables.read().await;
        Ok(in_use(&t, id))
    }

    async fn create_exam(&self, exam: NewExam) -> Result<Exam, AppError> {
        let mut t = self.tables.write().await;
        let created = Exam {
            id: next_id(&mut t.last_exam_id),
            title: exam.title,
            duration_minutes: exam.duration_minutes,
            total_score: exam.total_score,
            question_ids: exam.question_ids,
            created_by: exam.created_by,
            created_at: Some(Utc::now()),
        };
        t.exams.push(created.clone());
        Ok(created)
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        let t = self.tables.read().await;
        Ok(t.exams.iter().rev().cloned().collect())
    }

    async fn find_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        let t = self.tables.read().await;
        Ok(t.exams.iter().find(|e| e.id == id).cloned())
    }

    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission, AppError> {
        let mut t = self.tables.write().await;

        let duplicate = t
            .submissions
            .iter()
            .any(|s| s.student_id == submission.student_id && s.exam_id == submission.exam_id);
        if duplicate {
            return Err(AppError::Conflict(
                "Exam has already been submitted".to_string(),
            ));
        }

        let created = Submission {
            id: next_id(&mut t.last_submission_id),
            student_id: submission.student_id,
            exam_id: submission.exam_id,
            answers: submission.answers,
            score: submission.score,
            submitted_at: Some(Utc::now()),
        };
        t.submissions.push(created.clone());
        Ok(created)
    }

    async fn find_submission(&self, id: i64) -> Result<Option<Submission>, AppError> {
        let t = self.tables.read().await;
        Ok(t.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn submissions_for_exam(&self, exam_id: i64) -> Result<Vec<Submission>, AppError> {
        let t = self.tables.read().await;
        let mut rows: Vec<Submission> = t
            .submissions
            .iter()
            .filter(|s| s.exam_id == exam_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion (submission) order within equal scores.
        rows.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(rows)
    }

    async fn submissions_for_student(&self, student_id: i64) -> Result<Vec<Submission>, AppError> {
        let t = self.tables.read().await;
        Ok(t.submissions
            .iter()
            .rev()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            password_hash: "hash".to_string(),
            role: Role::Student,
        }
    }

    fn new_submission(student_id: i64, exam_id: i64, score: i64) -> NewSubmission {
        NewSubmission {
            student_id,
            exam_id,
            answers: HashMap::new(),
            score,
        }
    }

    #[tokio::test]
    async fn rejects_duplicate_usernames() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await.unwrap();

        let err = store.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn one_submission_per_student_and_exam() {
        let store = MemoryStore::new();
        store.insert_submission(new_submission(1, 1, 5)).await.unwrap();
        store.insert_submission(new_submission(1, 2, 5)).await.unwrap();

        let err = store
            .insert_submission(new_submission(1, 1, 9))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn exam_submissions_rank_by_score_then_time() {
        let store = MemoryStore::new();
        store.insert_submission(new_submission(1, 7, 3)).await.unwrap();
        store.insert_submission(new_submission(2, 7, 8)).await.unwrap();
        store.insert_submission(new_submission(3, 7, 3)).await.unwrap();
        store.insert_submission(new_submission(4, 9, 10)).await.unwrap();

        let ranked: Vec<i64> = store
            .submissions_for_exam(7)
            .await
            .unwrap()
            .iter()
            .map(|s| s.student_id)
            .collect();
        assert_eq!(ranked, vec![2, 1, 3]);
    }

    #[tokio::test]
    async fn question_in_use_once_its_exam_has_a_submission() {
        let store = MemoryStore::new();
        let ids = store
            .create_questions(vec![NewQuestion {
                content: "Q".to_string(),
                options: vec!["x".to_string(), "y".to_string()],
                answer: "A".to_string(),
                score: 1,
                created_by: 1,
            }])
            .await
            .unwrap();
        let exam = store
            .create_exam(NewExam {
                title: "Quiz".to_string(),
                duration_minutes: 10,
                total_score: 1,
                question_ids: ids.clone(),
                created_by: 1,
            })
            .await
            .unwrap();

        assert!(!store.question_in_use(ids[0]).await.unwrap());
        store
            .insert_submission(new_submission(2, exam.id, 1))
            .await
            .unwrap();
        assert!(store.question_in_use(ids[0]).await.unwrap());
    }

    #[tokio::test]
    async fn writes_to_a_question_in_use_conflict() {
        let store = MemoryStore::new();
        let ids = store
            .create_questions(vec![NewQuestion {
                content: "Q".to_string(),
                options: vec!["x".to_string(), "y".to_string()],
                answer: "A".to_string(),
                score: 1,
                created_by: 1,
            }])
            .await
            .unwrap();
        let exam = store
            .create_exam(NewExam {
                title: "Quiz".to_string(),
                duration_minutes: 10,
                total_score: 1,
                question_ids: ids.clone(),
                created_by: 1,
            })
            .await
            .unwrap();
        store
            .insert_submission(new_submission(2, exam.id, 1))
            .await
            .unwrap();

        let mut edited = store.find_question(ids[0]).await.unwrap().unwrap();
        edited.answer = "B".to_string();
        let err = store.update_question(&edited).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = store.delete_question(ids[0]).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = store.find_question(ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.answer, "A");
    }

    #[tokio::test]
    async fn lists_newest_first() {
        let store = MemoryStore::new();
        for title in ["first", "second"] {
            store
                .create_exam(NewExam {
                    title: title.to_string(),
                    duration_minutes: 10,
                    total_score: 10,
                    question_ids: vec![],
                    created_by: 1,
                })
                .await
                .unwrap();
        }

        let titles: Vec<String> = store
            .list_exams()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.title)
            .collect();
        assert_eq!(titles, vec!["second", "first"]);
    }
}
