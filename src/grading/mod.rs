// src/grading/mod.rs

//! Scoring and analytics engine.
//!
//! Everything in here is a pure function over records already loaded into
//! memory. Nothing touches the store, and nothing can fail: a malformed or
//! missing answer is simply not correct.

pub mod analytics;
pub mod labels;
pub mod score;

pub use analytics::{QuestionStat, analyze, average_score};
pub use labels::{index_for_label, label_for_index, option_labels};
pub use score::{GradedResult, QuestionOutcome, grade, grade_detailed};
