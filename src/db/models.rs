use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{ScoringPolicy, SubmissionStatus, UserRole, Visibility};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) age: i32,
    pub(crate) role: UserRole,
    pub(crate) hashed_password: String,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Problem {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) created_by: String,
    pub(crate) is_open: bool,
    pub(crate) total_score: i32,
    pub(crate) scoring_policy: ScoringPolicy,
    pub(crate) allowed_languages: Vec<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Problem {
    pub(crate) fn allows_language(&self, language: &str) -> bool {
        self.allowed_languages.iter().any(|allowed| allowed == language)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct TestCase {
    pub(crate) id: i64,
    pub(crate) problem_id: i64,
    pub(crate) visibility: Visibility,
    pub(crate) input: String,
    pub(crate) expected_output: String,
    pub(crate) score: i32,
    pub(crate) order_index: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Assignment {
    pub(crate) id: i64,
    pub(crate) student_id: String,
    pub(crate) problem_id: i64,
    pub(crate) best_score: Option<i32>,
    pub(crate) best_submission_id: Option<i64>,
    pub(crate) assigned_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Submission {
    pub(crate) id: i64,
    pub(crate) student_id: String,
    pub(crate) problem_id: i64,
    pub(crate) language: String,
    pub(crate) code: String,
    pub(crate) code_hash: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) score_achieved: i32,
    pub(crate) total_score: i32,
    pub(crate) output: Option<String>,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
}
