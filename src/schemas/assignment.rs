use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::repositories::assignments::{RosterRow, StudentAssignmentRow};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AssignRequest {
    #[validate(length(min = 1, message = "student_ids must not be empty"))]
    pub(crate) student_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AssignResponse {
    pub(crate) problem_id: i64,
    /// Pairs created by this request; existing assignments are left untouched.
    pub(crate) assigned: u64,
    pub(crate) already_assigned: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct RosterEntryResponse {
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) best_score: Option<i32>,
    pub(crate) best_submission_id: Option<i64>,
    pub(crate) submission_count: i64,
    pub(crate) assigned_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentAssignmentResponse {
    pub(crate) problem_id: i64,
    pub(crate) title: String,
    pub(crate) is_open: bool,
    pub(crate) total_score: i32,
    pub(crate) allowed_languages: Vec<String>,
    pub(crate) best_score: Option<i32>,
    pub(crate) best_submission_id: Option<i64>,
    pub(crate) assigned_at: String,
}

impl RosterEntryResponse {
    pub(crate) fn from_db(row: RosterRow) -> Self {
        Self {
            student_id: row.student_id,
            student_name: row.student_name,
            student_email: row.student_email,
            best_score: row.best_score,
            best_submission_id: row.best_submission_id,
            submission_count: row.submission_count,
            assigned_at: format_primitive(row.assigned_at),
        }
    }
}

impl StudentAssignmentResponse {
    pub(crate) fn from_db(row: StudentAssignmentRow) -> Self {
        Self {
            problem_id: row.problem_id,
            title: row.title,
            is_open: row.is_open,
            total_score: row.total_score,
            allowed_languages: row.allowed_languages,
            best_score: row.best_score,
            best_submission_id: row.best_submission_id,
            assigned_at: format_primitive(row.assigned_at),
        }
    }
}
