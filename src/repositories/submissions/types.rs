use time::PrimitiveDateTime;

use crate::db::types::SubmissionStatus;

pub(crate) const COLUMNS: &str = "\
    id, student_id, problem_id, language, code, code_hash, status, score_achieved, \
    total_score, output, submitted_at, graded_at";

/// Submission listing without the code body.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SubmissionListRow {
    pub(crate) id: i64,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) problem_id: i64,
    pub(crate) problem_title: String,
    pub(crate) language: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) score_achieved: i32,
    pub(crate) total_score: i32,
    pub(crate) submitted_at: PrimitiveDateTime,
    pub(crate) graded_at: Option<PrimitiveDateTime>,
}

pub(crate) struct CreateSubmission<'a> {
    pub(crate) student_id: &'a str,
    pub(crate) problem_id: i64,
    pub(crate) language: &'a str,
    pub(crate) code: &'a str,
    pub(crate) code_hash: &'a str,
    pub(crate) total_score: i32,
    pub(crate) submitted_at: PrimitiveDateTime,
}

pub(crate) struct GradingResult<'a> {
    pub(crate) status: SubmissionStatus,
    pub(crate) score_achieved: i32,
    pub(crate) output: &'a str,
    pub(crate) graded_at: PrimitiveDateTime,
}
