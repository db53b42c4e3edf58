use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;
use crate::repositories::submissions::SubmissionListRow;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct SubmissionCreate {
    #[validate(length(min = 1, max = 32, message = "language is required"))]
    pub(crate) language: String,
    pub(crate) code: String,
}

/// Terminal states an executor may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ReportedStatus {
    #[serde(alias = "Passed", alias = "PASSED")]
    Passed,
    #[serde(alias = "Failed", alias = "FAILED")]
    Failed,
    #[serde(alias = "Error", alias = "ERROR")]
    Error,
}

impl From<ReportedStatus> for SubmissionStatus {
    fn from(status: ReportedStatus) -> Self {
        match status {
            ReportedStatus::Passed => SubmissionStatus::Passed,
            ReportedStatus::Failed => SubmissionStatus::Failed,
            ReportedStatus::Error => SubmissionStatus::Error,
        }
    }
}

/// Result body posted by the executor.
#[derive(Debug, Deserialize)]
pub(crate) struct CallbackPayload {
    pub(crate) submission_id: i64,
    pub(crate) status: ReportedStatus,
    pub(crate) score_achieved: i32,
    #[serde(default)]
    pub(crate) total_score: Option<i32>,
    #[serde(default)]
    pub(crate) output: Option<String>,
    #[serde(default)]
    pub(crate) api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CallbackAck {
    pub(crate) submission_id: i64,
    pub(crate) status: SubmissionStatus,
    pub(crate) applied: bool,
    pub(crate) best_score_updated: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionResponse {
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
    pub(crate) submitted_at: String,
    pub(crate) graded_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmissionListItem {
    pub(crate) id: i64,
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) problem_id: i64,
    pub(crate) problem_title: String,
    pub(crate) language: String,
    pub(crate) status: SubmissionStatus,
    pub(crate) score_achieved: i32,
    pub(crate) total_score: i32,
    pub(crate) submitted_at: String,
    pub(crate) graded_at: Option<String>,
}

impl SubmissionResponse {
    pub(crate) fn from_db(submission: Submission) -> Self {
        Self {
            id: submission.id,
            student_id: submission.student_id,
            problem_id: submission.problem_id,
            language: submission.language,
            code: submission.code,
            code_hash: submission.code_hash,
            status: submission.status,
            score_achieved: submission.score_achieved,
            total_score: submission.total_score,
            output: submission.output,
            submitted_at: format_primitive(submission.submitted_at),
            graded_at: submission.graded_at.map(format_primitive),
        }
    }
}

impl SubmissionListItem {
    pub(crate) fn from_db(row: SubmissionListRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            student_name: row.student_name,
            problem_id: row.problem_id,
            problem_title: row.problem_title,
            language: row.language,
            status: row.status,
            score_achieved: row.score_achieved,
            total_score: row.total_score,
            submitted_at: format_primitive(row.submitted_at),
            graded_at: row.graded_at.map(format_primitive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_accepts_capitalised_status() {
        let payload: CallbackPayload = serde_json::from_value(serde_json::json!({
            "submission_id": 5,
            "status": "Passed",
            "score_achieved": 100,
            "total_score": 100,
            "output": "ok",
            "api_key": "k"
        }))
        .unwrap();

        assert_eq!(SubmissionStatus::from(payload.status), SubmissionStatus::Passed);
    }

    #[test]
    fn callback_rejects_non_terminal_status() {
        let result = serde_json::from_value::<CallbackPayload>(serde_json::json!({
            "submission_id": 5,
            "status": "pending",
            "score_achieved": 0
        }));

        assert!(result.is_err());
    }
}
