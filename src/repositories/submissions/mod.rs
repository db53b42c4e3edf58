mod commands;
mod queries;
mod types;

pub(crate) use commands::{create_pending, lock_by_id, mark_dispatch_failed, record_result};
pub(crate) use queries::{find_by_id, list_by_problem, list_for_student};
pub(crate) use types::{CreateSubmission, GradingResult, SubmissionListRow};
