use time::PrimitiveDateTime;

use crate::db::models::Submission;
use crate::db::types::SubmissionStatus;

use super::types::{CreateSubmission, GradingResult, COLUMNS};

pub(crate) async fn create_pending(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateSubmission<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "INSERT INTO submissions (
            student_id, problem_id, language, code, code_hash, status,
            score_achieved, total_score, submitted_at
        ) VALUES ($1,$2,$3,$4,$5,$6,0,$7,$8)
        RETURNING {COLUMNS}"
    ))
    .bind(params.student_id)
    .bind(params.problem_id)
    .bind(params.language)
    .bind(params.code)
    .bind(params.code_hash)
    .bind(SubmissionStatus::Pending)
    .bind(params.total_score)
    .bind(params.submitted_at)
    .fetch_one(executor)
    .await
}

/// Moves a still-pending submission straight to `error`; the executor never saw it.
pub(crate) async fn mark_dispatch_failed(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
    diagnostic: &str,
    now: PrimitiveDateTime,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET status = $1,
             score_achieved = 0,
             output = $2,
             graded_at = $3
         WHERE id = $4 AND status = $5
         RETURNING {COLUMNS}"
    ))
    .bind(SubmissionStatus::Error)
    .bind(diagnostic)
    .bind(now)
    .bind(id)
    .bind(SubmissionStatus::Pending)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "SELECT {COLUMNS} FROM submissions WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn record_result(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
    result: GradingResult<'_>,
) -> Result<Submission, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!(
        "UPDATE submissions
         SET status = $1,
             score_achieved = $2,
             output = $3,
             graded_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(result.status)
    .bind(result.score_achieved)
    .bind(result.output)
    .bind(result.graded_at)
    .bind(id)
    .fetch_one(executor)
    .await
}
