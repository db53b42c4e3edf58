use sqlx::PgPool;

use crate::db::models::Submission;

use super::types::{SubmissionListRow, COLUMNS};

const LIST_SELECT: &str = "\
    SELECT s.id, s.student_id, u.name AS student_name, s.problem_id, \
           p.title AS problem_title, s.language, s.status, s.score_achieved, \
           s.total_score, s.submitted_at, s.graded_at \
    FROM submissions s \
    JOIN users u ON u.id = s.student_id \
    JOIN problems p ON p.id = s.problem_id";

pub(crate) async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Submission>, sqlx::Error> {
    sqlx::query_as::<_, Submission>(&format!("SELECT {COLUMNS} FROM submissions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
    problem_id: Option<i64>,
    skip: i64,
    limit: i64,
) -> Result<(Vec<SubmissionListRow>, i64), sqlx::Error> {
    let items = sqlx::query_as::<_, SubmissionListRow>(&format!(
        "{LIST_SELECT}
         WHERE s.student_id = $1 AND ($2::bigint IS NULL OR s.problem_id = $2)
         ORDER BY s.submitted_at DESC, s.id DESC
         OFFSET $3 LIMIT $4"
    ))
    .bind(student_id)
    .bind(problem_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM submissions
         WHERE student_id = $1 AND ($2::bigint IS NULL OR problem_id = $2)",
    )
    .bind(student_id)
    .bind(problem_id)
    .fetch_one(pool)
    .await?;

    Ok((items, total))
}

pub(crate) async fn list_by_problem(
    pool: &PgPool,
    problem_id: i64,
    skip: i64,
    limit: i64,
) -> Result<(Vec<SubmissionListRow>, i64), sqlx::Error> {
    let items = sqlx::query_as::<_, SubmissionListRow>(&format!(
        "{LIST_SELECT}
         WHERE s.problem_id = $1
         ORDER BY s.submitted_at DESC, s.id DESC
         OFFSET $2 LIMIT $3"
    ))
    .bind(problem_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions WHERE problem_id = $1")
        .bind(problem_id)
        .fetch_one(pool)
        .await?;

    Ok((items, total))
}
