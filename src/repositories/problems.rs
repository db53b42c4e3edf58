use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Problem;
use crate::db::types::ScoringPolicy;

pub(crate) const COLUMNS: &str = "\
    id, title, description, created_by, is_open, total_score, scoring_policy, \
    allowed_languages, created_at, updated_at";

const JOINED_COLUMNS: &str = "\
    p.id, p.title, p.description, p.created_by, p.is_open, p.total_score, p.scoring_policy, \
    p.allowed_languages, p.created_at, p.updated_at";

pub(crate) struct CreateProblem<'a> {
    pub(crate) title: &'a str,
    pub(crate) description: &'a str,
    pub(crate) created_by: &'a str,
    pub(crate) is_open: bool,
    pub(crate) total_score: i32,
    pub(crate) scoring_policy: ScoringPolicy,
    pub(crate) allowed_languages: &'a [String],
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateProblem<'_>,
) -> Result<Problem, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "INSERT INTO problems (
            title, description, created_by, is_open, total_score, scoring_policy,
            allowed_languages, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$8)
        RETURNING {COLUMNS}",
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.created_by)
    .bind(params.is_open)
    .bind(params.total_score)
    .bind(params.scoring_policy)
    .bind(params.allowed_languages)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!("SELECT {COLUMNS} FROM problems WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Serialises test-case edits against the same problem.
pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
) -> Result<Option<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "SELECT {COLUMNS} FROM problems WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_creator(
    pool: &PgPool,
    created_by: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "SELECT {COLUMNS}
         FROM problems
         WHERE created_by = $1
         ORDER BY created_at DESC, id DESC
         OFFSET $2 LIMIT $3"
    ))
    .bind(created_by)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_creator(pool: &PgPool, created_by: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM problems WHERE created_by = $1")
        .bind(created_by)
        .fetch_one(pool)
        .await
}

pub(crate) async fn list_assigned_to(
    pool: &PgPool,
    student_id: &str,
    skip: i64,
    limit: i64,
) -> Result<Vec<Problem>, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "SELECT {JOINED_COLUMNS}
         FROM problems p
         JOIN problem_assignments pa ON pa.problem_id = p.id
         WHERE pa.student_id = $1
         ORDER BY pa.assigned_at DESC, p.id DESC
         OFFSET $2 LIMIT $3"
    ))
    .bind(student_id)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_assigned_to(pool: &PgPool, student_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM problem_assignments WHERE student_id = $1")
        .bind(student_id)
        .fetch_one(pool)
        .await
}

pub(crate) struct UpdateProblem {
    pub(crate) title: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) is_open: Option<bool>,
    pub(crate) total_score: Option<i32>,
    pub(crate) allowed_languages: Option<Vec<String>>,
    pub(crate) updated_at: PrimitiveDateTime,
}

pub(crate) async fn update(
    executor: impl sqlx::PgExecutor<'_>,
    id: i64,
    params: UpdateProblem,
) -> Result<Problem, sqlx::Error> {
    sqlx::query_as::<_, Problem>(&format!(
        "UPDATE problems SET
            title = COALESCE($1, title),
            description = COALESCE($2, description),
            is_open = COALESCE($3, is_open),
            total_score = COALESCE($4, total_score),
            allowed_languages = COALESCE($5, allowed_languages),
            updated_at = $6
         WHERE id = $7
         RETURNING {COLUMNS}"
    ))
    .bind(params.title)
    .bind(params.description)
    .bind(params.is_open)
    .bind(params.total_score)
    .bind(params.allowed_languages)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Test cases, assignments and submissions go with it (`ON DELETE CASCADE`).
pub(crate) async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM problems WHERE id = $1").bind(id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}
