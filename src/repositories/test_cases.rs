use time::PrimitiveDateTime;

use crate::db::models::TestCase;
use crate::db::types::Visibility;

pub(crate) const COLUMNS: &str = "\
    id, problem_id, visibility, input, expected_output, score, order_index, created_at";

pub(crate) struct CreateTestCase<'a> {
    pub(crate) problem_id: i64,
    pub(crate) visibility: Visibility,
    pub(crate) input: &'a str,
    pub(crate) expected_output: &'a str,
    pub(crate) score: i32,
    pub(crate) order_index: i32,
    pub(crate) created_at: PrimitiveDateTime,
}

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateTestCase<'_>,
) -> Result<TestCase, sqlx::Error> {
    sqlx::query_as::<_, TestCase>(&format!(
        "INSERT INTO test_cases (
            problem_id, visibility, input, expected_output, score, order_index, created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7)
        RETURNING {COLUMNS}"
    ))
    .bind(params.problem_id)
    .bind(params.visibility)
    .bind(params.input)
    .bind(params.expected_output)
    .bind(params.score)
    .bind(params.order_index)
    .bind(params.created_at)
    .fetch_one(executor)
    .await
}

/// Ordered the way the executor runs them.
pub(crate) async fn list_by_problem(
    executor: impl sqlx::PgExecutor<'_>,
    problem_id: i64,
) -> Result<Vec<TestCase>, sqlx::Error> {
    sqlx::query_as::<_, TestCase>(&format!(
        "SELECT {COLUMNS}
         FROM test_cases
         WHERE problem_id = $1
         ORDER BY order_index, id"
    ))
    .bind(problem_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn next_order_index(
    executor: impl sqlx::PgExecutor<'_>,
    problem_id: i64,
) -> Result<i32, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT COALESCE(MAX(order_index) + 1, 0) FROM test_cases WHERE problem_id = $1",
    )
    .bind(problem_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn delete(
    executor: impl sqlx::PgExecutor<'_>,
    problem_id: i64,
    id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM test_cases WHERE problem_id = $1 AND id = $2")
        .bind(problem_id)
        .bind(id)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}
