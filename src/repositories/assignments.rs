use sqlx::PgPool;
use time::PrimitiveDateTime;

use crate::db::models::Assignment;

pub(crate) const COLUMNS: &str = "\
    id, student_id, problem_id, best_score, best_submission_id, assigned_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct RosterRow {
    pub(crate) student_id: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) best_score: Option<i32>,
    pub(crate) best_submission_id: Option<i64>,
    pub(crate) submission_count: i64,
    pub(crate) assigned_at: PrimitiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentAssignmentRow {
    pub(crate) problem_id: i64,
    pub(crate) title: String,
    pub(crate) is_open: bool,
    pub(crate) total_score: i32,
    pub(crate) allowed_languages: Vec<String>,
    pub(crate) best_score: Option<i32>,
    pub(crate) best_submission_id: Option<i64>,
    pub(crate) assigned_at: PrimitiveDateTime,
}

/// Inserts the missing `(student, problem)` pairs and returns how many were new.
pub(crate) async fn assign_many(
    pool: &PgPool,
    problem_id: i64,
    student_ids: &[String],
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    if student_ids.is_empty() {
        return Ok(0);
    }

    let result = sqlx::query(
        "INSERT INTO problem_assignments (student_id, problem_id, assigned_at, updated_at)
         SELECT student_id, $2, $3, $3 FROM UNNEST($1::varchar[]) AS student_id
         ON CONFLICT (student_id, problem_id) DO NOTHING",
    )
    .bind(student_ids)
    .bind(problem_id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn unassign(
    pool: &PgPool,
    problem_id: i64,
    student_id: &str,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM problem_assignments WHERE problem_id = $1 AND student_id = $2")
            .bind(problem_id)
            .bind(student_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn find_for_pair(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    problem_id: i64,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS}
         FROM problem_assignments
         WHERE student_id = $1 AND problem_id = $2"
    ))
    .bind(student_id)
    .bind(problem_id)
    .fetch_optional(executor)
    .await
}

/// Row lock so concurrent callbacks for one pair compare-and-set in turn.
pub(crate) async fn lock_for_pair(
    executor: impl sqlx::PgExecutor<'_>,
    student_id: &str,
    problem_id: i64,
) -> Result<Option<Assignment>, sqlx::Error> {
    sqlx::query_as::<_, Assignment>(&format!(
        "SELECT {COLUMNS}
         FROM problem_assignments
         WHERE student_id = $1 AND problem_id = $2
         FOR UPDATE"
    ))
    .bind(student_id)
    .bind(problem_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn record_best(
    executor: impl sqlx::PgExecutor<'_>,
    assignment_id: i64,
    best_score: i32,
    best_submission_id: i64,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE problem_assignments
         SET best_score = $1,
             best_submission_id = $2,
             updated_at = $3
         WHERE id = $4",
    )
    .bind(best_score)
    .bind(best_submission_id)
    .bind(now)
    .bind(assignment_id)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_roster(
    pool: &PgPool,
    problem_id: i64,
) -> Result<Vec<RosterRow>, sqlx::Error> {
    sqlx::query_as::<_, RosterRow>(
        "SELECT pa.student_id,
                u.name AS student_name,
                u.email AS student_email,
                pa.best_score,
                pa.best_submission_id,
                (SELECT COUNT(*) FROM submissions s
                  WHERE s.student_id = pa.student_id AND s.problem_id = pa.problem_id)
                    AS submission_count,
                pa.assigned_at
         FROM problem_assignments pa
         JOIN users u ON u.id = pa.student_id
         WHERE pa.problem_id = $1
         ORDER BY u.name, u.email",
    )
    .bind(problem_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: &str,
) -> Result<Vec<StudentAssignmentRow>, sqlx::Error> {
    sqlx::query_as::<_, StudentAssignmentRow>(
        "SELECT p.id AS problem_id,
                p.title,
                p.is_open,
                p.total_score,
                p.allowed_languages,
                pa.best_score,
                pa.best_submission_id,
                pa.assigned_at
         FROM problem_assignments pa
         JOIN problems p ON p.id = pa.problem_id
         WHERE pa.student_id = $1
         ORDER BY pa.assigned_at DESC, p.id DESC",
    )
    .bind(student_id)
    .fetch_all(pool)
    .await
}
