use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use sqlx::{PgConnection, Postgres, Transaction};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_problem_owner, CurrentInstructor, CurrentUser};
use crate::api::pagination::{Page, PaginatedResponse};
use crate::api::validation::normalize_languages;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Problem, TestCase};
use crate::db::types::{ScoringPolicy, UserRole, Visibility};
use crate::repositories;
use crate::schemas::problem::{
    ProblemCreate, ProblemResponse, ProblemSummaryResponse, ProblemUpdate, TestCaseCreate,
};
use crate::services::scoring;

#[derive(Debug, Deserialize)]
pub(crate) struct ProblemListQuery {
    #[serde(default)]
    skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    limit: i64,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_problems).post(create_problem))
        .route("/:problem_id", get(get_problem).patch(update_problem).delete(delete_problem))
        .route("/:problem_id/test-cases", post(add_test_case))
        .route("/:problem_id/test-cases/:case_id", delete(delete_test_case))
}

async fn list_problems(
    Query(params): Query<ProblemListQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<ProblemSummaryResponse>>, ApiError> {
    let page = Page::new(params.skip, params.limit);

    let (problems, total_count) = match user.role {
        UserRole::Instructor => {
            let problems =
                repositories::problems::list_by_creator(state.db(), &user.id, page.skip, page.limit)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to list problems"))?;
            let total = repositories::problems::count_by_creator(state.db(), &user.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count problems"))?;
            (problems, total)
        }
        UserRole::Student => {
            let problems =
                repositories::problems::list_assigned_to(state.db(), &user.id, page.skip, page.limit)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to list problems"))?;
            let total = repositories::problems::count_assigned_to(state.db(), &user.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count problems"))?;
            (problems, total)
        }
    };

    Ok(Json(PaginatedResponse::new(
        problems.into_iter().map(ProblemSummaryResponse::from_db).collect(),
        total_count,
        page,
    )))
}

async fn create_problem(
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<ProblemCreate>,
) -> Result<(StatusCode, Json<ProblemResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let languages = normalize_languages(
        &payload.allowed_languages,
        &state.settings().problems().supported_languages,
    )?;

    let case_inputs: Vec<(Visibility, i32)> =
        payload.test_cases.iter().map(|case| (case.visibility, case.score)).collect();
    let declared_total =
        payload.total_score.unwrap_or(state.settings().problems().default_total_score);
    let total_score =
        scoring::effective_total(payload.scoring_policy, &case_inputs, declared_total)
            .ok_or_else(score_overflow)?;

    let now = primitive_now_utc();
    let mut tx = begin(&state).await?;

    let problem = repositories::problems::create(
        &mut *tx,
        repositories::problems::CreateProblem {
            title: payload.title.trim(),
            description: &payload.description,
            created_by: &instructor.id,
            is_open: payload.is_open,
            total_score,
            scoring_policy: payload.scoring_policy,
            allowed_languages: &languages,
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create problem"))?;

    let mut cases = Vec::with_capacity(payload.test_cases.len());
    for (index, case) in payload.test_cases.iter().enumerate() {
        let order_index = i32::try_from(index)
            .map_err(|_| ApiError::BadRequest("Too many test cases".to_string()))?;
        cases.push(insert_case(&mut tx, problem.id, case, order_index).await?);
    }

    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit problem"))?;

    tracing::info!(
        problem_id = problem.id,
        created_by = %instructor.id,
        test_cases = cases.len(),
        total_score,
        "Problem created"
    );

    Ok((StatusCode::CREATED, Json(ProblemResponse::from_db(problem, cases, true))))
}

async fn get_problem(
    Path(problem_id): Path<i64>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<ProblemResponse>, ApiError> {
    let problem = repositories::problems::find_by_id(state.db(), problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    let include_private = match user.role {
        UserRole::Instructor => {
            if problem.created_by != user.id {
                return Err(ApiError::Forbidden("Not the creator of this problem"));
            }
            true
        }
        UserRole::Student => {
            let assignment =
                repositories::assignments::find_for_pair(state.db(), &user.id, problem_id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?;
            if assignment.is_none() {
                return Err(ApiError::Forbidden("Problem is not assigned to you"));
            }
            false
        }
    };

    let cases = repositories::test_cases::list_by_problem(state.db(), problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test cases"))?;

    Ok(Json(ProblemResponse::from_db(problem, cases, include_private)))
}

async fn update_problem(
    Path(problem_id): Path<i64>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<ProblemUpdate>,
) -> Result<Json<ProblemResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let existing = require_problem_owner(&state, &instructor, problem_id).await?;

    if payload.total_score.is_some() && existing.scoring_policy == ScoringPolicy::Custom {
        return Err(ApiError::BadRequest(
            "total_score is derived from test case scores under custom scoring".to_string(),
        ));
    }

    let allowed_languages = payload
        .allowed_languages
        .as_deref()
        .map(|requested| {
            normalize_languages(requested, &state.settings().problems().supported_languages)
        })
        .transpose()?;

    let problem = repositories::problems::update(
        state.db(),
        problem_id,
        repositories::problems::UpdateProblem {
            title: payload.title.map(|title| title.trim().to_string()),
            description: payload.description,
            is_open: payload.is_open,
            total_score: payload.total_score,
            allowed_languages,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update problem"))?;

    let cases = repositories::test_cases::list_by_problem(state.db(), problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test cases"))?;

    Ok(Json(ProblemResponse::from_db(problem, cases, true)))
}

async fn delete_problem(
    Path(problem_id): Path<i64>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_problem_owner(&state, &instructor, problem_id).await?;

    let deleted = repositories::problems::delete(state.db(), problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete problem"))?;
    if !deleted {
        return Err(ApiError::NotFound("Problem not found".to_string()));
    }

    tracing::info!(problem_id, deleted_by = %instructor.id, "Problem deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn add_test_case(
    Path(problem_id): Path<i64>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<TestCaseCreate>,
) -> Result<(StatusCode, Json<ProblemResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut tx = begin(&state).await?;
    let problem = lock_owned_problem(&mut tx, &instructor.id, problem_id).await?;

    let order_index = repositories::test_cases::next_order_index(&mut *tx, problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute test case order"))?;
    insert_case(&mut tx, problem_id, &payload, order_index).await?;

    let (problem, cases) = sync_custom_total(&mut tx, problem).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit test case"))?;

    Ok((StatusCode::CREATED, Json(ProblemResponse::from_db(problem, cases, true))))
}

async fn delete_test_case(
    Path((problem_id, case_id)): Path<(i64, i64)>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let mut tx = begin(&state).await?;
    let problem = lock_owned_problem(&mut tx, &instructor.id, problem_id).await?;

    let deleted = repositories::test_cases::delete(&mut *tx, problem_id, case_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete test case"))?;
    if !deleted {
        return Err(ApiError::NotFound("Test case not found".to_string()));
    }

    sync_custom_total(&mut tx, problem).await?;
    tx.commit().await.map_err(|e| ApiError::internal(e, "Failed to commit test case removal"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn begin(state: &AppState) -> Result<Transaction<'static, Postgres>, ApiError> {
    state.db().begin().await.map_err(|e| ApiError::internal(e, "Failed to start transaction"))
}

async fn lock_owned_problem(
    conn: &mut PgConnection,
    instructor_id: &str,
    problem_id: i64,
) -> Result<Problem, ApiError> {
    let problem = repositories::problems::lock_by_id(&mut *conn, problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch problem"))?
        .ok_or_else(|| ApiError::NotFound("Problem not found".to_string()))?;

    if problem.created_by != instructor_id {
        return Err(ApiError::Forbidden("Not the creator of this problem"));
    }

    Ok(problem)
}

async fn insert_case(
    conn: &mut PgConnection,
    problem_id: i64,
    case: &TestCaseCreate,
    order_index: i32,
) -> Result<TestCase, ApiError> {
    repositories::test_cases::insert(
        conn,
        repositories::test_cases::CreateTestCase {
            problem_id,
            visibility: case.visibility,
            input: &case.input,
            expected_output: &case.expected_output,
            score: case.score,
            order_index,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create test case"))
}

/// Custom-scored problems keep `total_score` equal to the sum of private case scores.
async fn sync_custom_total(
    conn: &mut PgConnection,
    problem: Problem,
) -> Result<(Problem, Vec<TestCase>), ApiError> {
    let cases = repositories::test_cases::list_by_problem(&mut *conn, problem.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch test cases"))?;

    if problem.scoring_policy != ScoringPolicy::Custom {
        return Ok((problem, cases));
    }

    let inputs: Vec<(Visibility, i32)> =
        cases.iter().map(|case| (case.visibility, case.score)).collect();
    let total_score =
        scoring::effective_total(problem.scoring_policy, &inputs, problem.total_score)
            .ok_or_else(score_overflow)?;
    if total_score == problem.total_score {
        return Ok((problem, cases));
    }

    let problem = repositories::problems::update(
        &mut *conn,
        problem.id,
        repositories::problems::UpdateProblem {
            title: None,
            description: None,
            is_open: None,
            total_score: Some(total_score),
            allowed_languages: None,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update problem total"))?;

    Ok((problem, cases))
}

fn score_overflow() -> ApiError {
    ApiError::BadRequest("Sum of test case scores is too large".to_string())
}
