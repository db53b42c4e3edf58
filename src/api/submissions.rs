use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::pagination::{Page, PaginatedResponse};
use crate::core::state::AppState;
use crate::schemas::submission::{
    CallbackAck, CallbackPayload, SubmissionCreate, SubmissionListItem, SubmissionResponse,
};

#[derive(Debug, Deserialize)]
pub(crate) struct ListSubmissionsQuery {
    #[serde(default)]
    pub(crate) problem_id: Option<i64>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

/// Routes mounted under `/problems`.
pub(crate) fn problem_router() -> Router<AppState> {
    Router::new()
        .route("/:problem_id/submissions", get(list_problem_submissions).post(create_submission))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/my", get(my_submissions))
        .route("/:submission_id", get(poll_submission))
}

async fn create_submission(
    Path(problem_id): Path<i64>,
    user: CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionCreate>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let submission = state
        .lifecycle()
        .create_submission(
            state.db(),
            &user.caller(),
            problem_id,
            &payload.language,
            &payload.code,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(SubmissionResponse::from_db(submission))))
}

async fn list_problem_submissions(
    Path(problem_id): Path<i64>,
    Query(params): Query<ListSubmissionsQuery>,
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<SubmissionListItem>>, ApiError> {
    let page = Page::new(params.skip, params.limit);

    let (rows, total_count) = state
        .lifecycle()
        .list_for_problem(state.db(), &user.caller(), problem_id, page.skip, page.limit)
        .await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(SubmissionListItem::from_db).collect(),
        total_count,
        page,
    )))
}

async fn my_submissions(
    Query(params): Query<ListSubmissionsQuery>,
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<PaginatedResponse<SubmissionListItem>>, ApiError> {
    let page = Page::new(params.skip, params.limit);

    let (rows, total_count) = state
        .lifecycle()
        .list_own(state.db(), &user.caller(), params.problem_id, page.skip, page.limit)
        .await?;

    Ok(Json(PaginatedResponse::new(
        rows.into_iter().map(SubmissionListItem::from_db).collect(),
        total_count,
        page,
    )))
}

/// Safe to call repeatedly until a terminal status shows up.
async fn poll_submission(
    Path(submission_id): Path<i64>,
    user: CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let submission = state.lifecycle().poll(state.db(), &user.caller(), submission_id).await?;
    Ok(Json(SubmissionResponse::from_db(submission)))
}

/// Executor result webhook. Authenticated by the shared key in the body, not a bearer token.
pub(crate) async fn executor_callback(
    State(state): State<AppState>,
    Json(payload): Json<CallbackPayload>,
) -> Result<Json<CallbackAck>, ApiError> {
    let outcome = state.lifecycle().apply_callback(state.db(), &payload).await?;

    Ok(Json(CallbackAck {
        submission_id: outcome.submission.id,
        status: outcome.submission.status,
        applied: outcome.applied,
        best_score_updated: outcome.best_score_updated,
    }))
}
