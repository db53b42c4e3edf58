use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_problem_owner, CurrentInstructor, CurrentStudent};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::assignment::{
    AssignRequest, AssignResponse, RosterEntryResponse, StudentAssignmentResponse,
};

/// Routes mounted under `/problems`.
pub(crate) fn problem_router() -> Router<AppState> {
    Router::new()
        .route("/:problem_id/assignments", get(list_roster).post(assign_students))
        .route("/:problem_id/assignments/:student_id", delete(unassign_student))
}

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/me", get(my_assignments))
}

async fn assign_students(
    Path(problem_id): Path<i64>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<AssignResponse>, ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    require_problem_owner(&state, &instructor, problem_id).await?;

    let mut requested: Vec<String> =
        payload.student_ids.iter().map(|id| id.trim().to_string()).collect();
    requested.sort();
    requested.dedup();

    let students = repositories::users::filter_active_students(state.db(), &requested)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to verify students"))?;
    let invalid: Vec<&str> = requested
        .iter()
        .filter(|id| !students.contains(id))
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        return Err(ApiError::BadRequest(format!("Not active students: {}", invalid.join(", "))));
    }

    let assigned = repositories::assignments::assign_many(
        state.db(),
        problem_id,
        &students,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to assign problem"))?;
    let requested_count = u64::try_from(students.len()).unwrap_or(u64::MAX);

    tracing::info!(problem_id, assigned, requested = requested_count, "Problem assigned");

    Ok(Json(AssignResponse {
        problem_id,
        assigned,
        already_assigned: requested_count.saturating_sub(assigned),
    }))
}

async fn unassign_student(
    Path((problem_id, student_id)): Path<(i64, String)>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    require_problem_owner(&state, &instructor, problem_id).await?;

    let removed = repositories::assignments::unassign(state.db(), problem_id, &student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to unassign student"))?;
    if !removed {
        return Err(ApiError::NotFound("Assignment not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

async fn list_roster(
    Path(problem_id): Path<i64>,
    CurrentInstructor(instructor): CurrentInstructor,
    State(state): State<AppState>,
) -> Result<Json<Vec<RosterEntryResponse>>, ApiError> {
    require_problem_owner(&state, &instructor, problem_id).await?;

    let rows = repositories::assignments::list_roster(state.db(), problem_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch roster"))?;

    Ok(Json(rows.into_iter().map(RosterEntryResponse::from_db).collect()))
}

async fn my_assignments(
    CurrentStudent(student): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<Vec<StudentAssignmentResponse>>, ApiError> {
    let rows = repositories::assignments::list_for_student(state.db(), &student.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignments"))?;

    Ok(Json(rows.into_iter().map(StudentAssignmentResponse::from_db).collect()))
}
