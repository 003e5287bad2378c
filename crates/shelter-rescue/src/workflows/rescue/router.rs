use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{AssignmentId, AssignmentRole, CompletionOutcome, ReportId, VolunteerId};
use super::error::RescueError;
use super::service::DispatchCoordinator;

#[derive(Debug, Deserialize)]
pub struct ClaimRequest {
    pub volunteer_id: String,
    #[serde(default = "default_role")]
    pub role: AssignmentRole,
    #[serde(default)]
    pub notes: String,
}

fn default_role() -> AssignmentRole {
    AssignmentRole::Primary
}

#[derive(Debug, Deserialize)]
pub struct StartRequest {
    pub volunteer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub outcome: CompletionOutcome,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: String,
}

/// Router builder exposing the dispatch endpoints.
pub fn rescue_router(coordinator: Arc<DispatchCoordinator>) -> Router {
    Router::new()
        .route(
            "/api/v1/volunteers/:volunteer_id/rescues",
            get(list_handler),
        )
        .route(
            "/api/v1/volunteers/:volunteer_id/assignments",
            get(volunteer_assignments_handler),
        )
        .route(
            "/api/v1/volunteers/:volunteer_id/qualifications/refresh",
            post(refresh_handler),
        )
        .route("/api/v1/rescues/:report_id/claim", post(claim_handler))
        .route(
            "/api/v1/rescues/:report_id/assignments",
            get(history_handler),
        )
        .route(
            "/api/v1/assignments/:assignment_id/start",
            post(start_handler),
        )
        .route(
            "/api/v1/assignments/:assignment_id/complete",
            post(complete_handler),
        )
        .route(
            "/api/v1/assignments/:assignment_id/cancel",
            post(cancel_handler),
        )
        .with_state(coordinator)
}

pub(crate) async fn list_handler(
    State(coordinator): State<Arc<DispatchCoordinator>>,
    Path(volunteer_id): Path<String>,
) -> Response {
    match coordinator.list_open_rescues(&VolunteerId(volunteer_id)) {
        Ok(rescues) => (StatusCode::OK, axum::Json(rescues)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn claim_handler(
    State(coordinator): State<Arc<DispatchCoordinator>>,
    Path(report_id): Path<String>,
    axum::Json(request): axum::Json<ClaimRequest>,
) -> Response {
    let outcome = coordinator.accept_rescue(
        &ReportId(report_id),
        &VolunteerId(request.volunteer_id),
        request.role,
        &request.notes,
    );
    match outcome {
        Ok(assignment) => (StatusCode::CREATED, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn start_handler(
    State(coordinator): State<Arc<DispatchCoordinator>>,
    Path(assignment_id): Path<String>,
    axum::Json(request): axum::Json<StartRequest>,
) -> Response {
    match coordinator.start_rescue(
        &AssignmentId(assignment_id),
        &VolunteerId(request.volunteer_id),
    ) {
        Ok(assignment) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn complete_handler(
    State(coordinator): State<Arc<DispatchCoordinator>>,
    Path(assignment_id): Path<String>,
    axum::Json(request): axum::Json<CompleteRequest>,
) -> Response {
    match coordinator.complete_rescue(
        &AssignmentId(assignment_id),
        request.outcome,
        &request.notes,
    ) {
        Ok(assignment) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn cancel_handler(
    State(coordinator): State<Arc<DispatchCoordinator>>,
    Path(assignment_id): Path<String>,
    axum::Json(request): axum::Json<CancelRequest>,
) -> Response {
    match coordinator.cancel_rescue(&AssignmentId(assignment_id), &request.reason) {
        Ok(assignment) => (StatusCode::OK, axum::Json(assignment)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn refresh_handler(
    State(coordinator): State<Arc<DispatchCoordinator>>,
    Path(volunteer_id): Path<String>,
) -> Response {
    match coordinator.refresh_qualifications(&VolunteerId(volunteer_id)) {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn volunteer_assignments_handler(
    State(coordinator): State<Arc<DispatchCoordinator>>,
    Path(volunteer_id): Path<String>,
) -> Response {
    match coordinator.assignments_for_volunteer(&VolunteerId(volunteer_id)) {
        Ok(assignments) => (StatusCode::OK, axum::Json(assignments)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler(
    State(coordinator): State<Arc<DispatchCoordinator>>,
    Path(report_id): Path<String>,
) -> Response {
    match coordinator.assignment_history(&ReportId(report_id)) {
        Ok(assignments) => (StatusCode::OK, axum::Json(assignments)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) fn error_response(error: RescueError) -> Response {
    let status = match &error {
        RescueError::ReportNotFound(_)
        | RescueError::AssignmentNotFound(_)
        | RescueError::VolunteerNotFound(_) => StatusCode::NOT_FOUND,
        RescueError::AlreadyClaimed { .. }
        | RescueError::InvalidTransition { .. }
        | RescueError::ReportClosed(_) => StatusCode::CONFLICT,
        RescueError::NotQualified { .. } => StatusCode::FORBIDDEN,
        RescueError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RescueError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = match &error {
        RescueError::NotQualified {
            missing_required, ..
        } => json!({
            "error": error.to_string(),
            "code": error.code(),
            "missing_required": missing_required,
        }),
        _ => json!({
            "error": error.to_string(),
            "code": error.code(),
        }),
    };

    (status, axum::Json(payload)).into_response()
}
