use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{ActorRole, ApplicationId, ApplicationSubmission, FacultyId, SubjectId};
use super::presentation::render_status;
use super::repository::{ApplicationRepository, NotificationPublisher};
use super::service::{ClearanceService, ClearanceServiceError};
use super::transition::{TransitionError, TransitionRequest};

const DEFAULT_QUEUE_LIMIT: usize = 50;

/// Router builder exposing HTTP endpoints for submission, review and badges.
pub fn clearance_router<R, N>(service: Arc<ClearanceService<R, N>>) -> Router
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/clearance/applications",
            post(submit_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/applications/:application_id",
            get(status_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/applications/:application_id/transitions",
            post(transition_handler::<R, N>),
        )
        .route(
            "/api/v1/clearance/applications/:application_id/subjects/:subject_id/verification",
            post(subject_verification_handler::<R, N>),
        )
        .route("/api/v1/clearance/queues/:role", get(queue_handler::<R, N>))
        .route("/api/v1/clearance/statuses/:status/badge", get(badge_handler))
        .route("/api/v1/clearance/statuses/badge", get(blank_badge_handler))
        .with_state(service)
}

impl ClearanceServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ClearanceServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ClearanceServiceError::Conflict { .. } | ClearanceServiceError::ConcurrentUpdate(_) => {
                StatusCode::CONFLICT
            }
            ClearanceServiceError::InvalidSubmission(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ClearanceServiceError::Transition(error) => match error {
                TransitionError::Unauthorized { .. } | TransitionError::NotAssignedReviewer { .. } => {
                    StatusCode::FORBIDDEN
                }
                TransitionError::IncompleteVerification { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                TransitionError::InvalidTransition { .. } => StatusCode::CONFLICT,
                TransitionError::UnknownSubject(_) => StatusCode::NOT_FOUND,
            },
            ClearanceServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub(crate) fn error_response(error: ClearanceServiceError) -> Response {
    let status = error.status_code();
    let mut payload = json!({ "error": error.to_string() });
    if let ClearanceServiceError::Transition(TransitionError::IncompleteVerification {
        outstanding,
        ..
    }) = &error
    {
        payload["outstanding"] = json!(outstanding);
    }
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<ClearanceService<R, N>>>,
    axum::Json(submission): axum::Json<ApplicationSubmission>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.submit(submission) {
        Ok(application) => {
            let view = service.status_view(&application);
            (StatusCode::CREATED, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<ClearanceService<R, N>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.get(&ApplicationId(application_id)) {
        Ok(application) => {
            let view = service.status_view(&application);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transition_handler<R, N>(
    State(service): State<Arc<ClearanceService<R, N>>>,
    Path(application_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    match service.advance(&ApplicationId(application_id), request) {
        Ok(application) => {
            let view = service.status_view(&application);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubjectVerificationRequest {
    pub(crate) faculty_id: FacultyId,
    #[serde(default)]
    pub(crate) comment: Option<String>,
}

pub(crate) async fn subject_verification_handler<R, N>(
    State(service): State<Arc<ClearanceService<R, N>>>,
    Path((application_id, subject_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<SubjectVerificationRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let result = service.verify_subject(
        &ApplicationId(application_id),
        &SubjectId(subject_id),
        &request.faculty_id,
        request.comment,
    );
    match result {
        Ok(application) => {
            let view = service.status_view(&application);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueueParams {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

pub(crate) async fn queue_handler<R, N>(
    State(service): State<Arc<ClearanceService<R, N>>>,
    Path(role): Path<String>,
    Query(params): Query<QueueParams>,
) -> Response
where
    R: ApplicationRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let role = match role.parse::<ActorRole>() {
        Ok(role) => role,
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }
    };

    let limit = params.limit.unwrap_or(DEFAULT_QUEUE_LIMIT);
    match service.awaiting(role, limit) {
        Ok(applications) => {
            let views: Vec<_> = applications
                .iter()
                .map(|application| service.status_view(application))
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

/// Badge lookup never fails; unknown statuses degrade to the `unknown` category.
pub(crate) async fn badge_handler(Path(status): Path<String>) -> Response {
    (StatusCode::OK, axum::Json(render_status(&status))).into_response()
}

pub(crate) async fn blank_badge_handler() -> Response {
    (StatusCode::OK, axum::Json(render_status(""))).into_response()
}
