use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::clearance::ClearanceServiceError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Clearance(ClearanceServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Clearance(err) => write!(f, "clearance error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Clearance(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Clearance(err) => err.status_code(),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ClearanceServiceError> for AppError {
    fn from(value: ClearanceServiceError) -> Self {
        Self::Clearance(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::clearance::{
        ActorRole, ApplicationId, ApplicationStatus, Stage, TransitionError,
    };

    #[test]
    fn clearance_errors_keep_their_http_status() {
        let unauthorized = AppError::from(ClearanceServiceError::Transition(
            TransitionError::Unauthorized {
                stage: Stage::Library,
                required: ActorRole::Library,
                actual: ActorRole::Hod,
            },
        ));
        assert_eq!(unauthorized.into_response().status(), StatusCode::FORBIDDEN);

        let missing = AppError::from(ClearanceServiceError::NotFound(ApplicationId(
            "clr-404".to_string(),
        )));
        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);

        let conflict = AppError::from(ClearanceServiceError::Conflict {
            expected: ApplicationStatus::Pending,
            found: ApplicationStatus::LibraryVerified,
        });
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn config_errors_are_internal() {
        let error = AppError::from(ConfigError::InvalidPort);
        assert!(error.to_string().starts_with("configuration error"));
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
