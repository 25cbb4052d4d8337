use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{ApprovalStatus, FieldError, LifecycleAction};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileError {
    #[error("File is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File data is not valid base64")]
    InvalidEncoding,

    #[error("File is empty")]
    Empty,

    #[error("Document name cannot be empty")]
    EmptyName,

    #[error("Upload did not finish within {0} seconds")]
    Timeout(u64),
}

#[derive(Error, Debug)]
pub enum OnboardingError {
    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Preconditions not met: {}", .0.join("; "))]
    PreconditionFailed(Vec<String>),

    #[error("Cannot {action} a specialist in state {from}")]
    InvalidTransition {
        from: ApprovalStatus,
        action: LifecycleAction,
    },

    #[error("Specialist state changed: expected {expected}, found {actual}")]
    StaleState {
        expected: ApprovalStatus,
        actual: ApprovalStatus,
    },

    #[error(transparent)]
    File(#[from] FileError),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Specialist {0} is already registered")]
    AlreadyRegistered(Uuid),

    #[error("Profile and documents are locked while {0}")]
    ProfileLocked(ApprovalStatus),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal Server Error")]
    Internal,
}

impl OnboardingError {
    /// Logs the storage failure and hides it behind `Internal`.
    pub fn internal(err: anyhow::Error) -> Self {
        error!("Storage failure: {:#}", err);
        OnboardingError::Internal
    }

    pub fn code(&self) -> &'static str {
        match self {
            OnboardingError::Validation(_) => "validation_error",
            OnboardingError::PreconditionFailed(_) => "precondition_failed",
            OnboardingError::InvalidTransition { .. } => "invalid_transition",
            OnboardingError::StaleState { .. } => "stale_state",
            OnboardingError::File(_) => "file_error",
            OnboardingError::NotFound(_) => "not_found",
            OnboardingError::AlreadyRegistered(_) => "already_registered",
            OnboardingError::ProfileLocked(_) => "profile_locked",
            OnboardingError::Forbidden(_) => "forbidden",
            OnboardingError::Internal => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            OnboardingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            OnboardingError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            OnboardingError::InvalidTransition { .. }
            | OnboardingError::StaleState { .. }
            | OnboardingError::AlreadyRegistered(_)
            | OnboardingError::ProfileLocked(_) => StatusCode::CONFLICT,
            OnboardingError::File(file_error) => match file_error {
                FileError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                FileError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                FileError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
                FileError::InvalidEncoding | FileError::Empty | FileError::EmptyName => {
                    StatusCode::BAD_REQUEST
                }
            },
            OnboardingError::NotFound(_) => StatusCode::NOT_FOUND,
            OnboardingError::Forbidden(_) => StatusCode::FORBIDDEN,
            OnboardingError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            OnboardingError::Validation(fields) => Some(json!(fields)),
            OnboardingError::PreconditionFailed(reasons) => Some(json!(reasons)),
            OnboardingError::InvalidTransition { from, action } => Some(json!({
                "from": from,
                "action": action,
            })),
            OnboardingError::StaleState { expected, actual } => Some(json!({
                "expected": expected,
                "actual": actual,
            })),
            _ => None,
        }
    }
}

impl From<AppError> for OnboardingError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Auth(msg) | AppError::Forbidden(msg) => OnboardingError::Forbidden(msg),
        }
    }
}

impl IntoResponse for OnboardingError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, self);
        } else {
            tracing::debug!("Request rejected: {}: {}", status, self);
        }

        let mut body = json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if let Some(details) = self.details() {
            body["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldErrorCode;

    #[test]
    fn validation_error_maps_to_422() {
        let err = OnboardingError::Validation(vec![FieldError::new(
            "bio",
            FieldErrorCode::TooShort,
            "too short",
        )]);
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn internal_error_hides_storage_detail() {
        let err = OnboardingError::internal(anyhow::anyhow!("connection refused to db-host:5432"));
        assert!(!err.to_string().contains("db-host"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn file_errors_have_distinct_statuses() {
        let too_large = OnboardingError::from(FileError::TooLarge { size: 11, limit: 10 });
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        let bad_type = OnboardingError::from(FileError::UnsupportedType("text/plain".into()));
        assert_eq!(bad_type.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
