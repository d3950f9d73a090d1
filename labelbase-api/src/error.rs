/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// Handlers return `Result<T, ApiError>` which converts to the right status
/// code, and core domain errors convert into `ApiError` via `From`, so `?`
/// works end to end.
///
/// # Status Mapping
///
/// | Core error | Status |
/// |---|---|
/// | `ResourceNotFound` | 404 |
/// | `ReferenceNotFound` | 400 |
/// | `AlreadyExists` | 409 |
/// | `OwnerProtected` | 409 |
/// | `ChildrenExist` | 409 |
/// | `PermissionDenied` | 403 |
/// | `Infrastructure` | 503 |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - duplicate membership, blocked deletion, ...
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503) - retryable infrastructure failure
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "not_found", "conflict")
    pub error: String,

    /// Human-readable message
    pub message: String,

    /// Validation details, when applicable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code().to_string();

        let (message, details) = match self {
            ApiError::ValidationError(details) => {
                ("request validation failed".to_string(), Some(details))
            }
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Conflict(m)
            | ApiError::ServiceUnavailable(m) => (m, None),
            ApiError::InternalError(m) => {
                // Log the detail but do not leak it to clients.
                tracing::error!(error = %m, "internal server error");
                ("internal server error".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: code,
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<labelbase_core::Error> for ApiError {
    fn from(err: labelbase_core::Error) -> Self {
        use labelbase_core::Error as Core;
        match err {
            Core::ResourceNotFound(kind) => ApiError::NotFound(format!("{kind} not found")),
            Core::ReferenceNotFound(kind) => {
                ApiError::BadRequest(format!("referenced {kind} not found"))
            }
            Core::AlreadyExists => ApiError::Conflict("already exists".to_string()),
            Core::OwnerProtected => {
                ApiError::Conflict("owner membership is protected".to_string())
            }
            Core::ChildrenExist(kind) => {
                ApiError::Conflict(format!("{kind} still has undeleted children"))
            }
            Core::PermissionDenied(capability) => {
                ApiError::Forbidden(format!("permission denied: {capability} not granted"))
            }
            Core::Infrastructure(detail) => ApiError::ServiceUnavailable(detail),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labelbase_core::error::ResourceKind;
    use labelbase_core::roles::Capability;
    use labelbase_core::Error as Core;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(Core::ResourceNotFound(ResourceKind::Project)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(Core::ReferenceNotFound(ResourceKind::User)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::from(Core::AlreadyExists).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::from(Core::OwnerProtected).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::from(Core::ChildrenExist(ResourceKind::Image)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(Core::PermissionDenied(Capability::DatasetDelete)).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(Core::Infrastructure("down".into())).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::NotFound("x".into()).code(), "not_found");
        assert_eq!(ApiError::Conflict("x".into()).code(), "conflict");
        assert_eq!(ApiError::ValidationError(vec![]).code(), "validation_error");
    }
}
