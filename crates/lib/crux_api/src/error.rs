//! Application error types.

use std::fmt::Display;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use crux_core::auth::AuthError;
use thiserror::Error;
use tracing::{error, warn};
use validator::ValidationErrors;

use crate::envelope::{Api, ErrorBody, Status};

/// Convenience alias for service return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
///
/// Every message here is safe to show to clients. Internal detail is logged
/// where it is converted, never carried.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Log `cause` and return a 500 showing only `message`.
    pub fn internal(message: &str, cause: impl Display) -> Self {
        error!(error = %cause, "{message}");
        AppError::Internal(message.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidInput(m)
            | AppError::Validation(m)
            | AppError::Unauthorized(m)
            | AppError::NotFound(m)
            | AppError::Conflict(m)
            | AppError::Internal(m) => m,
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError
            | AuthError::MissingToken(_)
            | AuthError::SessionNotFound
            | AuthError::SessionRevoked
            | AuthError::SessionExpired => AppError::Unauthorized(e.to_string()),
            AuthError::InvalidToken(kind, _) => {
                AppError::Unauthorized(format!("Invalid or expired {kind} token"))
            }
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Conflict(msg) => AppError::Conflict(msg),
            AuthError::NotFound(msg) => AppError::NotFound(msg),
            AuthError::DbError(e) => AppError::internal("Internal server error", e),
            AuthError::Internal(msg) => AppError::internal("Internal server error", msg),
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        let message = fields
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(m) => m.to_string(),
                    None => format!("{field} is invalid"),
                })
            })
            .collect::<Vec<_>>()
            .join("; ");
        AppError::Validation(message)
    }
}

/// An [`AppError`] raised while serving a named API.
#[derive(Debug)]
pub struct ApiError {
    pub(crate) api: Api,
    pub(crate) error: AppError,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let code = self.error.code();
        if status.is_server_error() {
            error!(
                api = self.api.name(),
                status = status.as_u16(),
                error_code = code,
                error_message = self.error.message(),
                "API response error"
            );
        } else {
            warn!(
                api = self.api.name(),
                status = status.as_u16(),
                error_code = code,
                error_message = self.error.message(),
                "API response warning"
            );
        }
        let body = self.api.envelope::<()>(
            Status::Error,
            self.error.message(),
            None,
            Some(ErrorBody {
                code: code.to_string(),
                message: self.error.message().to_string(),
            }),
        );
        (status, Json(body)).into_response()
    }
}
