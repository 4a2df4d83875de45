//! Authentication and session logic.
//!
//! Provides password hashing, the JWT codec, the session manager and the
//! storage traits it runs on, shared by `crux_api` handlers and middleware.

pub mod credentials;
pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod session;
pub mod store;

use thiserror::Error;

pub use jwt::TokenError;

use crate::models::auth::TokenKind;

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    CredentialError,

    #[error("No {0} token provided")]
    MissingToken(TokenKind),

    #[error("Invalid {0} token: {1}")]
    InvalidToken(TokenKind, TokenError),

    #[error("Session not found")]
    SessionNotFound,

    #[error("Session has been revoked")]
    SessionRevoked,

    #[error("Session has expired")]
    SessionExpired,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DbError(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
