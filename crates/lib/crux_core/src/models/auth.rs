//! Authentication domain models.
//!
//! These are internal domain models, distinct from the API response shapes
//! in `crux_api::models`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User with password hash (for internal auth flows).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

/// A user row ready for insertion. Fields are already normalised and the
/// password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Profile changes. `None` leaves a column as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
    }
}

/// Server-side record of one login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    /// Opaque random token embedded in JWTs; distinct from `id`.
    pub session_id: String,
    pub user_id: i64,
    /// Client address at creation. Audit only.
    pub ip: String,
    /// Client user agent at creation. Audit only.
    pub user_agent: String,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// A session is usable iff it is not revoked and `now < expires_at`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && now < self.expires_at
    }
}

/// A session row ready for insertion.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_id: String,
    pub user_id: i64,
    pub ip: String,
    pub user_agent: String,
    pub expires_at: DateTime<Utc>,
}

/// Token kind discriminator, serialised into the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity an authenticated request carries downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    /// The session token this identity was issued under.
    pub session_id: String,
}

impl AuthIdentity {
    /// Identity for `user` bound to the session token `session_id`.
    pub fn for_session(user: &User, session_id: &str) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            session_id: session_id.to_string(),
        }
    }
}

/// JWT claims carried by both access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub session_id: String,
    pub token_type: TokenKind,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Not before (unix timestamp).
    pub nbf: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    pub iss: String,
    /// Subject: the username.
    pub sub: String,
}

impl TokenClaims {
    pub fn identity(&self) -> AuthIdentity {
        AuthIdentity {
            user_id: self.user_id,
            username: self.username.clone(),
            email: self.email.clone(),
            session_id: self.session_id.clone(),
        }
    }
}
