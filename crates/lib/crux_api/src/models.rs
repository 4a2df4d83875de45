//! Request and response bodies.

use chrono::{DateTime, SecondsFormat, Utc};
use crux_core::auth::credentials::{normalize_email, normalize_username};
use crux_core::models::auth::{User, UserUpdate};
use serde::{Deserialize, Serialize};
use validator::Validate;

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// `POST /login` body. Exactly one of `username` / `email`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: rfc3339(user.created_at),
            updated_at: rfc3339(user.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub session_id: String,
    /// Session expiry, RFC 3339.
    pub expires_at: String,
    pub message: String,
}

impl LoginResponse {
    pub fn new(user: User, session_id: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            user: user.into(),
            session_id,
            expires_at: rfc3339(expires_at),
            message: "Login successful".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub message: String,
    /// Expiry of the new access token, RFC 3339.
    pub expires_at: String,
}

impl RefreshResponse {
    pub fn new(expires_at: DateTime<Utc>) -> Self {
        Self {
            message: "Access token refreshed successfully".to_string(),
            expires_at: rfc3339(expires_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// `POST /users` body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: String,
    #[validate(
        email(message = "Invalid email format"),
        length(max = 100, message = "Email must not exceed 100 characters")
    )]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 100, message = "First name must not exceed 100 characters"))]
    pub first_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "Last name must not exceed 100 characters"))]
    pub last_name: Option<String>,
}

impl CreateUserRequest {
    /// Trim the username, trim and lower-case the email. Validation runs on
    /// the result.
    pub fn normalized(self) -> Self {
        Self {
            username: normalize_username(&self.username),
            email: normalize_email(&self.email),
            ..self
        }
    }
}

/// `PUT /users` body. Absent or blank fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[serde(default)]
    #[validate(length(min = 3, max = 50, message = "Username must be 3 to 50 characters"))]
    pub username: Option<String>,
    #[serde(default)]
    #[validate(
        email(message = "Invalid email format"),
        length(max = 100, message = "Email must not exceed 100 characters")
    )]
    pub email: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "First name must not exceed 100 characters"))]
    pub first_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 100, message = "Last name must not exceed 100 characters"))]
    pub last_name: Option<String>,
}

fn trim_name(name: &str) -> String {
    name.trim().to_string()
}

fn non_blank(value: Option<String>, normalize: fn(&str) -> String) -> Option<String> {
    value.map(|v| normalize(&v)).filter(|v| !v.is_empty())
}

impl UpdateUserRequest {
    /// Normalise every present field and drop the ones left blank.
    pub fn normalized(self) -> Self {
        Self {
            username: non_blank(self.username, normalize_username),
            email: non_blank(self.email, normalize_email),
            first_name: non_blank(self.first_name, trim_name),
            last_name: non_blank(self.last_name, trim_name),
        }
    }
}

impl From<UpdateUserRequest> for UserUpdate {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
