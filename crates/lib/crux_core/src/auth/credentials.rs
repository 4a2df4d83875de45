//! Normalisation of user identifiers.
//!
//! Usernames are trimmed; emails are trimmed and lower-cased. Both rules run
//! before any uniqueness check or lookup.

use super::AuthError;

/// Trim surrounding whitespace from a username.
pub fn normalize_username(username: &str) -> String {
    username.trim().to_string()
}

/// Trim and lower-case an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// The single identifier a login attempt names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginIdentifier {
    Username(String),
    Email(String),
}

impl LoginIdentifier {
    /// Exactly one of `username` / `email` must be non-blank.
    pub fn parse(username: Option<&str>, email: Option<&str>) -> Result<Self, AuthError> {
        let username = username.map(normalize_username).filter(|u| !u.is_empty());
        let email = email.map(normalize_email).filter(|e| !e.is_empty());
        match (username, email) {
            (Some(username), None) => Ok(LoginIdentifier::Username(username)),
            (None, Some(email)) => Ok(LoginIdentifier::Email(email)),
            (None, None) => Err(AuthError::ValidationError(
                "Username or email is required".into(),
            )),
            (Some(_), Some(_)) => Err(AuthError::ValidationError(
                "Provide either username or email, not both".into(),
            )),
        }
    }
}
