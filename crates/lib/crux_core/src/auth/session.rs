//! Server-side session lifecycle: create at login, validate on every
//! renewal, revoke at logout.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::{debug, error, info, warn};

use super::AuthError;
use super::jwt::REFRESH_TOKEN_EXPIRY_SECS;
use super::store::SessionStore;
use crate::models::auth::{NewSession, Session};

/// Absolute session lifetime. Matches the refresh token so both lapse together.
pub const SESSION_EXPIRY_SECS: i64 = REFRESH_TOKEN_EXPIRY_SECS;

const SESSION_TOKEN_LEN: usize = 64;

/// Column widths of `sessions.ip` and `sessions.user_agent`.
const MAX_IP_CHARS: usize = 45;
const MAX_USER_AGENT_CHARS: usize = 512;

fn clip(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

/// Generate a random session token (64 alphanumeric chars).
fn generate_session_token() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Owns session create / validate / revoke against an injected store.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Persist a new session for `user_id` expiring in seven days.
    pub async fn create(
        &self,
        user_id: i64,
        client_ip: &str,
        user_agent: &str,
    ) -> Result<Session, AuthError> {
        let session = self
            .store
            .insert_session(NewSession {
                session_id: generate_session_token(),
                user_id,
                ip: clip(client_ip, MAX_IP_CHARS),
                user_agent: clip(user_agent, MAX_USER_AGENT_CHARS),
                expires_at: Utc::now() + Duration::seconds(SESSION_EXPIRY_SECS),
            })
            .await?;
        info!(
            user_id,
            session_row = session.id,
            expires_at = %session.expires_at,
            "session created"
        );
        Ok(session)
    }

    /// Look up a session and require it to be usable right now.
    pub async fn validate(&self, session_id: &str) -> Result<Session, AuthError> {
        self.validate_at(session_id, Utc::now()).await
    }

    /// Checks run in a fixed order: not found, then revoked, then expired.
    pub async fn validate_at(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Session, AuthError> {
        let Some(session) = self.store.find_session(session_id).await? else {
            warn!(session_id, "session not found");
            return Err(AuthError::SessionNotFound);
        };
        if session.revoked {
            warn!(session_id, user_id = session.user_id, "session is revoked");
            return Err(AuthError::SessionRevoked);
        }
        if !session.is_usable_at(now) {
            warn!(
                session_id,
                user_id = session.user_id,
                expires_at = %session.expires_at,
                "session has expired"
            );
            return Err(AuthError::SessionExpired);
        }
        debug!(session_id, user_id = session.user_id, "session is valid");
        Ok(session)
    }

    /// Best-effort revocation. Failures are logged and swallowed; returns
    /// whether a session was actually revoked.
    pub async fn revoke(&self, session_id: &str) -> bool {
        match self.store.revoke_session(session_id).await {
            Ok(true) => {
                info!(session_id, "session revoked");
                true
            }
            Ok(false) => {
                warn!(session_id, "no session to revoke");
                false
            }
            Err(e) => {
                error!(session_id, error = %e, "failed to revoke session");
                false
            }
        }
    }
}
