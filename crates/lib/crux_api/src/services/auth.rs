//! Authentication service: login, logout, and the access-token renewal shared
//! by the gateway middleware and the refresh endpoint.

use crux_core::auth::AuthError;
use crux_core::auth::credentials::LoginIdentifier;
use crux_core::auth::jwt::IssuedToken;
use crux_core::auth::password::{verify_dummy, verify_password};
use crux_core::models::auth::{AuthIdentity, Session, TokenKind, User};
use tracing::{debug, info, warn};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ClientMeta;

/// Outcome of the gateway decision for one request.
#[derive(Debug, Clone)]
pub struct Authentication {
    pub identity: AuthIdentity,
    /// Set when the access token was re-derived from the refresh token.
    pub renewed: Option<IssuedToken>,
}

/// A fresh access token minted from a valid refresh token and live session.
#[derive(Debug, Clone)]
pub struct Renewal {
    pub identity: AuthIdentity,
    pub access: IssuedToken,
}

/// Everything a successful login hands back to the handler.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub session: Session,
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Decide whether a request is authenticated.
///
/// A valid access token short-circuits with no storage I/O. Otherwise the
/// refresh token is checked against its session and a new access token is
/// issued. The refresh token itself is never reissued here.
pub async fn authenticate(
    state: &AppState,
    access: Option<&str>,
    refresh: Option<&str>,
) -> AppResult<Authentication> {
    match access.map(|token| state.tokens.decode(token, TokenKind::Access)) {
        Some(Ok(claims)) => {
            debug!(user_id = claims.user_id, "access token is valid");
            return Ok(Authentication {
                identity: claims.identity(),
                renewed: None,
            });
        }
        Some(Err(e)) => info!(reason = %e, "access token invalid, attempting refresh"),
        None => debug!("no access token, attempting refresh"),
    }

    let Some(refresh) = refresh else {
        warn!("no refresh token found");
        return Err(AppError::Unauthorized("Not authenticated".into()));
    };
    let renewal = renew_access_token(state, refresh).await?;
    Ok(Authentication {
        identity: renewal.identity,
        renewed: Some(renewal.access),
    })
}

/// Validate `refresh` and its session, then sign a new access token.
pub async fn renew_access_token(state: &AppState, refresh: &str) -> AppResult<Renewal> {
    let claims = state
        .tokens
        .decode(refresh, TokenKind::Refresh)
        .map_err(|e| {
            warn!(reason = %e, "invalid refresh token");
            AuthError::InvalidToken(TokenKind::Refresh, e)
        })?;

    state
        .sessions
        .validate(&claims.session_id)
        .await
        .map_err(|e| match e {
            AuthError::DbError(err) => AppError::internal("Failed to validate session", err),
            other => other.into(),
        })?;

    let identity = claims.identity();
    let access = state
        .tokens
        .encode(TokenKind::Access, &identity)
        .map_err(|e| AppError::internal("Failed to generate access token", e))?;
    info!(
        user_id = identity.user_id,
        session_id = %identity.session_id,
        expires_at = %access.expires_at,
        "access token renewed"
    );
    Ok(Renewal { identity, access })
}

/// Check credentials, open a session and issue both tokens.
///
/// An unknown user, an unreadable hash and a wrong password all fail with the
/// same `Invalid credentials` error.
pub async fn login(
    state: &AppState,
    username: Option<&str>,
    email: Option<&str>,
    password: &str,
    client: &ClientMeta,
) -> AppResult<LoginOutcome> {
    let identifier = LoginIdentifier::parse(username, email)?;
    if password.is_empty() {
        return Err(AppError::Validation("Password is required".into()));
    }

    let found = match &identifier {
        LoginIdentifier::Username(username) => state.users.find_user_by_username(username).await,
        LoginIdentifier::Email(email) => state.users.find_user_by_email(email).await,
    }
    .map_err(|e| AppError::internal("Authentication failed", e))?;

    let Some(found) = found else {
        verify_dummy(password);
        warn!(?identifier, "login for unknown user");
        return Err(AuthError::CredentialError.into());
    };
    let user_id = found.user.id;
    match verify_password(password, &found.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id, "invalid password");
            return Err(AuthError::CredentialError.into());
        }
        Err(e) => {
            warn!(user_id, error = %e, "stored password hash could not be checked");
            return Err(AuthError::CredentialError.into());
        }
    }

    let session = state
        .sessions
        .create(user_id, &client.ip, &client.user_agent)
        .await
        .map_err(|e| AppError::internal("Failed to create session", e))?;

    let identity = AuthIdentity::for_session(&found.user, &session.session_id);
    let access = state
        .tokens
        .encode(TokenKind::Access, &identity)
        .map_err(|e| AppError::internal("Failed to generate access token", e))?;
    let refresh = state
        .tokens
        .encode(TokenKind::Refresh, &identity)
        .map_err(|e| AppError::internal("Failed to generate refresh token", e))?;

    info!(user_id, username = %found.user.username, "login successful");
    Ok(LoginOutcome {
        user: found.user,
        session,
        access,
        refresh,
    })
}

/// Revoke the caller's session if one can be identified. Never fails.
///
/// The access token names the session; when it is missing or unusable the
/// refresh token is tried instead. Returns whether a session was revoked.
pub async fn logout(state: &AppState, access: Option<&str>, refresh: Option<&str>) -> bool {
    let claims = access
        .and_then(|token| state.tokens.decode(token, TokenKind::Access).ok())
        .or_else(|| refresh.and_then(|token| state.tokens.decode(token, TokenKind::Refresh).ok()));

    match claims {
        Some(claims) => {
            info!(user_id = claims.user_id, "logging out");
            state.sessions.revoke(&claims.session_id).await
        }
        None => {
            debug!("logout without a decodable token");
            false
        }
    }
}
