//! Authentication gateway: cookie-based JWT verification with silent
//! access-token renewal.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use crux_core::models::auth::AuthIdentity;

use crate::AppState;
use crate::error::ApiError;
use crate::services::auth::authenticate;
use crate::services::cookies::{ACCESS_COOKIE, REFRESH_COOKIE, access_cookie, cookie_value};

/// Identity of the caller, stored in request extensions by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AuthIdentity);

/// Axum middleware: accepts a valid `access_token` cookie, or re-derives one
/// from `refresh_token` after re-checking its session. A renewed access token
/// is set on the downstream response; the refresh cookie is left alone.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let api = state.envelope.api("auth_middleware");
    let access = cookie_value(&jar, ACCESS_COOKIE);
    let refresh = cookie_value(&jar, REFRESH_COOKIE);

    let auth = authenticate(&state, access, refresh)
        .await
        .map_err(|e| api.fail(e))?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser(auth.identity));
    let response = next.run(request).await;

    Ok(match auth.renewed {
        Some(token) => {
            let cookie = access_cookie(&token.token, state.config.secure_cookies);
            (CookieJar::new().add(cookie), response).into_response()
        }
        None => response,
    })
}
