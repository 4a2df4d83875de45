//! Authentication request handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use crux_core::auth::AuthError;
use crux_core::models::auth::TokenKind;

use crate::AppState;
use crate::error::{ApiError, AppError};
use crate::extract::ClientMeta;
use crate::models::{LoginRequest, LoginResponse, LogoutResponse, RefreshResponse};
use crate::services::auth;
use crate::services::cookies::{
    ACCESS_COOKIE, REFRESH_COOKIE, access_cookie, clear_access_cookie, clear_refresh_cookie,
    cookie_value, refresh_cookie,
};

/// `POST /login`: authenticate with username or email plus password.
pub async fn login_handler(
    State(state): State<AppState>,
    client: ClientMeta,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(CookieJar, Response), ApiError> {
    let api = state.envelope.api("login");
    let Json(body) = body.map_err(|e| api.fail(AppError::InvalidInput(e.body_text())))?;

    let outcome = auth::login(
        &state,
        body.username.as_deref(),
        body.email.as_deref(),
        &body.password,
        &client,
    )
    .await
    .map_err(|e| api.fail(e))?;

    let secure = state.config.secure_cookies;
    let jar = CookieJar::new()
        .add(access_cookie(&outcome.access.token, secure))
        .add(refresh_cookie(&outcome.refresh.token, secure));
    let data = LoginResponse::new(
        outcome.user,
        outcome.session.session_id,
        outcome.session.expires_at,
    );
    Ok((jar, api.success(StatusCode::OK, "Login successful", data)))
}

/// `POST /logout`: revoke the caller's session and clear both cookies.
///
/// Always succeeds, even without cookies or when revocation fails.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Response) {
    let api = state.envelope.api("logout");
    auth::logout(
        &state,
        cookie_value(&jar, ACCESS_COOKIE),
        cookie_value(&jar, REFRESH_COOKIE),
    )
    .await;

    let secure = state.config.secure_cookies;
    let cleared = CookieJar::new()
        .add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure));
    let data = LogoutResponse {
        message: "Logout successful".to_string(),
    };
    (cleared, api.success(StatusCode::OK, "Logout successful", data))
}

/// `POST /refresh`: mint a new access cookie from the refresh cookie.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Response), ApiError> {
    let api = state.envelope.api("refresh");
    let refresh = cookie_value(&jar, REFRESH_COOKIE)
        .ok_or_else(|| api.fail(AuthError::MissingToken(TokenKind::Refresh)))?;

    let renewal = auth::renew_access_token(&state, refresh)
        .await
        .map_err(|e| api.fail(e))?;

    let jar = CookieJar::new().add(access_cookie(
        &renewal.access.token,
        state.config.secure_cookies,
    ));
    let data = RefreshResponse::new(renewal.access.expires_at);
    Ok((
        jar,
        api.success(StatusCode::OK, "Access token refreshed successfully", data),
    ))
}
