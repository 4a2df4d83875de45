//! Cookie service: set and clear the httpOnly auth cookies.

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use crux_core::auth::jwt::{ACCESS_TOKEN_EXPIRY_SECS, REFRESH_TOKEN_EXPIRY_SECS};
use time::{Duration, OffsetDateTime};

/// Cookie name for the access token.
pub const ACCESS_COOKIE: &str = "access_token";
/// Cookie name for the refresh token.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Value of cookie `name`. An empty value counts as absent.
pub fn cookie_value<'a>(jar: &'a CookieJar, name: &str) -> Option<&'a str> {
    jar.get(name).map(|c| c.value()).filter(|v| !v.is_empty())
}

fn auth_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// httpOnly cookie for the access token (15 minutes).
pub fn access_cookie(token: &str, secure: bool) -> Cookie<'static> {
    let mut cookie = auth_cookie(ACCESS_COOKIE, token.to_string(), secure);
    cookie.set_max_age(Duration::seconds(ACCESS_TOKEN_EXPIRY_SECS));
    cookie
}

/// httpOnly cookie for the refresh token (7 days).
pub fn refresh_cookie(token: &str, secure: bool) -> Cookie<'static> {
    let mut cookie = auth_cookie(REFRESH_COOKIE, token.to_string(), secure);
    cookie.set_max_age(Duration::seconds(REFRESH_TOKEN_EXPIRY_SECS));
    cookie
}

fn expired(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = auth_cookie(name, String::new(), secure);
    cookie.set_max_age(Duration::ZERO);
    cookie.set_expires(OffsetDateTime::now_utc() - Duration::hours(1));
    cookie
}

/// Expired access cookie that clears client state.
pub fn clear_access_cookie(secure: bool) -> Cookie<'static> {
    expired(ACCESS_COOKIE, secure)
}

/// Expired refresh cookie that clears client state.
pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    expired(REFRESH_COOKIE, secure)
}
