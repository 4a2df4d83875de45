//! Integration tests: drive the full router against an in-memory store.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum_extra::extract::cookie::Cookie;
use chrono::{Duration, Utc};
use crux_api::config::ApiConfig;
use crux_api::{AppState, router};
use crux_core::auth::jwt::{JwtSecrets, TokenCodec};
use crux_core::auth::memory::MemoryStore;
use crux_core::auth::password::hash_password;
use crux_core::auth::store::{SessionStore, UserStore};
use crux_core::models::auth::{AuthIdentity, NewSession, NewUser, TokenKind};
use serde_json::{Value, json};
use tower::ServiceExt;

const ACCESS_SECRET: &str = "test-access-secret";
const REFRESH_SECRET: &str = "test-refresh-secret";
const PASSWORD: &str = "password123";

struct TestApp {
    app: Router,
    codec: TokenCodec,
    store: Arc<MemoryStore>,
}

async fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store
        .create_user(NewUser {
            username: "alex".into(),
            email: "alex@example.com".into(),
            password_hash: hash_password(PASSWORD).expect("hash"),
            first_name: Some("Alex".into()),
            last_name: None,
        })
        .await
        .expect("seed user");

    let secrets = JwtSecrets::new(ACCESS_SECRET, REFRESH_SECRET).expect("secrets");
    let config = ApiConfig::new("127.0.0.1:0", secrets.clone(), "test", None, None, &[])
        .expect("config");
    TestApp {
        app: router(AppState::new(store.clone(), config)),
        codec: TokenCodec::new(secrets),
        store,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.expect("request")
    }

    async fn login(&self, body: Value) -> Response<Body> {
        self.send(
            Request::post("/login")
                .header(CONTENT_TYPE, "application/json")
                .header("user-agent", "integration-test")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

fn cookies(response: &Response<Body>) -> Vec<Cookie<'static>> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| Cookie::parse(v.to_str().unwrap().to_string()).unwrap())
        .collect()
}

fn cookie(response: &Response<Body>, name: &str) -> Option<Cookie<'static>> {
    cookies(response).into_iter().find(|c| c.name() == name)
}

fn cookie_header(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body")
        .to_vec()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("parse JSON")
}

fn put_users(cookie: &str, body: Value) -> Request<Body> {
    Request::put("/users")
        .header(COOKIE, cookie)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn register(body: Value) -> Request<Body> {
    Request::post("/users")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_users(cookie: &str) -> Request<Body> {
    Request::get("/users")
        .header(COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn login_renewal_logout_end_to_end() {
    let t = test_app().await;

    // Login sets both cookies.
    let response = t
        .login(json!({"username": "alex", "password": PASSWORD}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let access = cookie(&response, "access_token").expect("access cookie");
    let refresh = cookie(&response, "refresh_token").expect("refresh cookie");
    assert_eq!(access.http_only(), Some(true));
    assert_eq!(access.path(), Some("/"));
    assert_eq!(access.max_age(), Some(time::Duration::seconds(900)));
    assert_eq!(refresh.max_age(), Some(time::Duration::seconds(604_800)));

    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["api_name"], "login");
    assert_eq!(body["data"]["user"]["username"], "alex");
    assert!(body["data"]["user"].get("password_hash").is_none());
    let session_id = body["data"]["session_id"].as_str().unwrap().to_string();

    // A valid access cookie is enough; nothing is renewed.
    let response = t
        .send(get_users(&cookie_header(&[("access_token", access.value())])))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie(&response, "access_token").is_none());
    let body = body_json(response).await;
    assert_eq!(body["data"]["email"], "alex@example.com");

    // Sixteen minutes later the access token has lapsed; the gateway renews it.
    let claims = t
        .codec
        .decode(access.value(), TokenKind::Access)
        .expect("decode access");
    let identity = claims.identity();
    let stale = t
        .codec
        .encode_at(TokenKind::Access, &identity, Utc::now() - Duration::minutes(16))
        .expect("stale token");
    let before = Utc::now();
    let response = t
        .send(get_users(&cookie_header(&[
            ("access_token", stale.token.as_str()),
            ("refresh_token", refresh.value()),
        ])))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let renewed = cookie(&response, "access_token").expect("renewed access cookie");
    assert!(cookie(&response, "refresh_token").is_none());
    assert_eq!(renewed.max_age(), Some(time::Duration::seconds(900)));
    let renewed_claims = t
        .codec
        .decode(renewed.value(), TokenKind::Access)
        .expect("decode renewed");
    assert_eq!(renewed_claims.identity(), identity);
    assert_eq!(renewed_claims.session_id, session_id);
    assert!((899..=901).contains(&(renewed_claims.exp - before.timestamp())));

    // Logout clears both cookies.
    let response = t
        .send(
            Request::post("/logout")
                .header(
                    COOKIE,
                    cookie_header(&[
                        ("access_token", renewed.value()),
                        ("refresh_token", refresh.value()),
                    ]),
                )
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    for name in ["access_token", "refresh_token"] {
        let cleared = cookie(&response, name).expect("cleared cookie");
        assert_eq!(cleared.value(), "");
        assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));
    }
    let body = body_json(response).await;
    assert_eq!(body["api_name"], "logout");
    assert_eq!(body["message"], "Logout successful");
    assert_eq!(body["data"]["message"], "Logout successful");

    // The old refresh token now hits a revoked session.
    let response = t
        .send(get_users(&cookie_header(&[("refresh_token", refresh.value())])))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Session has been revoked");
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn unknown_user_and_wrong_password_are_byte_identical() {
    let t = test_app().await;
    let unknown = t
        .login(json!({"username": "nobody", "password": PASSWORD}))
        .await;
    let wrong = t
        .login(json!({"username": "alex", "password": "not-the-password"}))
        .await;

    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert!(cookies(&unknown).is_empty());
    assert_eq!(body_bytes(unknown).await, body_bytes(wrong).await);
}

#[tokio::test]
async fn login_by_email_is_normalised() {
    let t = test_app().await;
    let response = t
        .login(json!({"email": "  ALEX@Example.com ", "password": PASSWORD}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie(&response, "refresh_token").is_some());
}

#[tokio::test]
async fn login_requires_exactly_one_identifier() {
    let t = test_app().await;
    for body in [
        json!({"username": "alex", "email": "alex@example.com", "password": PASSWORD}),
        json!({"password": PASSWORD}),
        json!({"username": "alex"}),
    ] {
        let response = t.login(body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    }
}

#[tokio::test]
async fn malformed_login_body_is_invalid_input() {
    let t = test_app().await;
    let response = t
        .send(
            Request::post("/login")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn protected_route_without_cookies_is_rejected() {
    let t = test_app().await;
    let response = t
        .send(Request::get("/users").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Not authenticated");
    assert_eq!(body["api_name"], "auth_middleware");
}

#[tokio::test]
async fn refresh_endpoint_sets_only_the_access_cookie() {
    let t = test_app().await;
    let response = t
        .login(json!({"username": "alex", "password": PASSWORD}))
        .await;
    let refresh = cookie(&response, "refresh_token").expect("refresh cookie");

    let response = t
        .send(
            Request::post("/refresh")
                .header(COOKIE, cookie_header(&[("refresh_token", refresh.value())]))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie(&response, "access_token").is_some());
    assert!(cookie(&response, "refresh_token").is_none());
    let body = body_json(response).await;
    assert_eq!(body["api_name"], "refresh");
    assert_eq!(body["message"], "Access token refreshed successfully");
    assert!(body["data"]["expires_at"].is_string());
}

#[tokio::test]
async fn refresh_endpoint_without_cookie_is_rejected() {
    let t = test_app().await;
    let response = t
        .send(Request::post("/refresh").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "No refresh token provided"
    );
}

#[tokio::test]
async fn refresh_token_for_unknown_session_is_rejected() {
    let t = test_app().await;
    let identity = AuthIdentity {
        user_id: 1,
        username: "alex".into(),
        email: "alex@example.com".into(),
        session_id: "never-created".into(),
    };
    let refresh = t
        .codec
        .encode(TokenKind::Refresh, &identity)
        .expect("refresh token");
    let response = t
        .send(get_users(&cookie_header(&[("refresh_token", refresh.token.as_str())])))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Session not found");
}

#[tokio::test]
async fn logout_without_cookies_still_succeeds() {
    let t = test_app().await;
    let response = t
        .send(Request::post("/logout").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cookies(&response).len(), 2);
    assert_eq!(body_json(response).await["status"], "success");
}

#[tokio::test]
async fn register_then_conflict() {
    let t = test_app().await;
    let account = |username: &str, email: &str| {
        register(json!({
            "username": username,
            "email": email,
            "password": "climbing-is-fun",
            "last_name": "Sharma",
        }))
    };

    let response = t.send(account("chris", "chris@example.com")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "chris");
    assert_eq!(body["data"]["last_name"], "Sharma");

    let response = t.send(account("chris", "other@example.com")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["code"], "CONFLICT");

    let response = t.send(account("c", "bad-email")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "VALIDATION_FAILED"
    );

    // The new account can log in.
    let response = t
        .login(json!({"username": "chris", "password": "climbing-is-fun"}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn health_reports_envelope_and_request_id() {
    let t = test_app().await;
    let response = t
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["service_name"], "crux-backend");
    assert_eq!(body["environment"], "test");
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn registration_validates_normalised_identifiers() {
    let t = test_app().await;

    for username in ["   ", " ab "] {
        let response = t
            .send(register(json!({
                "username": username,
                "email": "adam@example.com",
                "password": "climbing-is-fun",
            })))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(body["message"], "Username must be 3 to 50 characters");
    }
    assert!(!t.store.username_exists("").await.unwrap());

    let response = t
        .send(register(json!({
            "username": " adam ",
            "email": " Adam@Example.com ",
            "password": "climbing-is-fun",
        })))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["username"], "adam");
    assert_eq!(body["data"]["email"], "adam@example.com");
}

#[tokio::test]
async fn profile_update_goes_through_the_gateway() {
    let t = test_app().await;
    let response = t
        .login(json!({"username": "alex", "password": PASSWORD}))
        .await;
    let access = cookie(&response, "access_token").expect("access cookie");
    let auth = cookie_header(&[("access_token", access.value())]);

    let response = t
        .send(put_users(
            &auth,
            json!({"username": " alexh ", "email": " ALEX@Crux.io", "last_name": "Honnold"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["api_name"], "update_user");
    assert_eq!(body["message"], "User updated successfully");
    assert_eq!(body["data"]["username"], "alexh");
    assert_eq!(body["data"]["email"], "alex@crux.io");
    assert_eq!(body["data"]["first_name"], "Alex");
    assert_eq!(body["data"]["last_name"], "Honnold");

    // The change is visible on the next read.
    let body = body_json(t.send(get_users(&auth)).await).await;
    assert_eq!(body["data"]["username"], "alexh");

    // Nothing to change.
    let response = t
        .send(put_users(&auth, json!({"first_name": "  "})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_INPUT");
    assert_eq!(body["message"], "No fields provided for update");

    // Present fields are validated.
    let response = t.send(put_users(&auth, json!({"email": "nope"}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "VALIDATION_FAILED"
    );

    // Another user's username is taken.
    let response = t
        .send(register(json!({
            "username": "tommy",
            "email": "tommy@example.com",
            "password": "climbing-is-fun",
        })))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = t.send(put_users(&auth, json!({"username": "tommy"}))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(response).await["message"],
        "Username is already taken"
    );
}

#[tokio::test]
async fn profile_update_without_cookies_is_rejected() {
    let t = test_app().await;
    let response = t
        .send(
            Request::put("/users")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"first_name": "Eve"}).to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Not authenticated");
}

#[tokio::test]
async fn empty_cookie_values_count_as_absent() {
    let t = test_app().await;
    let cleared = cookie_header(&[("access_token", ""), ("refresh_token", "")]);

    let response = t.send(get_users(&cleared)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Not authenticated");

    let response = t
        .send(
            Request::post("/refresh")
                .header(COOKIE, cleared.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "No refresh token provided"
    );
}

#[tokio::test]
async fn expired_session_is_rejected_by_the_gateway() {
    let t = test_app().await;
    let session = t
        .store
        .insert_session(NewSession {
            session_id: "lapsed-session".into(),
            user_id: 1,
            ip: "127.0.0.1".into(),
            user_agent: "integration-test".into(),
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .expect("insert session");
    let identity = AuthIdentity {
        user_id: 1,
        username: "alex".into(),
        email: "alex@example.com".into(),
        session_id: session.session_id,
    };
    let refresh = t
        .codec
        .encode(TokenKind::Refresh, &identity)
        .expect("refresh token");

    let response = t
        .send(get_users(&cookie_header(&[("refresh_token", refresh.token.as_str())])))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(cookie(&response, "access_token").is_none());
    assert_eq!(body_json(response).await["message"], "Session has expired");
}

#[tokio::test]
async fn non_hmac_tokens_are_rejected_by_the_gateway() {
    let t = test_app().await;
    let response = t
        .login(json!({"username": "alex", "password": PASSWORD}))
        .await;
    let access = cookie(&response, "access_token").expect("access cookie");
    let refresh = cookie(&response, "refresh_token").expect("refresh cookie");

    // Re-label each token's header as {"alg":"RS256","typ":"JWT"}.
    let relabel = |token: &str| {
        let (_, rest) = token.split_once('.').unwrap();
        format!("eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{rest}")
    };
    let forged_access = relabel(access.value());
    let forged_refresh = relabel(refresh.value());

    let response = t
        .send(get_users(&cookie_header(&[("access_token", forged_access.as_str())])))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Not authenticated");

    let response = t
        .send(get_users(&cookie_header(&[
            ("access_token", forged_access.as_str()),
            ("refresh_token", forged_refresh.as_str()),
        ])))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid or expired refresh token"
    );
}
