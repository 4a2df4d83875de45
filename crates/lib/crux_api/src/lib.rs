//! # crux_api
//!
//! HTTP API library for the Crux backend.

pub mod config;
pub mod envelope;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, Method};
use axum::routing::{get, post};
use crux_core::auth::jwt::TokenCodec;
use crux_core::auth::session::SessionManager;
use crux_core::auth::store::{CredentialStore, UserStore};
use sqlx::PgPool;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ApiConfig;
use crate::envelope::EnvelopeMeta;
use crate::handlers::{auth, health, users};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User records.
    pub users: Arc<dyn UserStore>,
    /// Session lifecycle over the same store.
    pub sessions: SessionManager,
    /// Access/refresh token codec.
    pub tokens: TokenCodec,
    /// Facts stamped on every response envelope.
    pub envelope: EnvelopeMeta,
    /// API configuration.
    pub config: ApiConfig,
}

impl AppState {
    /// Build state over one store serving both users and sessions.
    pub fn new<S: CredentialStore + 'static>(store: Arc<S>, config: ApiConfig) -> Self {
        let users: Arc<dyn UserStore> = store.clone();
        Self {
            users,
            sessions: SessionManager::new(store),
            tokens: TokenCodec::new(config.secrets.clone()),
            envelope: EnvelopeMeta::new(&config.api_version, &config.environment),
            config,
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `crux_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    crux_core::migrate::migrate(pool).await
}

/// Credentialed CORS for the configured origins only.
fn cors_layer(config: &ApiConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(config.cors_origins.clone()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            ORIGIN,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([CONTENT_LENGTH, HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
        .max_age(Duration::from_secs(12 * 60 * 60))
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);
    let gateway = axum::middleware::from_fn_with_state(state.clone(), middleware::auth::require_auth);

    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/login", post(auth::login_handler))
        .route("/logout", post(auth::logout_handler))
        .route("/refresh", post(auth::refresh_handler));

    // Registration is public; reading or changing a profile goes through the gateway.
    let user_routes = Router::new().route(
        "/users",
        post(users::create_user_handler).merge(
            get(users::get_user_handler)
                .put(users::update_user_handler)
                .route_layer(gateway),
        ),
    );

    Router::new()
        .merge(public)
        .merge(user_routes)
        .layer(CatchPanicLayer::new())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors_layer(&state.config))
        .with_state(state)
}
