//! Liveness endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

use crate::AppState;
use crate::models::HealthResponse;

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Response {
    let data = HealthResponse {
        status: "healthy".to_string(),
    };
    state
        .envelope
        .api("health_check")
        .success(StatusCode::OK, "CruxProject API is running!", data)
}
