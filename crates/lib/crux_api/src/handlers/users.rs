//! User request handlers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Extension, Json};

use crate::AppState;
use crate::error::{ApiError, AppError};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{CreateUserRequest, UpdateUserRequest, UserResponse};
use crate::services::users;

/// `POST /users`: register a new account.
pub async fn create_user_handler(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let api = state.envelope.api("create_user");
    let Json(body) = body.map_err(|e| api.fail(AppError::InvalidInput(e.body_text())))?;

    let user = users::create_user(&state, body)
        .await
        .map_err(|e| api.fail(e))?;
    Ok(api.success(
        StatusCode::CREATED,
        "User created successfully",
        UserResponse::from(user),
    ))
}

/// `GET /users`: the authenticated caller's profile.
pub async fn get_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>,
) -> Result<Response, ApiError> {
    let api = state.envelope.api("get_user");
    let user = users::current_user(&state, identity.user_id)
        .await
        .map_err(|e| api.fail(e))?;
    Ok(api.success(
        StatusCode::OK,
        "User retrieved successfully",
        UserResponse::from(user),
    ))
}

/// `PUT /users`: update the authenticated caller's profile.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(identity)): Extension<AuthenticatedUser>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let api = state.envelope.api("update_user");
    let Json(body) = body.map_err(|e| api.fail(AppError::InvalidInput(e.body_text())))?;

    let user = users::update_user(&state, identity.user_id, body)
        .await
        .map_err(|e| api.fail(e))?;
    Ok(api.success(
        StatusCode::OK,
        "User updated successfully",
        UserResponse::from(user),
    ))
}
