//! User registration, profile lookup and profile updates.

use crux_core::auth::password::{MAX_PASSWORD_BYTES, hash_password};
use crux_core::models::auth::{NewUser, User, UserUpdate};
use tracing::{info, warn};
use validator::Validate;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{CreateUserRequest, UpdateUserRequest};

/// Register a user. Identifiers are normalised before validation.
pub async fn create_user(state: &AppState, req: CreateUserRequest) -> AppResult<User> {
    let req = req.normalized();
    req.validate()?;
    if req.password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation(format!(
            "Password must not exceed {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    let CreateUserRequest {
        username,
        email,
        password,
        first_name,
        last_name,
    } = req;

    if state
        .users
        .email_exists(&email)
        .await
        .map_err(|e| AppError::internal("Failed to check for existing user", e))?
    {
        warn!(email = %email, "user creation rejected, email already exists");
        return Err(AppError::Conflict("User with this email already exists".into()));
    }
    if state
        .users
        .username_exists(&username)
        .await
        .map_err(|e| AppError::internal("Failed to check for existing username", e))?
    {
        warn!(username = %username, "user creation rejected, username already exists");
        return Err(AppError::Conflict("User with this username already exists".into()));
    }

    let password_hash = hash_password(&password)
        .map_err(|e| AppError::internal("Failed to process password", e))?;

    // Races past the checks above surface as a unique violation, i.e. Conflict.
    let user = state
        .users
        .create_user(NewUser {
            username,
            email,
            password_hash,
            first_name,
            last_name,
        })
        .await?;
    info!(user_id = user.id, username = %user.username, "user created");
    Ok(user)
}

/// Load the profile behind an authenticated identity.
pub async fn current_user(state: &AppState, user_id: i64) -> AppResult<User> {
    state
        .users
        .get_user_by_id(user_id)
        .await
        .map_err(|e| AppError::internal("Failed to fetch user", e))?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

/// Apply a partial profile update for `user_id`.
///
/// Blank fields are ignored; a username or email already held by another
/// user is a conflict.
pub async fn update_user(
    state: &AppState,
    user_id: i64,
    req: UpdateUserRequest,
) -> AppResult<User> {
    let req = req.normalized();
    let update = UserUpdate::from(req.clone());
    if update.is_empty() {
        warn!(user_id, "no fields provided for update");
        return Err(AppError::InvalidInput("No fields provided for update".into()));
    }
    req.validate()?;

    if let Some(username) = &update.username {
        let holder = state
            .users
            .find_user_by_username(username)
            .await
            .map_err(|e| AppError::internal("Failed to check username availability", e))?;
        if holder.is_some_and(|h| h.user.id != user_id) {
            warn!(user_id, username = %username, "username is already taken");
            return Err(AppError::Conflict("Username is already taken".into()));
        }
    }
    if let Some(email) = &update.email {
        let holder = state
            .users
            .find_user_by_email(email)
            .await
            .map_err(|e| AppError::internal("Failed to check email availability", e))?;
        if holder.is_some_and(|h| h.user.id != user_id) {
            warn!(user_id, email = %email, "email is already taken");
            return Err(AppError::Conflict("Email is already taken".into()));
        }
    }

    let user = state
        .users
        .update_user(user_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    info!(user_id, username = %user.username, "user updated");
    Ok(user)
}
