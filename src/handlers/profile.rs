// src/handlers/profile.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{ChangePasswordRequest, UpdateUsernameRequest},
    store::SharedStore,
    utils::{hash::hash_password, jwt::Claims},
};

/// Get the current user's profile.
pub async fn get_me(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = store
        .find_user_by_id(claims.user_id()?)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Change the display name.
pub async fn update_username(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateUsernameRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::BadRequest("Display name cannot be empty".to_string()));
    }
    let payload = UpdateUsernameRequest { username };
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    store
        .update_username(claims.user_id()?, &payload.username)
        .await?;

    Ok(StatusCode::OK)
}

/// Change the password. The new password must be confirmed.
pub async fn change_password(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id()?;
    let hashed = hash_password(&payload.new_password)?;
    store.update_password(user_id, &hashed).await?;

    tracing::info!(user_id, "Password changed");

    Ok(StatusCode::OK)
}
