// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, PublicUser, User},
    store::{Store, keys},
    utils::{hash::verify_password, jwt::Claims, jwt::sign_jwt},
};

/// Authenticates a user and returns a JWT token.
///
/// The role sent by the login form scopes the lookup: a student number
/// only matches a siswa account. Wrong username, password or role all
/// yield the same 401 so accounts cannot be enumerated.
pub async fn login(
    State(store): State<Store>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let users: Vec<User> = store.load(keys::USERS).await?;

    let user = users
        .iter()
        .find(|u| u.username == payload.username && u.role == payload.role)
        .ok_or(AppError::AuthError(
            "Invalid username or password".to_string(),
        ))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    if user.status == "inactive" {
        return Err(AppError::AuthError("Account is inactive".to_string()));
    }

    let token = sign_jwt(
        &user.id,
        &user.name,
        user.role,
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!("User '{}' logged in as {}", user.username, user.role.as_str());

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": PublicUser::from(user),
    })))
}

/// Returns the authenticated user's own profile.
pub async fn me(
    State(store): State<Store>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let users: Vec<User> = store.load(keys::USERS).await?;

    let user = users
        .iter()
        .find(|u| u.id == claims.sub)
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(PublicUser::from(user)))
}
