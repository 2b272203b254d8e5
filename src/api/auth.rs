//! Registration and login

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::AppState;
use crate::error::{AppError, AppResult};
use crate::models::User;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl RegisterRequest {
    fn validate(&self) -> AppResult<()> {
        crate::models::require("username", &self.username)?;
        crate::models::require("email", &self.email)?;
        if !self.email.contains('@') {
            return Err(AppError::Validation("email is invalid".to_string()));
        }
        if self.password.is_empty() {
            return Err(AppError::Validation("password is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The user record without its password hash, plus a bearer token
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    req.validate()?;

    let username = req.username.trim().to_string();
    let email = req.email.trim().to_string();

    if state
        .store
        .find_user_by_username_or_email(&username, &email)
        .await?
        .is_some()
    {
        warn!(username = %username, "Registration rejected: user already exists");
        return Err(AppError::Validation("User already exists".to_string()));
    }

    let password_hash = state.passwords.hash(&req.password).await?;
    let user = User::new(username, email, password_hash);

    // A concurrent registration can still win the race; the store's
    // uniqueness check reports it as a duplicate.
    state.store.insert_user(&user).await?;

    let token = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(req) = payload?;

    let user = state
        .store
        .find_user_by_email(req.email.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !state.passwords.verify(&req.password, &user.password_hash).await? {
        warn!(user_id = %user.id, "Login rejected: invalid password");
        return Err(AppError::Validation("Invalid password".to_string()));
    }

    let token = state.tokens.issue(user.id)?;
    info!(user_id = %user.id, "User logged in");

    Ok(Json(AuthResponse { user, token }))
}
