//! User profile endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::info;

use super::{AppState, AuthUser, parse_id};
use crate::error::{AppError, AppResult};
use crate::models::{Material, ProfileUpdate, User};

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    let id = parse_id(&id, "User")?;

    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Materials uploaded by a user, newest first. Unknown users have none.
pub async fn get_user_materials(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Material>>> {
    let Ok(id) = uuid::Uuid::parse_str(&id) else {
        return Ok(Json(Vec::new()));
    };

    Ok(Json(state.store.list_materials_by_uploader(id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> AppResult<Json<User>> {
    let Json(update) = payload?;
    let update = update.normalized();
    update.validate()?;

    let user = state
        .store
        .update_profile(auth.id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if !update.is_empty() {
        info!(user_id = %user.id, "Profile updated");
    }

    Ok(Json(user))
}
