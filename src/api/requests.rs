//! Material request endpoints

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use tracing::info;

use super::{AppState, AuthUser, parse_id};
use crate::error::{AppError, AppResult};
use crate::models::{MaterialRequest, NewMaterialRequest, RequestStatus};

#[derive(Debug, Deserialize)]
pub struct RequestFilter {
    pub status: Option<String>,
}

pub async fn create_request(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<NewMaterialRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MaterialRequest>)> {
    let Json(new_request) = payload?;
    new_request.validate()?;

    let request = new_request.into_request(auth.id);
    state.store.insert_request(&request).await?;

    info!(request_id = %request.id, requested_by = %auth.id, "Material request opened");
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn list_requests(
    State(state): State<AppState>,
    filter: Result<Query<RequestFilter>, QueryRejection>,
) -> AppResult<Json<Vec<MaterialRequest>>> {
    let Query(filter) = filter?;

    let status = filter
        .status
        .as_deref()
        .map(str::parse::<RequestStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    Ok(Json(state.store.list_requests(status).await?))
}

pub async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MaterialRequest>> {
    let id = parse_id(&id, "Request")?;

    let request = state
        .store
        .find_request(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Request not found".to_string()))?;

    Ok(Json(request))
}
