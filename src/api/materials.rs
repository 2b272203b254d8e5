//! Material endpoints: listing, publishing, rating, download counting

use axum::{
    Json,
    body::Bytes,
    extract::{FromRequest, Multipart, Path, Request, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use super::{AppState, AuthUser, parse_id};
use crate::error::{AppError, AppResult};
use crate::models::{Material, NewMaterial, UploaderSummary};
use crate::publishing::publish_material;
use crate::reputation::RatingValue;

/// Material with its uploader embedded as a summary
pub type PopulatedMaterial = Material<Option<UploaderSummary>>;

#[derive(Debug, Deserialize)]
pub struct RateRequest {
    pub rating: f64,
}

/// Swap each material's uploader id for the uploader's summary
async fn populate_all(state: &AppState, materials: Vec<Material>) -> AppResult<Vec<PopulatedMaterial>> {
    let ids: Vec<Uuid> = materials
        .iter()
        .map(|m| m.uploaded_by)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let uploaders: HashMap<Uuid, UploaderSummary> = state
        .store
        .find_users(&ids)
        .await?
        .iter()
        .map(|u| (u.id, UploaderSummary::from(u)))
        .collect();

    Ok(materials
        .into_iter()
        .map(|m| {
            let uploader = uploaders.get(&m.uploaded_by).cloned();
            m.populate(uploader)
        })
        .collect())
}

pub async fn list_materials(State(state): State<AppState>) -> AppResult<Json<Vec<PopulatedMaterial>>> {
    let materials = state.store.list_materials().await?;
    Ok(Json(populate_all(&state, materials).await?))
}

pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PopulatedMaterial>> {
    let id = parse_id(&id, "Material")?;

    let material = state
        .store
        .find_material(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Material not found".to_string()))?;

    let uploader = state
        .store
        .find_user(material.uploaded_by)
        .await?
        .map(|u| UploaderSummary::from(&u));

    Ok(Json(material.populate(uploader)))
}

/// Publish request, from a multipart form or a JSON body
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishForm {
    #[serde(flatten)]
    material: NewMaterial,
    #[serde(default)]
    fulfills_request_id: Option<String>,
    #[serde(skip)]
    file: Option<(String, Bytes)>,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.trim_start().starts_with("application/json"))
}

async fn read_publish_form(mut multipart: Multipart) -> AppResult<PublishForm> {
    let mut form = PublishForm::default();
    let malformed = |e: axum::extract::multipart::MultipartError| AppError::Validation(e.body_text());

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await.map_err(malformed)?;
            // An empty file input is sent as a nameless, empty part
            if !(file_name.is_empty() && bytes.is_empty()) {
                form.file = Some((file_name, bytes));
            }
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        match name.as_str() {
            "title" => form.material.title = value,
            "description" => form.material.description = value,
            "subject" => form.material.subject = value,
            "educationLevel" => form.material.education_level = value,
            "fileUrl" => form.material.file_url = value,
            "fulfillsRequestId" => form.fulfills_request_id = Some(value),
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// Publish a material. Multipart bodies may carry the file itself; JSON
/// bodies reference one through `fileUrl`.
pub async fn create_material(
    State(state): State<AppState>,
    auth: AuthUser,
    request: Request,
) -> AppResult<(StatusCode, Json<Material>)> {
    let form = if is_json(request.headers()) {
        let Json(form) = Json::<PublishForm>::from_request(request, &state).await?;
        form
    } else {
        read_publish_form(Multipart::from_request(request, &state).await?).await?
    };
    let mut new_material = form.material;
    new_material.validate()?;

    let fulfills_request = match form.fulfills_request_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
            AppError::Validation("fulfillsRequestId is not a valid id".to_string())
        })?),
    };

    // The stored file wins over any fileUrl field
    if let Some((file_name, bytes)) = form.file {
        new_material.file_url = state.uploads.save(&file_name, &bytes).await?;
    }

    let material = publish_material(
        state.store.as_ref(),
        &state.reputation,
        new_material,
        auth.id,
        fulfills_request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(material)))
}

pub async fn rate_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: AuthUser,
    payload: Result<Json<RateRequest>, JsonRejection>,
) -> AppResult<Json<Material>> {
    let material_id = parse_id(&id, "Material")?;
    let Json(req) = payload?;
    let value = RatingValue::new(req.rating)?;

    let material = state
        .reputation
        .submit_rating(material_id, auth.id, value)
        .await?;

    Ok(Json(material))
}

pub async fn download_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _auth: AuthUser,
) -> AppResult<Json<Material>> {
    let id = parse_id(&id, "Material")?;

    let material = state
        .store
        .increment_downloads(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Material not found".to_string()))?;

    debug!(material_id = %id, downloads = material.download_count, "Download counted");
    Ok(Json(material))
}
