//! Material publishing
//!
//! Publishing is three independent writes, in order:
//!
//! 1. insert the material
//! 2. credit the uploader with contribution points
//! 3. mark the named request fulfilled by the new material
//!
//! There is no transaction around them. If a later step fails, earlier steps
//! stay applied and the failure is logged with the ids involved.

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::database::Store;
use crate::error::AppResult;
use crate::models::{Material, NewMaterial};
use crate::reputation::ReputationManager;

pub async fn publish_material(
    store: &dyn Store,
    reputation: &ReputationManager,
    new_material: NewMaterial,
    uploader_id: Uuid,
    fulfills_request: Option<Uuid>,
) -> AppResult<Material> {
    new_material.validate()?;
    new_material.validate_file_url()?;

    let material = new_material.into_material(uploader_id);
    store.insert_material(&material).await?;

    info!(
        material_id = %material.id,
        uploader_id = %uploader_id,
        subject = %material.subject,
        "Material published"
    );

    if let Err(e) = reputation.award_upload(uploader_id).await {
        error!(
            material_id = %material.id,
            uploader_id = %uploader_id,
            error = %e,
            "Material saved but contribution points were not awarded"
        );
        return Err(e);
    }

    if let Some(request_id) = fulfills_request {
        match store.mark_fulfilled(request_id, material.id).await {
            Ok(Some(_)) => info!(
                request_id = %request_id,
                material_id = %material.id,
                "Request fulfilled"
            ),
            Ok(None) => warn!(
                request_id = %request_id,
                material_id = %material.id,
                "Fulfilled request does not exist, skipping link"
            ),
            Err(e) => {
                error!(
                    request_id = %request_id,
                    material_id = %material.id,
                    error = %e,
                    "Material saved but request was not marked fulfilled"
                );
                return Err(e.into());
            }
        }
    }

    Ok(material)
}
