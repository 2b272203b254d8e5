//! Reputation Manager - Main Orchestrator
//!
//! Applies rating submissions to materials and the resulting reputation
//! changes to their uploaders.
//!
//! A submission is a read-modify-write of the material followed by a
//! conditional write to the uploader. Submissions for the same material are
//! serialized within this process by a per-material lock. Nothing makes the
//! two writes atomic, and separate processes sharing one database can still
//! interleave (last write wins).

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::rating::{RatingChange, RatingValue};
use super::thresholds::ReputationThresholds;
use crate::database::Store;
use crate::error::{AppError, AppResult};
use crate::models::{Badge, Material};

pub struct ReputationManager {
    store: Arc<dyn Store>,
    thresholds: ReputationThresholds,

    /// Material id -> lock guarding its read-modify-write
    rating_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ReputationManager {
    pub fn new(store: Arc<dyn Store>, thresholds: ReputationThresholds) -> Self {
        Self {
            store,
            thresholds,
            rating_locks: DashMap::new(),
        }
    }

    /// Record `user_id`'s rating of a material, recompute its average and
    /// promote the uploader to Expert when the material qualifies.
    pub async fn submit_rating(
        &self,
        material_id: Uuid,
        user_id: Uuid,
        value: RatingValue,
    ) -> AppResult<Material> {
        let lock = self.rating_lock(material_id);
        let result = {
            let _guard = lock.lock().await;
            self.rate_locked(material_id, user_id, value).await
        };
        drop(lock);
        self.release_rating_lock(material_id);

        result
    }

    async fn rate_locked(
        &self,
        material_id: Uuid,
        user_id: Uuid,
        value: RatingValue,
    ) -> AppResult<Material> {
        let mut material = self
            .store
            .find_material(material_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Material not found".to_string()))?;

        let change = material.apply_rating(user_id, value);
        self.store.save_ratings(&material).await?;

        match change {
            RatingChange::Added => debug!(
                material_id = %material_id,
                user_id = %user_id,
                value = value.get(),
                "Rating added"
            ),
            RatingChange::Updated { previous } => debug!(
                material_id = %material_id,
                user_id = %user_id,
                previous,
                value = value.get(),
                "Rating updated"
            ),
        }

        if self.thresholds.qualifies_for_expert(&material) {
            self.promote_to_expert(&material).await?;
        }

        Ok(material)
    }

    /// Add the Expert badge to the material's uploader if not already held.
    /// The material write has already happened and is not undone if this fails.
    async fn promote_to_expert(&self, material: &Material) -> AppResult<()> {
        let uploader_id = material.uploaded_by;

        let Some(uploader) = self.store.find_user(uploader_id).await? else {
            warn!(
                material_id = %material.id,
                uploader_id = %uploader_id,
                "Material qualifies for Expert but its uploader no longer exists"
            );
            return Ok(());
        };

        if uploader.badges.contains(Badge::Expert) {
            return Ok(());
        }

        if self.store.add_badge(uploader_id, Badge::Expert).await? {
            info!(
                user_id = %uploader_id,
                material_id = %material.id,
                ratings = material.ratings.len(),
                average = material.average_rating,
                "Uploader promoted to Expert"
            );
        }

        Ok(())
    }

    /// Credit the uploader of a newly published material
    pub async fn award_upload(&self, user_id: Uuid) -> AppResult<()> {
        let points = self.thresholds.upload_points;

        if self.store.add_contribution_points(user_id, points).await? {
            debug!(user_id = %user_id, points, "Contribution points awarded");
        } else {
            warn!(user_id = %user_id, "Cannot award contribution points: user not found");
        }

        Ok(())
    }

    fn rating_lock(&self, material_id: Uuid) -> Arc<Mutex<()>> {
        self.rating_locks
            .entry(material_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the lock entry once no other submission holds or awaits it
    fn release_rating_lock(&self, material_id: Uuid) {
        self.rating_locks
            .remove_if(&material_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
