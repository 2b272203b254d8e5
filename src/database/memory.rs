//! In-memory store
//!
//! Holds each collection in a map behind a `RwLock`. Data lives for the
//! lifetime of the process. Locks are never held across an await.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::{MaterialStore, RequestStore, StoreError, StoreResult, UserStore};
use crate::models::{Badge, Material, MaterialRequest, ProfileUpdate, RequestStatus, User};

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    materials: RwLock<HashMap<Uuid, Material>>,
    requests: RwLock<HashMap<Uuid, MaterialRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_count(&self) -> StoreResult<usize> {
        Ok(read(&self.users)?.len())
    }

    pub fn material_count(&self) -> StoreResult<usize> {
        Ok(read(&self.materials)?.len())
    }
}

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| StoreError::Poisoned)
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| StoreError::Poisoned)
}

fn newest_first(mut materials: Vec<Material>) -> Vec<Material> {
    materials.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
    materials
}

/// Which unique field of `candidate` collides with another user, if any
fn conflicting_field(
    users: &HashMap<Uuid, User>,
    id: Uuid,
    username: &str,
    email: &str,
) -> Option<&'static str> {
    let others = users.values().filter(|u| u.id != id);
    for other in others {
        if other.username == username {
            return Some("username");
        }
        if other.email == email {
            return Some("email");
        }
    }
    None
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = write(&self.users)?;
        if let Some(field) = conflicting_field(&users, user.id, &user.username, &user.email) {
            return Err(StoreError::Duplicate(field.to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = read(&self.users)?;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> StoreResult<Option<User>> {
        Ok(read(&self.users)?
            .values()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> StoreResult<Option<User>> {
        let mut users = write(&self.users)?;
        let Some(current) = users.get(&id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        updated.apply_update(update);

        if let Some(field) = conflicting_field(&users, id, &updated.username, &updated.email) {
            return Err(StoreError::Duplicate(field.to_string()));
        }

        users.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn add_contribution_points(&self, id: Uuid, points: u64) -> StoreResult<bool> {
        let mut users = write(&self.users)?;
        match users.get_mut(&id) {
            Some(user) => {
                user.contribution_points = user.contribution_points.saturating_add(points);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_badge(&self, id: Uuid, badge: Badge) -> StoreResult<bool> {
        let mut users = write(&self.users)?;
        Ok(users
            .get_mut(&id)
            .map(|user| user.badges.insert(badge))
            .unwrap_or(false))
    }
}

#[async_trait]
impl MaterialStore for MemoryStore {
    async fn insert_material(&self, material: &Material) -> StoreResult<()> {
        write(&self.materials)?.insert(material.id, material.clone());
        Ok(())
    }

    async fn find_material(&self, id: Uuid) -> StoreResult<Option<Material>> {
        Ok(read(&self.materials)?.get(&id).cloned())
    }

    async fn list_materials(&self) -> StoreResult<Vec<Material>> {
        let all = read(&self.materials)?.values().cloned().collect();
        Ok(newest_first(all))
    }

    async fn list_materials_by_uploader(&self, user_id: Uuid) -> StoreResult<Vec<Material>> {
        let owned = read(&self.materials)?
            .values()
            .filter(|m| m.uploaded_by == user_id)
            .cloned()
            .collect();
        Ok(newest_first(owned))
    }

    async fn save_ratings(&self, material: &Material) -> StoreResult<()> {
        let mut materials = write(&self.materials)?;
        if let Some(stored) = materials.get_mut(&material.id) {
            stored.ratings = material.ratings.clone();
            stored.average_rating = material.average_rating;
        }
        Ok(())
    }

    async fn increment_downloads(&self, id: Uuid) -> StoreResult<Option<Material>> {
        let mut materials = write(&self.materials)?;
        Ok(materials.get_mut(&id).map(|material| {
            material.download_count += 1;
            material.clone()
        }))
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert_request(&self, request: &MaterialRequest) -> StoreResult<()> {
        write(&self.requests)?.insert(request.id, request.clone());
        Ok(())
    }

    async fn find_request(&self, id: Uuid) -> StoreResult<Option<MaterialRequest>> {
        Ok(read(&self.requests)?.get(&id).cloned())
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<MaterialRequest>> {
        let mut requests: Vec<MaterialRequest> = read(&self.requests)?
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.request_date.cmp(&a.request_date));
        Ok(requests)
    }

    async fn mark_fulfilled(
        &self,
        id: Uuid,
        material_id: Uuid,
    ) -> StoreResult<Option<MaterialRequest>> {
        let mut requests = write(&self.requests)?;
        Ok(requests.get_mut(&id).map(|request| {
            request.fulfill(material_id);
            request.clone()
        }))
    }
}
