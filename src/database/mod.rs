//! Persistence layer
//!
//! Handlers talk to a [`Store`], which bundles one trait per collection.
//! Two backends implement it:
//!
//! - [`DatabasePool`]: PostgreSQL via sqlx
//! - [`MemoryStore`]: in-process maps, used when PostgreSQL is disabled and in tests
//!
//! Every method is a single query or update. Sequences of calls are not
//! transactional with each other.

pub mod materials;
pub mod memory;
pub mod pool;
pub mod requests;
pub mod users;

pub use memory::MemoryStore;
pub use pool::DatabasePool;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Badge, Material, MaterialRequest, ProfileUpdate, RequestStatus, User};

#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique field (username, email) is already taken
    #[error("{0} already exists")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with [`StoreError::Duplicate`] when the
    /// username or email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// First user whose username or email matches
    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> StoreResult<Option<User>>;

    /// Returns the updated user, or `None` if it does not exist
    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> StoreResult<Option<User>>;

    /// Atomic increment. Returns false if the user does not exist.
    async fn add_contribution_points(&self, id: Uuid, points: u64) -> StoreResult<bool>;

    /// Set-semantics add. Returns true only if the badge was newly added.
    async fn add_badge(&self, id: Uuid, badge: Badge) -> StoreResult<bool>;
}

#[async_trait]
pub trait MaterialStore: Send + Sync {
    async fn insert_material(&self, material: &Material) -> StoreResult<()>;

    async fn find_material(&self, id: Uuid) -> StoreResult<Option<Material>>;

    /// All materials, newest upload first
    async fn list_materials(&self) -> StoreResult<Vec<Material>>;

    /// Materials uploaded by one user, newest upload first
    async fn list_materials_by_uploader(&self, user_id: Uuid) -> StoreResult<Vec<Material>>;

    /// Overwrite the ratings and average rating of an existing material
    async fn save_ratings(&self, material: &Material) -> StoreResult<()>;

    /// Atomic increment. Returns the updated material, or `None` if missing.
    async fn increment_downloads(&self, id: Uuid) -> StoreResult<Option<Material>>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert_request(&self, request: &MaterialRequest) -> StoreResult<()>;

    async fn find_request(&self, id: Uuid) -> StoreResult<Option<MaterialRequest>>;

    /// Requests newest first, optionally filtered by status
    async fn list_requests(&self, status: Option<RequestStatus>)
    -> StoreResult<Vec<MaterialRequest>>;

    /// Mark a request fulfilled by `material_id`, whatever its current
    /// status. Returns `None` if the request does not exist.
    async fn mark_fulfilled(
        &self,
        id: Uuid,
        material_id: Uuid,
    ) -> StoreResult<Option<MaterialRequest>>;
}

/// Everything the handlers need from persistence
pub trait Store: UserStore + MaterialStore + RequestStore {}

impl<T: UserStore + MaterialStore + RequestStore> Store for T {}
