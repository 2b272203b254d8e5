//! Record types for users, materials and material requests
//!
//! Records are plain typed structs. Input payloads carry a `validate()`
//! step that runs at the handler boundary before anything touches the store.

pub mod badge;
pub mod material;
pub mod request;
pub mod user;

pub use badge::{Badge, BadgeSet};
pub use material::{Material, NewMaterial, Rating};
pub use request::{MaterialRequest, NewMaterialRequest, RequestStatus};
pub use user::{ProfileUpdate, UploaderSummary, User};

use crate::error::{AppError, AppResult};

/// Reject a required text field that is empty after trimming.
pub(crate) fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
