use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::require;
use super::user::UploaderSummary;
use crate::error::AppResult;

/// One user's rating of a material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub user: Uuid,
    pub value: u8,
}

/// Uploaded educational resource.
///
/// `U` is the uploader reference: a bare id as stored, or an
/// [`UploaderSummary`] once populated for listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Material<U = Uuid> {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub file_url: String,
    pub subject: String,
    pub education_level: String,
    pub uploaded_by: U,
    pub ratings: Vec<Rating>,
    pub average_rating: f64,
    pub download_count: u64,
    pub upload_date: DateTime<Utc>,
}

impl Material {
    /// Swap the uploader id for its summary. `None` when the uploader no
    /// longer exists.
    pub fn populate(self, uploader: Option<UploaderSummary>) -> Material<Option<UploaderSummary>> {
        Material {
            id: self.id,
            title: self.title,
            description: self.description,
            file_url: self.file_url,
            subject: self.subject,
            education_level: self.education_level,
            uploaded_by: uploader,
            ratings: self.ratings,
            average_rating: self.average_rating,
            download_count: self.download_count,
            upload_date: self.upload_date,
        }
    }
}

/// Fields supplied when publishing a material
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewMaterial {
    pub title: String,
    pub description: String,
    pub file_url: String,
    pub subject: String,
    pub education_level: String,
}

impl NewMaterial {
    pub fn validate(&self) -> AppResult<()> {
        require("title", &self.title)?;
        require("description", &self.description)?;
        require("subject", &self.subject)?;
        require("educationLevel", &self.education_level)?;
        Ok(())
    }

    /// A file location is required too, but it may only be known after the
    /// upload has been written.
    pub fn validate_file_url(&self) -> AppResult<()> {
        require("fileUrl", &self.file_url)
    }

    pub fn into_material(self, uploaded_by: Uuid) -> Material {
        Material {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            file_url: self.file_url,
            subject: self.subject,
            education_level: self.education_level,
            uploaded_by,
            ratings: Vec::new(),
            average_rating: 0.0,
            download_count: 0,
            upload_date: Utc::now(),
        }
    }
}
