use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::require;
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    Open,
    Fulfilled,
    /// Terminal; only reachable through administrative action
    Closed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Open => "Open",
            RequestStatus::Fulfilled => "Fulfilled",
            RequestStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Open" => Ok(RequestStatus::Open),
            "Fulfilled" => Ok(RequestStatus::Fulfilled),
            "Closed" => Ok(RequestStatus::Closed),
            other => Err(format!("Unknown request status: {}", other)),
        }
    }
}

/// A user's ask for educational content, fulfillable by a material
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialRequest {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub subject: String,
    pub education_level: String,
    pub requested_by: Uuid,
    pub status: RequestStatus,
    pub fulfillment_material: Option<Uuid>,
    pub request_date: DateTime<Utc>,
}

impl MaterialRequest {
    pub fn fulfill(&mut self, material_id: Uuid) {
        self.status = RequestStatus::Fulfilled;
        self.fulfillment_material = Some(material_id);
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaterialRequest {
    pub title: String,
    pub description: String,
    pub subject: String,
    pub education_level: String,
}

impl NewMaterialRequest {
    pub fn validate(&self) -> AppResult<()> {
        require("title", &self.title)?;
        require("description", &self.description)?;
        require("subject", &self.subject)?;
        require("educationLevel", &self.education_level)?;
        Ok(())
    }

    pub fn into_request(self, requested_by: Uuid) -> MaterialRequest {
        MaterialRequest {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            subject: self.subject,
            education_level: self.education_level,
            requested_by,
            status: RequestStatus::Open,
            fulfillment_material: None,
            request_date: Utc::now(),
        }
    }
}
