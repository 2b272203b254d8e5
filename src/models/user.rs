use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::badge::{Badge, BadgeSet};
use super::require;
use crate::error::{AppError, AppResult};

/// Registered account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub profile_picture: String,
    pub bio: String,
    pub badges: BadgeSet,
    pub contribution_points: u64,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// New accounts start with the Beginner badge and no points.
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            profile_picture: String::new(),
            bio: String::new(),
            badges: [Badge::Beginner].into_iter().collect(),
            contribution_points: 0,
            date_joined: Utc::now(),
        }
    }

    pub fn apply_update(&mut self, update: &ProfileUpdate) {
        if let Some(username) = &update.username {
            self.username = username.clone();
        }
        if let Some(email) = &update.email {
            self.email = email.clone();
        }
        if let Some(picture) = &update.profile_picture {
            self.profile_picture = picture.clone();
        }
        if let Some(bio) = &update.bio {
            self.bio = bio.clone();
        }
    }
}

/// Editable profile fields. Anything else in the body (password, badges,
/// points) is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// Trim the login identifiers the same way registration does.
    pub fn normalized(mut self) -> Self {
        self.username = self.username.map(|u| u.trim().to_string());
        self.email = self.email.map(|e| e.trim().to_string());
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if let Some(username) = &self.username {
            require("username", username)?;
        }
        if let Some(email) = &self.email {
            require("email", email)?;
            if !email.contains('@') {
                return Err(AppError::Validation("email is invalid".to_string()));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.profile_picture.is_none()
            && self.bio.is_none()
    }
}

/// Uploader fields embedded in material listings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub username: String,
    pub profile_picture: String,
    pub badges: BadgeSet,
}

impl From<&User> for UploaderSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            profile_picture: user.profile_picture.clone(),
            badges: user.badges.clone(),
        }
    }
}
