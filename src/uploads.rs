//! Local disk storage for uploaded material files
//!
//! Files land in one flat directory as `<unix-millis>-<sanitized name>` and
//! are served back under [`UPLOAD_URL_PREFIX`].

use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

pub const UPLOAD_URL_PREFIX: &str = "/uploads";

const FALLBACK_NAME: &str = "file";
const MAX_NAME_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it is missing
    pub async fn ensure_dir(&self) -> AppResult<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create upload directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        info!(dir = %self.dir.display(), "Upload directory ready");
        Ok(())
    }

    /// Write `bytes` to disk and return the public URL of the stored file
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> AppResult<String> {
        let stored_name = format!(
            "{}-{}",
            Utc::now().timestamp_millis(),
            sanitize_filename(original_name)
        );
        let path = self.dir.join(&stored_name);

        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AppError::Internal(format!("Failed to store upload {}: {}", stored_name, e))
        })?;

        debug!(file = %stored_name, size = bytes.len(), "Upload stored");
        Ok(format!("{}/{}", UPLOAD_URL_PREFIX, stored_name))
    }
}

/// Reduce a client-supplied filename to a safe single path component.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
