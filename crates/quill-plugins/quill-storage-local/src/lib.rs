//! # quill-storage-local
//! Local filesystem implementation of `MediaStore`.
//!
//! Uploads land in a single flat directory; filenames embed the owner id
//! and a timestamp (avatars) or a timestamp and random suffix (post
//! images) so concurrent uploads do not collide.

use async_trait::async_trait;
use chrono::Utc;
use quill_core::error::{AppError, Result};
use quill_core::traits::MediaStore;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

pub struct LocalMediaStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/uploads")
    url_prefix: String,
}

impl LocalMediaStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix,
        }
    }

    /// Reduces a client-supplied name to its final path component.
    fn sanitize_name(name: &str) -> &str {
        Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
    }

    /// Lowercased extension of the original name, dot included.
    fn extension_of(name: &str) -> String {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_lowercase()))
            .unwrap_or_default()
    }

    async fn write(&self, filename: &str, data: &[u8]) -> Result<String> {
        fs::create_dir_all(&self.root_path)
            .await
            .map_err(|e| AppError::Internal(format!("upload dir unavailable: {e}")))?;
        let target = self.root_path.join(filename);
        fs::write(&target, data)
            .await
            .map_err(|e| AppError::Internal(format!("media write failed: {e}")))?;
        Ok(format!("{}/{}", self.url_prefix, filename))
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    /// Saves an avatar as `avatar_<owner>_<millis><ext>`.
    async fn save_avatar(&self, owner: Uuid, original_name: &str, data: Vec<u8>) -> Result<String> {
        let filename = format!(
            "avatar_{}_{}{}",
            owner,
            Utc::now().timestamp_millis(),
            Self::extension_of(original_name)
        );
        self.write(&filename, &data).await
    }

    /// Saves a post image as `<millis>-<suffix>-<original-name>`, keeping
    /// the original name for traceability.
    async fn save_post_image(&self, original_name: &str, data: Vec<u8>) -> Result<String> {
        let suffix = Uuid::new_v4().simple().to_string();
        let filename = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            &suffix[..8],
            Self::sanitize_name(original_name)
        );
        self.write(&filename, &data).await
    }
}
