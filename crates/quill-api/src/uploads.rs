//! Multipart ingestion shared by the avatar and post-image pipelines.
//!
//! Fields are buffered in memory; nothing touches disk until the caller
//! has validated the upload, so a rejected attempt persists no bytes.

use actix_multipart::Multipart;
use futures_util::TryStreamExt;
use quill_core::error::AppError;
use std::collections::HashMap;

use crate::error::ApiError;

/// Avatar uploads: image types only, capped at 3 MiB.
pub const AVATAR_MAX_BYTES: usize = 3 * 1024 * 1024;
pub const AVATAR_ALLOWED_TYPES: [&str; 5] = [
    "image/png",
    "image/jpeg",
    "image/jpg",
    "image/gif",
    "image/webp",
];

pub struct UploadedFile {
    /// The multipart field name this file arrived under
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// A parsed multipart form: plain text fields plus any uploaded files.
#[derive(Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<UploadedFile>,
}

impl FormData {
    /// Removes and returns the file uploaded under `field`, if any.
    pub fn take_file(&mut self, field: &str) -> Option<UploadedFile> {
        let idx = self.files.iter().position(|f| f.field == field)?;
        Some(self.files.remove(idx))
    }
}

fn bad_upload(e: actix_multipart::MultipartError) -> ApiError {
    ApiError(AppError::ValidationError(format!("invalid upload: {e}")))
}

/// Drains a multipart payload into memory. File parts larger than
/// `max_file_bytes` abort the whole request with a validation error.
pub async fn read_form(
    payload: &mut Multipart,
    max_file_bytes: Option<usize>,
) -> Result<FormData, ApiError> {
    let mut form = FormData::default();

    while let Some(mut field) = payload.try_next().await.map_err(bad_upload)? {
        let (name, filename) = {
            let disposition = field.content_disposition();
            (
                disposition.get_name().unwrap_or_default().to_string(),
                disposition.get_filename().map(str::to_string),
            )
        };
        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .unwrap_or_default();

        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_upload)? {
            if let (Some(max), Some(_)) = (max_file_bytes, &filename) {
                if data.len() + chunk.len() > max {
                    return Err(ApiError(AppError::ValidationError(
                        "File too large".to_string(),
                    )));
                }
            }
            data.extend_from_slice(&chunk);
        }

        match filename {
            Some(filename) => form.files.push(UploadedFile {
                field: name,
                filename,
                content_type,
                data,
            }),
            None => {
                form.fields
                    .insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
    }

    Ok(form)
}

/// Splits a comma-separated field into trimmed entries; empty or missing
/// input yields an empty vec, not `[""]`.
pub fn split_csv(input: Option<String>) -> Vec<String> {
    match input {
        Some(s) if !s.trim().is_empty() => s.split(',').map(|t| t.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}
