//! Staged project images: checked locally, uploaded on save.

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::ValidationError;
use crate::gateway::ImageUpload;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: RIFF .... WEBP
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// A locally selected image, not yet uploaded.
#[derive(Debug, Clone)]
pub struct StagedImage {
    file_name: String,
    content_type: &'static str,
    bytes: Bytes,
}

impl StagedImage {
    pub fn new(file_name: &str, bytes: Bytes, max_bytes: usize) -> Result<Self, ValidationError> {
        let file_name = file_name.trim();
        if !is_safe_file_name(file_name) {
            return Err(ValidationError::InvalidFileName);
        }

        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(ValidationError::UnsupportedImageType);
        }

        if bytes.is_empty() {
            return Err(ValidationError::EmptyImage);
        }
        if bytes.len() > max_bytes {
            return Err(ValidationError::ImageTooLarge { max_bytes });
        }

        let content_type =
            sniff_image_type(&bytes).ok_or(ValidationError::UnsupportedImageType)?;

        Ok(Self {
            file_name: file_name.to_string(),
            content_type,
            bytes,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        self.content_type
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Timestamp-prefixed object key so repeated uploads of one file never collide.
    pub fn object_key(&self) -> String {
        format!("{}-{}", Utc::now().timestamp_millis(), self.file_name)
    }

    pub(crate) fn to_upload(&self, key: String) -> ImageUpload {
        ImageUpload {
            key,
            content_type: self.content_type.to_string(),
            bytes: self.bytes.clone(),
        }
    }

    pub fn preview(&self) -> ImagePreview {
        ImagePreview::Staged {
            file_name: self.file_name.clone(),
            content_type: self.content_type.to_string(),
            size: self.bytes.len(),
        }
    }
}

/// What the form shows in its image slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImagePreview {
    /// Image already stored, kept unless replaced.
    Existing { url: String },
    /// Local file waiting for upload.
    Staged {
        file_name: String,
        content_type: String,
        size: usize,
    },
}
