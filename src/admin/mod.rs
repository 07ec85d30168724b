/*!
 * Admin Area
 * Page-instance state for the project and message managers, plus the
 * session guard in front of them
 */
pub mod images;
pub mod messages;
pub mod projects;
pub mod session;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::models::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Transient notification shown to the admin after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Explicit answer to "are you sure?" before a destructive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Title is required")]
    MissingTitle,
    #[error("Description is required")]
    MissingDescription,
    #[error("Project image is required")]
    MissingImage,
    #[error("No project form is open")]
    FormClosed,
    #[error("Empty file")]
    EmptyImage,
    #[error("File too large. Maximum size is {max_bytes} bytes.")]
    ImageTooLarge { max_bytes: usize },
    #[error("Unsupported file type. Allowed: JPEG, PNG, WebP, GIF.")]
    UnsupportedImageType,
    #[error("Invalid file name")]
    InvalidFileName,
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("image upload failed: {0}")]
    Upload(#[source] GatewayError),

    #[error("save failed: {0}")]
    Persist(#[source] GatewayError),

    #[error("delete failed: {0}")]
    Delete(#[source] GatewayError),

    #[error("record {0} not found")]
    NotFound(RecordId),

    #[error("deletion was not confirmed")]
    Unconfirmed,
}
