/**
 * Routes Module
 * API route handlers
 */

pub mod admin;
pub mod auth;
pub mod contact;
pub mod health;
pub mod projects;

use serde::{Deserialize, Serialize};

/// Error body for malformed requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: Some(message.into()),
        }
    }
}
