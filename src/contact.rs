//! Public contact form submission: non-empty check, then a single insert.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gateway::{Gateway, GatewayError};
use crate::models::NewContactMessage;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ContactError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ContactForm {
    pub fn validate(&self) -> Result<NewContactMessage, ContactError> {
        for (field, value) in [
            ("Name", &self.name),
            ("Email", &self.email),
            ("Message", &self.message),
        ] {
            if value.trim().is_empty() {
                return Err(ContactError::MissingField(field));
            }
        }

        Ok(NewContactMessage {
            name: self.name.clone(),
            email: self.email.clone(),
            message: self.message.clone(),
        })
    }
}

/// One anonymous insert per call; no dedup, no queuing. Nothing is read
/// back, visitors cannot see the inbox.
pub async fn submit(gateway: &Gateway, form: &ContactForm) -> Result<(), ContactError> {
    let message = form.validate()?;
    gateway.messages.insert(&message, None).await.map_err(|e| {
        tracing::error!(error = %e, "failed to store contact message");
        e
    })?;
    tracing::info!("contact message received");
    Ok(())
}
