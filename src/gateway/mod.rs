/*!
 * Backend Gateway
 * Contracts for the hosted service: two tables, one bucket and session auth
 */
pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error;

use crate::config::AppConfig;
use crate::models::{
    ContactMessage, ListQuery, NewContactMessage, Project, ProjectRecord, RecordId,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("backend service unreachable: {0}")]
    Transport(String),

    #[error("backend service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response from backend service: {0}")]
    Decode(String),

    #[error("record {0} not found")]
    NotFound(RecordId),

    #[error("not authenticated")]
    Unauthorized,

    #[error("invalid gateway configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else {
            GatewayError::Transport(e.to_string())
        }
    }
}

/// Bearer token for a signed-in admin.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print the token itself.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// The signed-in user as reported by the auth service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens returned by a password sign-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: AccessToken,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: AdminUser,
}

/// Image bytes selected for upload
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub key: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// `projects` table. Writes carry the admin token; `None` means anonymous.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list(&self, query: ListQuery) -> Result<Vec<Project>, GatewayError>;

    async fn insert(
        &self,
        record: &ProjectRecord,
        token: Option<&AccessToken>,
    ) -> Result<Project, GatewayError>;

    async fn update(
        &self,
        id: &RecordId,
        record: &ProjectRecord,
        token: Option<&AccessToken>,
    ) -> Result<Project, GatewayError>;

    async fn delete(&self, id: &RecordId, token: Option<&AccessToken>)
        -> Result<(), GatewayError>;
}

/// `contact_messages` table
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn list(
        &self,
        query: ListQuery,
        token: Option<&AccessToken>,
    ) -> Result<Vec<ContactMessage>, GatewayError>;

    /// Write-only: anonymous callers may insert but not read rows back.
    async fn insert(
        &self,
        message: &NewContactMessage,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError>;

    async fn delete(&self, id: &RecordId, token: Option<&AccessToken>)
        -> Result<(), GatewayError>;
}

/// `project-images` bucket
#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn upload(
        &self,
        image: &ImageUpload,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError>;

    /// Public URL of an object. Computed locally, no I/O.
    fn public_url(&self, key: &str) -> String;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self, token: &AccessToken) -> Result<AdminUser, GatewayError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, GatewayError>;

    async fn sign_out(&self, token: &AccessToken) -> Result<(), GatewayError>;
}

/// Handles to every external contract, shared across requests.
#[derive(Clone)]
pub struct Gateway {
    pub projects: Arc<dyn ProjectStore>,
    pub messages: Arc<dyn MessageStore>,
    pub images: Arc<dyn ImageStorage>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Gateway {
    /// Supabase when credentials are configured, in-memory otherwise.
    pub fn from_config(config: &AppConfig) -> Result<Self, GatewayError> {
        match &config.service {
            Some(service) => {
                tracing::info!(url = %service.url, "using hosted backend service");
                let client = supabase::SupabaseGateway::new(
                    service,
                    &config.projects_table,
                    &config.messages_table,
                    &config.images_bucket,
                )?;
                Ok(Self::from_shared(Arc::new(client)))
            }
            None => {
                tracing::info!(
                    "SUPABASE_URL / SUPABASE_ANON_KEY not set. Using in-memory backend."
                );
                Ok(Self::in_memory(memory::MemoryGateway::from_env(
                    &config.images_bucket,
                )))
            }
        }
    }

    pub fn in_memory(gateway: memory::MemoryGateway) -> Self {
        Self::from_shared(Arc::new(gateway))
    }

    fn from_shared<G>(gateway: Arc<G>) -> Self
    where
        G: ProjectStore + MessageStore + ImageStorage + AuthProvider + 'static,
    {
        Self {
            projects: gateway.clone(),
            messages: gateway.clone(),
            images: gateway.clone(),
            auth: gateway,
        }
    }

    /// Cheapest round trip that touches the service.
    pub async fn ping(&self) -> Result<std::time::Duration, GatewayError> {
        let start = std::time::Instant::now();
        self.projects
            .list(ListQuery {
                limit: Some(1),
                ..ListQuery::default()
            })
            .await?;
        Ok(start.elapsed())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Project table that never answers.
    pub struct UnreachableProjects;

    fn refused() -> GatewayError {
        GatewayError::Transport("connection refused".into())
    }

    #[async_trait]
    impl ProjectStore for UnreachableProjects {
        async fn list(&self, _query: ListQuery) -> Result<Vec<Project>, GatewayError> {
            Err(refused())
        }

        async fn insert(
            &self,
            _record: &ProjectRecord,
            _token: Option<&AccessToken>,
        ) -> Result<Project, GatewayError> {
            Err(refused())
        }

        async fn update(
            &self,
            _id: &RecordId,
            _record: &ProjectRecord,
            _token: Option<&AccessToken>,
        ) -> Result<Project, GatewayError> {
            Err(refused())
        }

        async fn delete(
            &self,
            _id: &RecordId,
            _token: Option<&AccessToken>,
        ) -> Result<(), GatewayError> {
            Err(refused())
        }
    }
}
