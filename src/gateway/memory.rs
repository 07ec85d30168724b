//! In-process backend used when no hosted service is configured, and by tests.
//!
//! Mirrors the hosted service's row-level rules: anyone may read projects and
//! submit contact messages, every other call needs a signed-in admin token.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AccessToken, AdminUser, AuthProvider, AuthSession, GatewayError, ImageStorage, ImageUpload,
    MessageStore, ProjectStore,
};
use crate::models::{
    ContactMessage, ListQuery, NewContactMessage, Project, ProjectRecord, RecordId, SortOrder,
};

/// Metadata of an uploaded object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub content_type: String,
    pub size: usize,
}

#[derive(Default)]
struct MemoryState {
    projects: Vec<Project>,
    messages: Vec<ContactMessage>,
    objects: HashMap<String, StoredObject>,
    sessions: HashMap<String, AdminUser>,
    last_created_at: Option<DateTime<Utc>>,
}

impl MemoryState {
    /// Strictly increasing so `created_at` ordering is total.
    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_created_at {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(next);
        next
    }

    fn authorize(&self, token: Option<&AccessToken>) -> Result<&AdminUser, GatewayError> {
        token
            .and_then(|t| self.sessions.get(t.as_str()))
            .ok_or(GatewayError::Unauthorized)
    }
}

fn ordered<T: Clone>(
    items: &[T],
    created_at: impl Fn(&T) -> DateTime<Utc>,
    query: ListQuery,
) -> Vec<T> {
    let mut out = items.to_vec();
    out.sort_by_key(|item| created_at(item));
    if query.order == SortOrder::Descending {
        out.reverse();
    }
    if let Some(limit) = query.limit {
        out.truncate(limit);
    }
    out
}

pub struct MemoryGateway {
    bucket: String,
    admin_credentials: Option<(String, String)>,
    state: RwLock<MemoryState>,
}

impl MemoryGateway {
    pub fn new(bucket: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            admin_credentials: None,
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Dev sign-in uses ADMIN_EMAIL / ADMIN_PASSWORD.
    pub fn from_env(bucket: &str) -> Self {
        let email =
            std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
        let password = std::env::var("ADMIN_PASSWORD")
            .ok()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "admin123".to_string());
        Self::new(bucket).with_admin(&email, &password)
    }

    pub fn with_admin(mut self, email: &str, password: &str) -> Self {
        self.admin_credentials = Some((email.to_lowercase(), password.to_string()));
        self
    }

    /// Registers a session directly, bypassing sign-in.
    pub async fn issue_token(&self, user: AdminUser) -> AccessToken {
        let token = Uuid::new_v4().simple().to_string();
        self.state
            .write()
            .await
            .sessions
            .insert(token.clone(), user);
        AccessToken::new(token)
    }

    pub async fn object(&self, key: &str) -> Option<StoredObject> {
        self.state.read().await.objects.get(key).cloned()
    }

    /// Keys of every uploaded object, sorted.
    pub async fn object_keys(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut keys: Vec<String> = state.objects.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ProjectStore for MemoryGateway {
    async fn list(&self, query: ListQuery) -> Result<Vec<Project>, GatewayError> {
        let state = self.state.read().await;
        Ok(ordered(&state.projects, |p| p.created_at, query))
    }

    async fn insert(
        &self,
        record: &ProjectRecord,
        token: Option<&AccessToken>,
    ) -> Result<Project, GatewayError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;

        let project = Project {
            id: RecordId::new(Uuid::new_v4().to_string()),
            title: record.title.clone(),
            description: record.description.clone(),
            image_url: record.image_url.clone(),
            tech_stack: record.tech_stack.clone(),
            github_url: record.github_url.clone(),
            live_url: record.live_url.clone(),
            created_at: state.next_created_at(),
        };
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn update(
        &self,
        id: &RecordId,
        record: &ProjectRecord,
        token: Option<&AccessToken>,
    ) -> Result<Project, GatewayError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;

        let project = state
            .projects
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| GatewayError::NotFound(id.clone()))?;
        project.title = record.title.clone();
        project.description = record.description.clone();
        project.image_url = record.image_url.clone();
        project.tech_stack = record.tech_stack.clone();
        project.github_url = record.github_url.clone();
        project.live_url = record.live_url.clone();
        Ok(project.clone())
    }

    async fn delete(
        &self,
        id: &RecordId,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;

        // Deleting a missing row is not an error for the hosted service either.
        state.projects.retain(|p| &p.id != id);
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryGateway {
    async fn list(
        &self,
        query: ListQuery,
        token: Option<&AccessToken>,
    ) -> Result<Vec<ContactMessage>, GatewayError> {
        let state = self.state.read().await;
        state.authorize(token)?;
        Ok(ordered(&state.messages, |m| m.created_at, query))
    }

    async fn insert(
        &self,
        message: &NewContactMessage,
        _token: Option<&AccessToken>,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        let row = ContactMessage {
            id: RecordId::new(Uuid::new_v4().to_string()),
            name: message.name.clone(),
            email: message.email.clone(),
            message: message.message.clone(),
            created_at: state.next_created_at(),
        };
        state.messages.push(row);
        Ok(())
    }

    async fn delete(
        &self,
        id: &RecordId,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;
        state.messages.retain(|m| &m.id != id);
        Ok(())
    }
}

#[async_trait]
impl ImageStorage for MemoryGateway {
    async fn upload(
        &self,
        image: &ImageUpload,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.write().await;
        state.authorize(token)?;

        if state.objects.contains_key(&image.key) {
            return Err(GatewayError::Status {
                status: 409,
                body: "The resource already exists".to_string(),
            });
        }
        state.objects.insert(
            image.key.clone(),
            StoredObject {
                content_type: image.content_type.clone(),
                size: image.bytes.len(),
            },
        );
        tracing::debug!(
            key = %image.key,
            content_type = %image.content_type,
            size = image.bytes.len(),
            "stored object in memory"
        );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("/storage/v1/object/public/{}/{}", self.bucket, key)
    }
}

#[async_trait]
impl AuthProvider for MemoryGateway {
    async fn current_user(&self, token: &AccessToken) -> Result<AdminUser, GatewayError> {
        let state = self.state.read().await;
        state.authorize(Some(token)).cloned()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, GatewayError> {
        let matches = self
            .admin_credentials
            .as_ref()
            .is_some_and(|(e, p)| *e == email.to_lowercase() && p == password);
        if !matches {
            return Err(GatewayError::Status {
                status: 400,
                body: "Invalid login credentials".to_string(),
            });
        }

        let user = AdminUser {
            id: "memory-admin".to_string(),
            email: Some(email.to_lowercase()),
        };
        let access_token = self.issue_token(user.clone()).await;
        Ok(AuthSession {
            access_token,
            refresh_token: None,
            expires_in: None,
            user,
        })
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), GatewayError> {
        self.state.write().await.sessions.remove(token.as_str());
        Ok(())
    }
}
