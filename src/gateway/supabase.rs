//! Supabase-compatible REST client: PostgREST rows, Storage objects, GoTrue auth.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;

use super::{
    AccessToken, AdminUser, AuthProvider, AuthSession, GatewayError, ImageStorage, ImageUpload,
    MessageStore, ProjectStore,
};
use crate::config::ServiceConfig;
use crate::models::{
    ContactMessage, ListQuery, NewContactMessage, Project, ProjectRecord, RecordId, SortOrder,
};

pub struct SupabaseGateway {
    client: Client,
    base_url: Url,
    anon_key: String,
    projects_table: String,
    messages_table: String,
    bucket: String,
}

impl SupabaseGateway {
    pub fn new(
        service: &ServiceConfig,
        projects_table: &str,
        messages_table: &str,
        bucket: &str,
    ) -> Result<Self, GatewayError> {
        let base_url = Url::parse(&service.url)
            .map_err(|e| GatewayError::Config(format!("SUPABASE_URL: {}", e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Config(
                "SUPABASE_URL must be an http(s) URL".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(service.timeout)
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            anon_key: service.anon_key.clone(),
            projects_table: projects_table.to_string(),
            messages_table: messages_table.to_string(),
            bucket: bucket.to_string(),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn table_url(&self, table: &str) -> Url {
        self.url(&["rest", "v1", table])
    }

    /// Every call carries the anon key; the bearer is the admin token when
    /// one is given, the anon key otherwise.
    fn authorize(&self, builder: RequestBuilder, token: Option<&AccessToken>) -> RequestBuilder {
        let bearer = token.map(AccessToken::as_str).unwrap_or(&self.anon_key);
        builder.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    async fn send(&self, builder: RequestBuilder, op: &str) -> Result<reqwest::Response, GatewayError> {
        let response = builder.send().await.map_err(|e| {
            tracing::error!(op = %op, error = %e, "backend request failed");
            GatewayError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(op = %op, status = %status, body = %body, "backend returned error");
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(GatewayError::Unauthorized);
            }
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        op: &str,
    ) -> Result<T, GatewayError> {
        let response = self.send(builder, op).await?;
        response.json::<T>().await.map_err(|e| {
            tracing::error!(op = %op, error = %e, "failed to decode backend response");
            GatewayError::Decode(e.to_string())
        })
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: ListQuery,
        token: Option<&AccessToken>,
    ) -> Result<Vec<T>, GatewayError> {
        let builder = self
            .client
            .get(self.table_url(table))
            .query(&list_params(query));
        self.send_json(self.authorize(builder, token), "select").await
    }

    /// Writes ask for the affected rows back.
    async fn write_returning<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        token: Option<&AccessToken>,
        op: &str,
    ) -> Result<Vec<T>, GatewayError> {
        let builder = builder.header("Prefer", "return=representation");
        self.send_json(self.authorize(builder, token), op).await
    }

    async fn delete_by_id(
        &self,
        table: &str,
        id: &RecordId,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError> {
        let builder = self
            .client
            .delete(self.table_url(table))
            .query(&[("id", eq(id))])
            .header("Prefer", "return=minimal");
        self.send(self.authorize(builder, token), "delete").await?;
        Ok(())
    }
}

fn eq(id: &RecordId) -> String {
    format!("eq.{}", id)
}

fn list_params(query: ListQuery) -> Vec<(&'static str, String)> {
    let order = match query.order {
        SortOrder::Ascending => "created_at.asc",
        SortOrder::Descending => "created_at.desc",
    };
    let mut params = vec![("select", "*".to_string()), ("order", order.to_string())];
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

fn first_row<T>(rows: Vec<T>, op: &str) -> Result<T, GatewayError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| GatewayError::Decode(format!("{} returned no rows", op)))
}

#[async_trait]
impl ProjectStore for SupabaseGateway {
    async fn list(&self, query: ListQuery) -> Result<Vec<Project>, GatewayError> {
        self.select(&self.projects_table, query, None).await
    }

    async fn insert(
        &self,
        record: &ProjectRecord,
        token: Option<&AccessToken>,
    ) -> Result<Project, GatewayError> {
        let builder = self
            .client
            .post(self.table_url(&self.projects_table))
            .json(&[record]);
        let rows = self.write_returning(builder, token, "insert project").await?;
        first_row(rows, "insert project")
    }

    async fn update(
        &self,
        id: &RecordId,
        record: &ProjectRecord,
        token: Option<&AccessToken>,
    ) -> Result<Project, GatewayError> {
        let builder = self
            .client
            .patch(self.table_url(&self.projects_table))
            .query(&[("id", eq(id))])
            .json(record);
        let rows: Vec<Project> = self.write_returning(builder, token, "update project").await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| GatewayError::NotFound(id.clone()))
    }

    async fn delete(
        &self,
        id: &RecordId,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError> {
        self.delete_by_id(&self.projects_table, id, token).await
    }
}

#[async_trait]
impl MessageStore for SupabaseGateway {
    async fn list(
        &self,
        query: ListQuery,
        token: Option<&AccessToken>,
    ) -> Result<Vec<ContactMessage>, GatewayError> {
        self.select(&self.messages_table, query, token).await
    }

    async fn insert(
        &self,
        message: &NewContactMessage,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError> {
        let builder = self
            .client
            .post(self.table_url(&self.messages_table))
            .header("Prefer", "return=minimal")
            .json(&[message]);
        self.send(self.authorize(builder, token), "insert message")
            .await?;
        Ok(())
    }

    async fn delete(
        &self,
        id: &RecordId,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError> {
        self.delete_by_id(&self.messages_table, id, token).await
    }
}

#[async_trait]
impl ImageStorage for SupabaseGateway {
    async fn upload(
        &self,
        image: &ImageUpload,
        token: Option<&AccessToken>,
    ) -> Result<(), GatewayError> {
        let builder = self
            .client
            .post(self.url(&["storage", "v1", "object", self.bucket.as_str(), image.key.as_str()]))
            .header(header::CONTENT_TYPE, &image.content_type)
            .header("x-upsert", "false")
            .body(image.bytes.clone());
        self.send(self.authorize(builder, token), "upload").await?;
        tracing::info!(key = %image.key, size = image.bytes.len(), "image uploaded");
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        self.url(&["storage", "v1", "object", "public", self.bucket.as_str(), key])
            .to_string()
    }
}

#[async_trait]
impl AuthProvider for SupabaseGateway {
    async fn current_user(&self, token: &AccessToken) -> Result<AdminUser, GatewayError> {
        let builder = self.client.get(self.url(&["auth", "v1", "user"]));
        self.send_json(self.authorize(builder, Some(token)), "current user")
            .await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, GatewayError> {
        let builder = self
            .client
            .post(self.url(&["auth", "v1", "token"]))
            .query(&[("grant_type", "password")])
            .json(&serde_json::json!({ "email": email, "password": password }));
        self.send_json(self.authorize(builder, None), "sign in").await
    }

    async fn sign_out(&self, token: &AccessToken) -> Result<(), GatewayError> {
        let builder = self.client.post(self.url(&["auth", "v1", "logout"]));
        self.send(self.authorize(builder, Some(token)), "sign out")
            .await?;
        Ok(())
    }
}
