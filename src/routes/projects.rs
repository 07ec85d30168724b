/**
 * Public Project Routes
 * Read-only project listing for the portfolio pages
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::models::{ListQuery, Project};
use crate::state::AppState;

/// Number of projects shown on the landing page.
pub const FEATURED_COUNT: usize = 3;

/// A failed fetch is reported in `error` next to an empty list.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

async fn fetch(state: &AppState, query: ListQuery) -> ProjectListResponse {
    match state.gateway.projects.list(query).await {
        Ok(projects) => ProjectListResponse {
            projects,
            error: None,
        },
        Err(e) => {
            tracing::error!(error = %e, "failed to fetch projects");
            ProjectListResponse {
                projects: Vec::new(),
                error: Some("Failed to fetch projects".to_string()),
            }
        }
    }
}

/// GET /api/projects - Every project, newest first
pub async fn list_projects(State(state): State<AppState>) -> impl IntoResponse {
    let response = fetch(&state, ListQuery::newest_first()).await;
    (StatusCode::OK, Json(response))
}

/// GET /api/projects/featured - The oldest few projects, oldest first
pub async fn featured_projects(State(state): State<AppState>) -> impl IntoResponse {
    let response = fetch(&state, ListQuery::oldest_first(FEATURED_COUNT)).await;
    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::gateway::memory::MemoryGateway;
    use crate::gateway::{AdminUser, Gateway, ProjectStore};
    use crate::models::ProjectRecord;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn seeded(titles: &[&str]) -> AppState {
        let memory = Arc::new(MemoryGateway::new("project-images"));
        let token = memory
            .issue_token(AdminUser {
                id: "admin".into(),
                email: None,
            })
            .await;
        for title in titles {
            let record = ProjectRecord {
                title: title.to_string(),
                description: "d".into(),
                image_url: "/img.png".into(),
                tech_stack: vec![],
                github_url: None,
                live_url: None,
            };
            ProjectStore::insert(memory.as_ref(), &record, Some(&token))
                .await
                .unwrap();
        }
        let gateway = Gateway {
            projects: memory.clone(),
            messages: memory.clone(),
            images: memory.clone(),
            auth: memory,
        };
        AppState::new(AppConfig::default(), gateway)
    }

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/api/projects", get(list_projects))
            .route("/api/projects/featured", get(featured_projects))
            .with_state(state)
    }

    fn unreachable_router() -> Router {
        let mut gateway = Gateway::in_memory(MemoryGateway::new("project-images"));
        gateway.projects = Arc::new(crate::gateway::fixtures::UnreachableProjects);
        test_router(AppState::new(AppConfig::default(), gateway))
    }

    async fn get_list(app: Router, uri: &str) -> ProjectListResponse {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn titles(response: &ProjectListResponse) -> Vec<&str> {
        response.projects.iter().map(|p| p.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let state = seeded(&["A", "B", "C"]).await;
        let body = get_list(test_router(state), "/api/projects").await;
        assert_eq!(titles(&body), ["C", "B", "A"]);
        assert!(body.error.is_none());
    }

    #[tokio::test]
    async fn test_featured_is_three_oldest() {
        let state = seeded(&["A", "B", "C", "D"]).await;
        let body = get_list(test_router(state), "/api/projects/featured").await;
        assert_eq!(titles(&body), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_empty_list_with_error() {
        for uri in ["/api/projects", "/api/projects/featured"] {
            let body = get_list(unreachable_router(), uri).await;
            assert!(body.projects.is_empty(), "{}", uri);
            assert_eq!(body.error.as_deref(), Some("Failed to fetch projects"));
        }
    }

    #[tokio::test]
    async fn test_empty_store_is_empty_list() {
        let state = seeded(&[]).await;
        let body = get_list(test_router(state), "/api/projects").await;
        assert!(body.projects.is_empty());
    }
}
