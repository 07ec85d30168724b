/**
 * Contact Routes
 * Public contact form endpoint
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::contact::{self, ContactError, ContactForm};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/contact - Store one message for the admin inbox
pub async fn submit_message(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> impl IntoResponse {
    match contact::submit(&state.gateway, &form).await {
        Ok(_) => (
            StatusCode::CREATED,
            Json(ContactResponse {
                success: true,
                message: "Message sent successfully!".to_string(),
            }),
        ),
        Err(e @ ContactError::MissingField(_)) => (
            StatusCode::BAD_REQUEST,
            Json(ContactResponse {
                success: false,
                message: e.to_string(),
            }),
        ),
        Err(ContactError::Gateway(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(ContactResponse {
                success: false,
                message: format!("Error: {}", e),
            }),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::gateway::memory::MemoryGateway;
    use crate::gateway::Gateway;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;

    fn test_router() -> Router {
        let state = AppState::new(
            AppConfig::default(),
            Gateway::in_memory(MemoryGateway::new("project-images")),
        );
        Router::new()
            .route("/api/contact", post(submit_message))
            .with_state(state)
    }

    async fn post_json(app: Router, body: serde_json::Value) -> (StatusCode, ContactResponse) {
        let req = Request::post("/api/contact")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_valid_message_is_created() {
        let (status, body) = post_json(
            test_router(),
            serde_json::json!({ "name": "A", "email": "a@b.com", "message": "hi" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body.success);
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let (status, body) = post_json(
            test_router(),
            serde_json::json!({ "name": "A", "message": "hi" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
        assert_eq!(body.message, "Email is required");
    }
}
