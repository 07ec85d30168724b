/**
 * Authentication Routes
 * Password sign-in proxy, sign-out and session state for the admin area
 */
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::session::{bearer_token, SessionGuard, SessionState};
use crate::gateway::{AdminUser, GatewayError};
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<AdminUser>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoginResponse {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            access_token: None,
            refresh_token: None,
            expires_in: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub redirect: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
}

/// The service said no, as opposed to being unreachable.
fn is_rejection(error: &GatewayError) -> bool {
    matches!(
        error,
        GatewayError::Unauthorized | GatewayError::Status { status: 400..=499, .. }
    )
}

/// POST /api/auth/login - Forward to the service's password grant
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(LoginResponse::failure("Email and password are required")),
        );
    }
    if !email.contains('@') {
        return (
            StatusCode::BAD_REQUEST,
            Json(LoginResponse::failure("Invalid email format")),
        );
    }

    match state
        .gateway
        .auth
        .sign_in_with_password(email, &payload.password)
        .await
    {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "admin signed in");
            (
                StatusCode::OK,
                Json(LoginResponse {
                    success: true,
                    user: Some(session.user),
                    access_token: Some(session.access_token.as_str().to_string()),
                    refresh_token: session.refresh_token,
                    expires_in: session.expires_in,
                    error: None,
                }),
            )
        }
        Err(e) if is_rejection(&e) => {
            tracing::warn!(email = %email, "sign-in rejected");
            (
                StatusCode::UNAUTHORIZED,
                Json(LoginResponse::failure("Invalid email or password")),
            )
        }
        Err(e) => {
            tracing::error!(error = %e, "sign-in request failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(LoginResponse::failure("Authentication service unavailable")),
            )
        }
    }
}

/// POST /api/auth/logout - Revoke the session; always points back at login
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(token) = bearer_token(&headers) {
        if let Err(e) = state.gateway.auth.sign_out(&token).await {
            tracing::warn!(error = %e, "sign-out failed");
        }
    }

    Json(LogoutResponse {
        success: true,
        redirect: state.config.admin_login_path.clone(),
    })
}

/// GET /api/auth/session - Resolve the caller's session once
pub async fn session(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let token = bearer_token(&headers);
    let mut guard = SessionGuard::new();
    let resolved = guard
        .resolve(state.gateway.auth.as_ref(), token.as_ref())
        .await
        .clone();

    let redirect = match resolved {
        SessionState::Authenticated(_) => None,
        _ => Some(state.config.admin_login_path.clone()),
    };

    Json(SessionResponse {
        session: resolved,
        redirect,
    })
}
