//! Session guard for admin routes.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use crate::gateway::{AccessToken, AdminUser, AuthProvider};
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "user", rename_all = "lowercase")]
pub enum SessionState {
    Loading,
    Authenticated(AdminUser),
    Unauthenticated,
}

/// Resolves once per page load: `Loading` moves to `Authenticated` or
/// `Unauthenticated` and stays there.
#[derive(Debug)]
pub struct SessionGuard {
    state: SessionState,
}

impl Default for SessionGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGuard {
    pub fn new() -> Self {
        Self {
            state: SessionState::Loading,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Any failure of the session check counts as unauthenticated.
    pub async fn resolve(
        &mut self,
        auth: &dyn AuthProvider,
        token: Option<&AccessToken>,
    ) -> &SessionState {
        if self.state != SessionState::Loading {
            return &self.state;
        }

        self.state = match token {
            None => SessionState::Unauthenticated,
            Some(token) => match auth.current_user(token).await {
                Ok(user) => SessionState::Authenticated(user),
                Err(e) => {
                    tracing::debug!(error = %e, "session check failed");
                    SessionState::Unauthenticated
                }
            },
        };
        &self.state
    }
}

/// Signed-in admin, available to handlers behind [`require_session`].
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub user: AdminUser,
    pub token: AccessToken,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<AccessToken> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(AccessToken::new)
}

/// Lets authenticated requests through with an [`AdminSession`] extension;
/// everything else is redirected to the login route.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(request.headers());
    let mut guard = SessionGuard::new();
    let resolved = guard
        .resolve(state.gateway.auth.as_ref(), token.as_ref())
        .await
        .clone();

    match (resolved, token) {
        (SessionState::Authenticated(user), Some(token)) => {
            tracing::debug!(user_id = %user.id, "admin session accepted");
            request
                .extensions_mut()
                .insert(AdminSession { user, token });
            next.run(request).await
        }
        _ => Redirect::to(&state.config.admin_login_path).into_response(),
    }
}
