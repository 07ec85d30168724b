//! Portfolio Site - public portfolio API and admin area over a hosted backend

pub mod admin;
pub mod config;
pub mod contact;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::net::SocketAddr;
use thiserror::Error;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::gateway::{Gateway, GatewayError};
use crate::state::AppState;

/// Room for the non-file multipart fields on top of the image cap.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid HOST/PORT configuration: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("backend configuration: {0}")]
    Gateway(#[from] GatewayError),

    #[error("ADMIN_PASSWORD must be set in production when no backend service is configured")]
    InsecureAdmin,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Refuses a production start where the in-memory backend would accept the
/// built-in admin password.
pub fn check_production_safety(
    config: &AppConfig,
    admin_password: Option<&str>,
) -> Result<(), StartupError> {
    if !config.is_production() || config.service.is_some() {
        return Ok(());
    }

    tracing::warn!(
        "SUPABASE_URL / SUPABASE_ANON_KEY are not set in production. \
         Projects and messages are kept in memory and lost on restart."
    );
    match admin_password {
        Some(password) if !password.is_empty() => Ok(()),
        _ => Err(StartupError::InsecureAdmin),
    }
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, falling back
/// to the local frontend dev server.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Admin-only routes, all behind the session guard.
fn admin_router(state: &AppState) -> Router<AppState> {
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/dashboard", get(routes::admin::dashboard))
        .route(
            "/projects",
            get(routes::admin::list_projects).post(routes::admin::create_project),
        )
        .route(
            "/projects/{id}",
            patch(routes::admin::update_project).delete(routes::admin::delete_project),
        )
        .route("/messages", get(routes::admin::list_messages))
        .route("/messages/{id}", delete(routes::admin::delete_message))
        .layer(DefaultBodyLimit::max(body_limit))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin::session::require_session,
        ))
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    let body_limit = state.config.max_upload_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        .route("/api/projects", get(routes::projects::list_projects))
        .route(
            "/api/projects/featured",
            get(routes::projects::featured_projects),
        )
        .route("/api/contact", post(routes::contact::submit_message))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/session", get(routes::auth::session))
        .nest("/api/admin", admin_router(&state))
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/ready", get(routes::health::health_ready))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env();

    let _log_guards = logging::init(&config.environment);

    routes::health::init_start_time();

    let admin_password = std::env::var("ADMIN_PASSWORD").ok();
    check_production_safety(&config, admin_password.as_deref()).inspect_err(|e| {
        tracing::error!(error = %e, "refusing to start");
    })?;

    let gateway = Gateway::from_config(&config).inspect_err(|e| {
        tracing::error!(error = %e, "failed to configure backend gateway");
    })?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let app = create_app(AppState::new(config, gateway));

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> Router {
        let gateway = Gateway::in_memory(MemoryGateway::new("project-images"));
        create_app(AppState::new(AppConfig::default(), gateway))
    }

    #[tokio::test]
    async fn test_admin_routes_redirect_without_session() {
        for uri in ["/api/admin/dashboard", "/api/admin/projects", "/api/admin/messages"] {
            let req = Request::get(uri).body(Body::empty()).unwrap();
            let res = test_app().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::SEE_OTHER, "{}", uri);
            assert_eq!(res.headers()["location"], "/admin/login");
        }
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    fn production() -> AppConfig {
        AppConfig {
            environment: "production".to_string(),
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_production_without_service_needs_admin_password() {
        let config = production();
        assert!(matches!(
            check_production_safety(&config, None),
            Err(StartupError::InsecureAdmin)
        ));
        assert!(matches!(
            check_production_safety(&config, Some("")),
            Err(StartupError::InsecureAdmin)
        ));
        assert!(check_production_safety(&config, Some("a-real-secret")).is_ok());
    }

    #[test]
    fn test_default_password_allowed_outside_production() {
        assert!(check_production_safety(&AppConfig::default(), None).is_ok());

        let mut config = production();
        config.service = Some(crate::config::ServiceConfig {
            url: "https://project.supabase.co".to_string(),
            anon_key: "anon".to_string(),
            timeout: std::time::Duration::from_secs(10),
        });
        assert!(check_production_safety(&config, None).is_ok());
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let req = Request::get("/api/blog").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
