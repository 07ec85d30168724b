/*!
 * Application configuration
 * Everything is read from the environment once at startup
 */
use std::time::Duration;

/// Supabase-compatible service credentials.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// `None` runs against the in-memory gateway.
    pub service: Option<ServiceConfig>,
    pub projects_table: String,
    pub messages_table: String,
    pub images_bucket: String,
    pub admin_login_path: String,
    pub max_upload_bytes: usize,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let timeout_secs = std::env::var("GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let service = match (
            std::env::var("SUPABASE_URL").ok(),
            std::env::var("SUPABASE_ANON_KEY").ok(),
        ) {
            (Some(url), Some(anon_key)) if !url.is_empty() && !anon_key.is_empty() => {
                Some(ServiceConfig {
                    url: url.trim_end_matches('/').to_string(),
                    anon_key,
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            _ => None,
        };

        Self {
            environment: env_or("ENVIRONMENT", "development"),
            host: env_or("HOST", "127.0.0.1"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3001),
            service,
            projects_table: env_or("PROJECTS_TABLE", "projects"),
            messages_table: env_or("MESSAGES_TABLE", "contact_messages"),
            images_bucket: env_or("PROJECT_IMAGES_BUCKET", "project-images"),
            admin_login_path: env_or("ADMIN_LOGIN_PATH", "/admin/login"),
            max_upload_bytes: std::env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5 * 1024 * 1024),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3001,
            service: None,
            projects_table: "projects".to_string(),
            messages_table: "contact_messages".to_string(),
            images_bucket: "project-images".to_string(),
            admin_login_path: "/admin/login".to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_source_names() {
        let config = AppConfig::default();
        assert_eq!(config.projects_table, "projects");
        assert_eq!(config.messages_table, "contact_messages");
        assert_eq!(config.images_bucket, "project-images");
        assert_eq!(config.admin_login_path, "/admin/login");
        assert!(config.service.is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_from_env_falls_back_to_defaults() {
        let config = AppConfig::from_env();
        assert!(config.port > 0);
        assert!(config.max_upload_bytes >= 1);
        assert!(!config.projects_table.is_empty());
    }
}
