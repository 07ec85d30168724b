use std::sync::Arc;

use crate::config::AppConfig;
use crate::gateway::Gateway;

/// Shared per-process context handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gateway: Gateway,
}

impl AppState {
    pub fn new(config: AppConfig, gateway: Gateway) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
        }
    }
}
