use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::SharedStore;

/// Everything a request handler can reach. Built once at startup.
pub struct AppState {
    pub config: AppConfig,
    pub store: SharedStore,
}

impl AppState {
    pub fn new(config: AppConfig, store: SharedStore) -> Self {
        Self { config, store }
    }
}

pub type SharedState = Arc<AppState>;
