use std::sync::Arc;

use chrono::{DateTime, Utc};
use magnetdex_core::{Config, IngestScheduler, SanitizedConfig, SqliteStore};

/// Shared application state
pub struct AppState {
    config: Config,
    store: Arc<SqliteStore>,
    scheduler: Arc<IngestScheduler>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<SqliteStore>, scheduler: Arc<IngestScheduler>) -> Self {
        Self {
            config,
            store,
            scheduler,
            started_at: Utc::now(),
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &SqliteStore {
        self.store.as_ref()
    }

    pub fn scheduler(&self) -> &IngestScheduler {
        self.scheduler.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
