use std::sync::Arc;

use pagescope_core::{Config, ScrapeOrchestrator};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<ScrapeOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<ScrapeOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Arc<ScrapeOrchestrator> {
        &self.orchestrator
    }
}
