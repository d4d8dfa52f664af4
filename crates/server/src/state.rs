use std::sync::Arc;
use convertino_core::{Config, ConversionOrchestrator, SanitizedConfig, TempStore};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<ConversionOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<ConversionOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &ConversionOrchestrator {
        &self.orchestrator
    }

    pub fn store(&self) -> &TempStore {
        self.orchestrator.store()
    }
}
