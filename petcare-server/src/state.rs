//! Shared application state for the petcare server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use petcare_models::AnalyzerRegistry;

/// Shared application state accessible by all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// Analyzers built once at startup
    pub registry: Arc<AnalyzerRegistry>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state around an analyzer registry
    pub fn new(registry: AnalyzerRegistry) -> Self {
        Self::with_registry(Arc::new(registry))
    }

    /// Create state sharing an existing registry
    pub fn with_registry(registry: Arc<AnalyzerRegistry>) -> Self {
        Self {
            registry,
            started_at: Utc::now(),
        }
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
