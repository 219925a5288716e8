//! Application state shared across handlers.

use alert_engine::AlertEngine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Alert engine.
    pub engine: AlertEngine,
}

impl AppState {
    /// Create new application state.
    pub fn new(engine: AlertEngine) -> Self {
        Self { engine }
    }
}
