//! HTTP API for the Asfalis emergency alert engine.
//!
//! Exposes the manual, sensor and device trigger sources plus the alert
//! lifecycle operations as JSON routes. Every authenticated route expects the
//! gateway-provided `X-User-Id` header.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use crate::config::Config;
pub use crate::error::{ApiError, ApiResponse};
pub use crate::state::AppState;

/// Build the application with its state and request tracing.
pub fn app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
