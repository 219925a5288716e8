//! Route handlers for the alert API.

pub mod device;
pub mod health;
pub mod protection;
pub mod sos;
pub mod user;

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // SOS lifecycle
        .route("/api/sos/trigger", post(sos::trigger))
        .route("/api/sos/send-now", post(sos::send_now))
        .route("/api/sos/cancel", post(sos::cancel))
        .route("/api/sos/resolve", post(sos::resolve))
        .route("/api/sos/history", get(sos::history))
        // Automatic protection
        .route("/api/protection/toggle", post(protection::toggle))
        .route("/api/protection/status", get(protection::status))
        .route("/api/protection/sensor-data", post(protection::sensor_data))
        .route("/api/protection/collect", post(protection::collect))
        // Push token of the caller's phone
        .route("/api/user/fcm-token", put(user::update_fcm_token))
        // Hardware devices
        .route("/api/device/register", post(device::register))
        .route("/api/device/status", get(device::status))
        .route("/api/device/:device_id/status", put(device::update_status))
        .route("/api/device/:device_id", delete(device::remove))
        .route("/api/device/alert", post(device::alert))
}
