//! Engine tunables.

use std::time::Duration;

/// Minimum interval between successful triggers for one user.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(20);

/// Age after which a `countdown` alert is considered abandoned.
pub const DEFAULT_COUNTDOWN_EXPIRY: Duration = Duration::from_secs(60);

/// Upper bound for a single notification send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Message used when neither the user nor their settings define one.
pub const FALLBACK_SOS_MESSAGE: &str = "Emergency!";

/// Configuration for the alert engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cooldown window enforced by the cooldown guard.
    pub cooldown: Duration,
    /// Countdown staleness threshold, evaluated lazily on the next trigger.
    pub countdown_expiry: Duration,
    /// Per-send timeout; a send exceeding it counts as failed.
    pub send_timeout: Duration,
    /// Prefix for the map link; coordinates are appended as `lat,lng`.
    pub maps_base_url: String,
    /// Product name used in the dispatch signature.
    pub app_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            countdown_expiry: DEFAULT_COUNTDOWN_EXPIRY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            maps_base_url: "https://maps.google.com/?q=".to_string(),
            app_name: "Asfalis".to_string(),
        }
    }
}

impl EngineConfig {
    /// Override the cooldown window.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Override the per-send timeout.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Map link for a pair of coordinates.
    ///
    /// Whole degrees keep their `.0` (`q=10.0,20.0`).
    pub fn maps_link(&self, latitude: f64, longitude: f64) -> String {
        format!("{}{:?},{:?}", self.maps_base_url, latitude, longitude)
    }
}
