//! Alert lifecycle manager.
//!
//! ```text
//!             dispatch              cancel / resolve
//! countdown ────────────▶ sent ─────────────────────▶ cancelled | resolved
//!     │                                                     ▲
//!     └───────────────── cancel / stale on next trigger ────┘
//! ```
//!
//! `sent` can still be closed but never dispatched again. Closed alerts are
//! final.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use database::{alert, user, Alert, AlertStatus, Database, DatabaseError};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{EngineConfig, FALLBACK_SOS_MESSAGE};
use crate::cooldown::CooldownGuard;
use crate::dispatch::Dispatcher;
use crate::error::{EngineError, Result};
use crate::model::{DispatchReport, TriggerOutcome, TriggerSource};

/// Owns alert state transitions.
#[derive(Clone)]
pub struct AlertManager {
    db: Database,
    cooldown: Arc<CooldownGuard>,
    dispatcher: Dispatcher,
    config: Arc<EngineConfig>,
}

impl AlertManager {
    pub fn new(
        db: Database,
        cooldown: Arc<CooldownGuard>,
        dispatcher: Dispatcher,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            db,
            cooldown,
            dispatcher,
            config,
        }
    }

    /// Create and dispatch an alert, unless the user is on cooldown or
    /// already has a live countdown alert.
    ///
    /// The cooldown check, the countdown lookup and the insert run under the
    /// user's gate. Dispatch runs after the gate is released.
    pub async fn trigger(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
        source: TriggerSource,
    ) -> Result<TriggerOutcome> {
        let mut gate = self.cooldown.acquire(user_id).await;

        let countdown = alert::find_countdown_alert(self.db.pool(), user_id).await?;

        if gate.is_on_cooldown() {
            if let Some(existing) = countdown {
                return Ok(TriggerOutcome::on_cooldown(Some(existing)));
            }
            // A closed alert is never handed back as if it were live.
            let armed = match gate.last_alert_id() {
                Some(id) => self
                    .find_alert(id)
                    .await?
                    .filter(|a| matches!(a.status, AlertStatus::Countdown | AlertStatus::Sent)),
                None => None,
            };
            info!(user_id = %user_id, source = %source, "Trigger suppressed by cooldown");
            return Ok(TriggerOutcome::on_cooldown(armed));
        }

        if let Some(existing) = countdown {
            if !self.is_stale(&existing) {
                return Ok(TriggerOutcome::in_countdown(existing));
            }
            let resolved_at = Utc::now().max(existing.triggered_at);
            alert::close_alert(self.db.pool(), &existing.id, AlertStatus::Cancelled, resolved_at)
                .await?;
            warn!(user_id = %user_id, alert_id = %existing.id, "Cancelled stale countdown alert");
        }

        let sos_message = self.resolve_message(user_id).await?;
        let created = Alert {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            trigger_type: source.tag(),
            latitude,
            longitude,
            address: None,
            status: AlertStatus::Countdown,
            sos_message,
            contacted: Vec::new(),
            triggered_at: Utc::now(),
            sent_at: None,
            resolved_at: None,
        };
        alert::create_alert(self.db.pool(), &created).await?;

        // Armed before dispatch so a failed dispatch still holds the window.
        gate.mark_triggered(&created.id);
        drop(gate);

        info!(user_id = %user_id, alert_id = %created.id, source = %source, "Alert created");

        if let Err(e) = self.dispatcher.dispatch(&created.id).await {
            error!(alert_id = %created.id, error = %e, "Automatic dispatch failed");
        }

        let current = alert::get_alert(self.db.pool(), &created.id).await?;
        Ok(TriggerOutcome::triggered(current))
    }

    /// Send an alert that is still in countdown.
    pub async fn dispatch(&self, alert_id: &str) -> Result<DispatchReport> {
        self.dispatcher.dispatch(alert_id).await
    }

    /// Close an alert as cancelled. Legal from `countdown` and `sent`.
    pub async fn cancel(&self, alert_id: &str) -> Result<Alert> {
        self.close(alert_id, AlertStatus::Cancelled).await
    }

    /// Close an alert as resolved. Legal from `countdown` and `sent`.
    pub async fn resolve(&self, alert_id: &str) -> Result<Alert> {
        self.close(alert_id, AlertStatus::Resolved).await
    }

    async fn close(&self, alert_id: &str, status: AlertStatus) -> Result<Alert> {
        let current = alert::get_alert(self.db.pool(), alert_id).await?;
        if current.status.is_closed() {
            return Err(EngineError::AlreadyTerminal {
                id: current.id,
                status: current.status,
            });
        }

        let resolved_at = closing_time(&current);
        if !alert::close_alert(self.db.pool(), alert_id, status, resolved_at).await? {
            let latest = alert::get_alert(self.db.pool(), alert_id).await?;
            return Err(EngineError::AlreadyTerminal {
                id: latest.id,
                status: latest.status,
            });
        }

        info!(alert_id = %alert_id, user_id = %current.user_id, status = %status, "Alert closed");
        Ok(alert::get_alert(self.db.pool(), alert_id).await?)
    }

    pub async fn get_alert(&self, alert_id: &str) -> Result<Alert> {
        Ok(alert::get_alert(self.db.pool(), alert_id).await?)
    }

    /// A user's alerts, newest first.
    pub async fn history(&self, user_id: &str) -> Result<Vec<Alert>> {
        Ok(alert::list_user_alerts(self.db.pool(), user_id).await?)
    }

    /// Message for a new alert: the user's own message, then the account
    /// settings message, then the fallback.
    pub async fn resolve_message(&self, user_id: &str) -> Result<String> {
        let owner = user::get_user(self.db.pool(), user_id).await?;
        if let Some(message) = non_blank(owner.sos_message) {
            return Ok(message);
        }

        let settings = user::get_settings_message(self.db.pool(), user_id).await?;
        Ok(non_blank(settings).unwrap_or_else(|| FALLBACK_SOS_MESSAGE.to_string()))
    }

    fn is_stale(&self, alert: &Alert) -> bool {
        (Utc::now() - alert.triggered_at)
            .to_std()
            .is_ok_and(|age| age > self.config.countdown_expiry)
    }

    async fn find_alert(&self, alert_id: &str) -> Result<Option<Alert>> {
        match alert::get_alert(self.db.pool(), alert_id).await {
            Ok(found) => Ok(Some(found)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn closing_time(alert: &Alert) -> DateTime<Utc> {
    let floor = alert.sent_at.unwrap_or(alert.triggered_at);
    Utc::now().max(floor)
}

fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_closing_time_is_monotonic() {
        let future = Utc::now() + Duration::hours(1);
        let alert = Alert {
            id: "a".to_string(),
            user_id: "u".to_string(),
            trigger_type: "manual".to_string(),
            latitude: 0.0,
            longitude: 0.0,
            address: None,
            status: AlertStatus::Sent,
            sos_message: "Emergency!".to_string(),
            contacted: Vec::new(),
            triggered_at: future - Duration::seconds(5),
            sent_at: Some(future),
            resolved_at: None,
        };
        assert_eq!(closing_time(&alert), future);
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("Help".to_string())).as_deref(), Some("Help"));
    }
}
