//! Dispatch orchestrator.
//!
//! Moves an alert from `countdown` to `sent` and fans the message out to
//! every trusted contact over every configured channel. Each send is its own
//! task with a bounded timeout; a failing contact or channel never stops the
//! others and never undoes the `sent` transition.

use std::sync::Arc;

use chrono::Utc;
use database::{alert, contact, user, Alert, AlertStatus, Database, TrustedContact, User};
use notifier::{ChannelError, Notifier, NotifyChannel, PushMessage};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::DispatchReport;

/// Title of the push sent to the alert owner's own device.
pub const PUSH_TITLE: &str = "SOS Alert Sent";

/// Text delivered to contacts: the alert message, a map link and a signature.
pub fn compose_message(config: &EngineConfig, alert: &Alert, full_name: Option<&str>) -> String {
    let signature = match full_name {
        Some(name) if !name.trim().is_empty() => format!("Sent by {} for {}", config.app_name, name),
        _ => format!("Sent by {}", config.app_name),
    };

    format!(
        "{}\n\nLocation: {}\n{}",
        alert.sos_message,
        config.maps_link(alert.latitude, alert.longitude),
        signature
    )
}

/// Sends a claimed alert to contacts.
#[derive(Clone)]
pub struct Dispatcher {
    db: Database,
    notifier: Notifier,
    config: Arc<EngineConfig>,
}

impl Dispatcher {
    pub fn new(db: Database, notifier: Notifier, config: Arc<EngineConfig>) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    /// Dispatch an alert that is still in countdown.
    ///
    /// Fails with `NotFound` for an unknown id and `AlreadyTerminal` for an
    /// alert that was already sent or closed; nothing is sent in either case.
    pub async fn dispatch(&self, alert_id: &str) -> Result<DispatchReport> {
        let alert = alert::get_alert(self.db.pool(), alert_id).await?;
        if alert.status != AlertStatus::Countdown {
            return Err(EngineError::AlreadyTerminal {
                id: alert.id,
                status: alert.status,
            });
        }

        let sent_at = Utc::now().max(alert.triggered_at);
        if !alert::claim_for_dispatch(self.db.pool(), &alert.id, sent_at).await? {
            // Lost the race to another dispatch or a cancel
            let current = alert::get_alert(self.db.pool(), &alert.id).await?;
            return Err(EngineError::AlreadyTerminal {
                id: current.id,
                status: current.status,
            });
        }

        info!(alert_id = %alert.id, user_id = %alert.user_id, "Alert marked as sent, notifying contacts");
        Ok(self.fan_out(&alert).await)
    }

    async fn fan_out(&self, alert: &Alert) -> DispatchReport {
        // Past this point storage failures are logged; the alert stays sent.
        let owner = match user::get_user(self.db.pool(), &alert.user_id).await {
            Ok(owner) => Some(owner),
            Err(e) => {
                error!(alert_id = %alert.id, error = %e, "Failed to load alert owner");
                None
            }
        };

        let contacts = match contact::list_contacts(self.db.pool(), &alert.user_id).await {
            Ok(contacts) => contacts,
            Err(e) => {
                error!(alert_id = %alert.id, error = %e, "Failed to load trusted contacts");
                Vec::new()
            }
        };

        let body: Arc<str> = compose_message(
            &self.config,
            alert,
            owner.as_ref().map(|u| u.full_name.as_str()),
        )
        .into();

        let mut sends = JoinSet::new();
        let mut report = DispatchReport::default();

        for contact in &contacts {
            for channel in self.notifier.channels() {
                self.spawn_send(&mut sends, Arc::clone(channel), contact, Arc::clone(&body));
                report.attempted += 1;
            }
        }

        if let Some(token) = owner.as_ref().and_then(push_token) {
            report.push_attempted = true;
            self.spawn_push(alert, token);
        }

        // Every send has been issued; record the destinations before waiting.
        report.contacted = contacts.into_iter().map(|c| c.phone).collect();
        if let Err(e) = alert::record_contacted(self.db.pool(), &alert.id, &report.contacted).await {
            error!(alert_id = %alert.id, error = %e, "Failed to record contacted numbers");
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok(true) => {}
                Ok(false) => report.failed += 1,
                Err(e) => {
                    error!(alert_id = %alert.id, error = %e, "Notification task panicked");
                    report.failed += 1;
                }
            }
        }

        info!(
            alert_id = %alert.id,
            contacts = report.contacted.len(),
            attempted = report.attempted,
            failed = report.failed,
            "Dispatch complete"
        );

        report
    }

    fn spawn_send(
        &self,
        sends: &mut JoinSet<bool>,
        channel: Arc<dyn NotifyChannel>,
        contact: &TrustedContact,
        body: Arc<str>,
    ) {
        let timeout = self.config.send_timeout;
        let to = contact.phone.clone();

        sends.spawn(async move {
            let result = match tokio::time::timeout(timeout, channel.send(&to, &body)).await {
                Ok(result) => result,
                Err(_) => Err(ChannelError::Timeout(timeout)),
            };

            match result {
                Ok(()) => {
                    debug!(to = %to, channel = channel.name(), "Notification sent");
                    true
                }
                Err(e) => {
                    warn!(to = %to, channel = channel.name(), error = %e, "Notification failed");
                    false
                }
            }
        });
    }

    fn spawn_push(&self, alert: &Alert, token: String) {
        let push = Arc::clone(self.notifier.push());
        let timeout = self.config.send_timeout;
        let alert_id = alert.id.clone();
        let message = PushMessage::new(PUSH_TITLE, "Your trusted contacts have been notified.")
            .with_data("alert_id", alert.id.clone())
            .with_data("type", "sos_alert");

        tokio::spawn(async move {
            match tokio::time::timeout(timeout, push.send_push(&token, &message)).await {
                Ok(Ok(())) => debug!(alert_id = %alert_id, sender = push.name(), "Owner push sent"),
                Ok(Err(e)) => warn!(alert_id = %alert_id, error = %e, "Owner push failed"),
                Err(_) => warn!(alert_id = %alert_id, "Owner push timed out"),
            }
        });
    }
}

fn push_token(owner: &User) -> Option<String> {
    owner
        .fcm_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
