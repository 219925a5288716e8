//! Per-user cooldown gate.
//!
//! Each user has one slot guarded by an async mutex. Holding a [`UserGate`]
//! is the per-user critical section: the cooldown check, the countdown-alert
//! lookup and alert creation all happen while the gate is held, so two
//! concurrent triggers for one user cannot both create an alert.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;

/// Entries kept before an opportunistic prune runs.
const PRUNE_THRESHOLD: usize = 1024;

/// State of one user's slot.
#[derive(Debug, Default)]
pub struct CooldownEntry {
    last_trigger: Option<Instant>,
    alert_id: Option<String>,
}

/// Process-lifetime cooldown store, keyed by user id.
#[derive(Debug)]
pub struct CooldownGuard {
    window: Duration,
    entries: Mutex<HashMap<String, Arc<AsyncMutex<CooldownEntry>>>>,
}

impl CooldownGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Enter the critical section for `user_id`, waiting for any other holder.
    pub async fn acquire(&self, user_id: &str) -> UserGate {
        let slot = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if entries.len() > PRUNE_THRESHOLD {
                prune(&mut entries, self.window);
            }
            Arc::clone(entries.entry(user_id.to_string()).or_default())
        };

        UserGate {
            entry: slot.lock_owned().await,
            window: self.window,
        }
    }

    /// True if the user triggered within the cooldown window.
    pub async fn is_on_cooldown(&self, user_id: &str) -> bool {
        self.acquire(user_id).await.is_on_cooldown()
    }

    /// Record a successful trigger for the user.
    pub async fn mark_triggered(&self, user_id: &str, alert_id: &str) {
        self.acquire(user_id).await.mark_triggered(alert_id);
    }

    /// Drop entries whose window has passed and that nobody is using.
    pub fn prune_expired(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        prune(&mut entries, self.window);
    }

    /// Number of tracked users.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CooldownGuard {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COOLDOWN)
    }
}

fn prune(entries: &mut HashMap<String, Arc<AsyncMutex<CooldownEntry>>>, window: Duration) {
    // A strong count of 1 means no gate is held or awaited for this slot.
    entries.retain(|_, slot| {
        if Arc::strong_count(slot) > 1 {
            return true;
        }
        match slot.try_lock() {
            Ok(entry) => entry
                .last_trigger
                .is_some_and(|at| at.elapsed() < window),
            Err(_) => true,
        }
    });
}

/// Exclusive access to one user's cooldown slot.
pub struct UserGate {
    entry: OwnedMutexGuard<CooldownEntry>,
    window: Duration,
}

impl UserGate {
    /// True if now - last trigger < window.
    pub fn is_on_cooldown(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left in the cooldown window, if any.
    pub fn remaining(&self) -> Option<Duration> {
        let elapsed = self.entry.last_trigger?.elapsed();
        self.window.checked_sub(elapsed).filter(|left| !left.is_zero())
    }

    /// Alert created by the most recent successful trigger.
    pub fn last_alert_id(&self) -> Option<&str> {
        self.entry.alert_id.as_deref()
    }

    /// Set last trigger time to now.
    pub fn mark_triggered(&mut self, alert_id: &str) {
        self.entry.last_trigger = Some(Instant::now());
        self.entry.alert_id = Some(alert_id.to_string());
    }
}
