//! Per-user protection toggle.

use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Users that have turned automatic sensor protection on.
///
/// Process-lifetime state injected into the engine; a restart turns
/// protection off for everyone until their app toggles it again.
#[derive(Debug, Default)]
pub struct ProtectionRegistry {
    active: RwLock<HashSet<String>>,
}

impl ProtectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn protection on or off. Returns the new state.
    pub fn set_active(&self, user_id: &str, active: bool) -> bool {
        let mut users = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if active {
            users.insert(user_id.to_string());
        } else {
            users.remove(user_id);
        }
        active
    }

    pub fn is_active(&self, user_id: &str) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(user_id)
    }

    /// Number of users with protection on.
    pub fn active_count(&self) -> usize {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
