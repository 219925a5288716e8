//! Trigger sources and the engine facade.
//!
//! Manual, sensor and device triggers all end in [`AlertManager::trigger`],
//! so they share one cooldown gate and one countdown check per user.

use std::sync::Arc;

use database::{device, location, user, Alert, ConnectedDevice, Database, DatabaseError};
use notifier::Notifier;
use tracing::{debug, info, warn};

use crate::classifier::DangerClassifier;
use crate::config::EngineConfig;
use crate::cooldown::CooldownGuard;
use crate::dispatch::Dispatcher;
use crate::error::{EngineError, Result};
use crate::lifecycle::AlertManager;
use crate::model::{
    DispatchReport, ProtectionStatus, SensorAnalysis, SensorReading, SensorType, Sensitivity,
    TriggerOutcome, TriggerSource,
};
use crate::protection::ProtectionRegistry;
use crate::training::TrainingRecorder;

/// Entry point used by the HTTP layer.
#[derive(Clone)]
pub struct AlertEngine {
    db: Database,
    manager: AlertManager,
    classifier: DangerClassifier,
    recorder: TrainingRecorder,
    protection: Arc<ProtectionRegistry>,
}

impl AlertEngine {
    /// Build an engine with fresh cooldown and protection stores.
    pub fn new(
        db: Database,
        notifier: Notifier,
        classifier: DangerClassifier,
        config: EngineConfig,
    ) -> Self {
        let cooldown = Arc::new(CooldownGuard::new(config.cooldown));
        Self::with_stores(
            db,
            notifier,
            classifier,
            config,
            cooldown,
            Arc::new(ProtectionRegistry::new()),
        )
    }

    /// Build an engine around existing per-user stores.
    pub fn with_stores(
        db: Database,
        notifier: Notifier,
        classifier: DangerClassifier,
        config: EngineConfig,
        cooldown: Arc<CooldownGuard>,
        protection: Arc<ProtectionRegistry>,
    ) -> Self {
        let config = Arc::new(config);
        let dispatcher = Dispatcher::new(db.clone(), notifier, Arc::clone(&config));
        let manager = AlertManager::new(db.clone(), cooldown, dispatcher, config);

        Self {
            recorder: TrainingRecorder::new(db.clone()),
            db,
            manager,
            classifier,
            protection,
        }
    }

    pub fn manager(&self) -> &AlertManager {
        &self.manager
    }

    pub fn classifier(&self) -> &DangerClassifier {
        &self.classifier
    }

    /// Explicit user trigger.
    ///
    /// `label` overrides the stored trigger type and must be a known tag.
    pub async fn manual_trigger(
        &self,
        user_id: &str,
        latitude: f64,
        longitude: f64,
        label: Option<&str>,
    ) -> Result<TriggerOutcome> {
        validate_coordinates(latitude, longitude)?;
        let source = match label.map(str::trim).filter(|l| !l.is_empty()) {
            Some(label) => label.parse()?,
            None => TriggerSource::Manual,
        };

        self.manager.trigger(user_id, latitude, longitude, source).await
    }

    /// Score a reading window and trigger when it crosses the sensitivity
    /// threshold. Only runs while the user has protection on.
    ///
    /// Every scored window is stored as training data labelled with the
    /// decision, in the background.
    pub async fn analyze_sensor_data(
        &self,
        user_id: &str,
        sensor: SensorType,
        readings: &[SensorReading],
        sensitivity: Sensitivity,
    ) -> Result<SensorAnalysis> {
        if !self.protection.is_active(user_id) {
            debug!(user_id = %user_id, "Protection inactive, skipping analysis");
            return Ok(SensorAnalysis::not_triggered(0.0));
        }

        let confidence = self.classifier.classify(readings, sensor)?;
        let danger = DangerClassifier::decide(confidence, sensitivity);
        self.recorder.record(user_id, sensor, readings, danger);

        if !danger {
            return Ok(SensorAnalysis::not_triggered(confidence));
        }

        info!(user_id = %user_id, sensor = %sensor, confidence, "Danger detected");
        let (latitude, longitude) = self.last_known_position(user_id).await?;
        let outcome = self
            .manager
            .trigger(user_id, latitude, longitude, TriggerSource::AutoSensor(sensor))
            .await?;

        Ok(SensorAnalysis {
            alert_triggered: outcome.is_new(),
            alert_id: outcome.alert.map(|a| a.id),
            confidence,
            reason: Some(outcome.reason),
        })
    }

    /// Hardware trigger identified only by the device MAC.
    pub async fn device_trigger(&self, device_mac: &str) -> Result<TriggerOutcome> {
        let not_found = || EngineError::NotFound {
            entity: "Device",
            id: device_mac.to_string(),
        };
        // An identifier that cannot be parsed is just as unregistered.
        let paired = match device::find_by_mac(self.db.pool(), device_mac).await {
            Ok(found) => found.ok_or_else(not_found)?,
            Err(DatabaseError::Validation(_)) => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        info!(device_id = %paired.id, user_id = %paired.user_id, "Device alert received");
        let (latitude, longitude) = self.last_known_position(&paired.user_id).await?;
        self.manager
            .trigger(&paired.user_id, latitude, longitude, TriggerSource::Bracelet)
            .await
    }

    /// Store a user-labelled window as verified training data.
    pub async fn collect_training_data(
        &self,
        user_id: &str,
        sensor: SensorType,
        readings: &[SensorReading],
        label: i64,
    ) -> Result<u64> {
        if readings.is_empty() {
            return Err(EngineError::Validation(
                "sensor window must contain at least one reading".to_string(),
            ));
        }
        let danger = match label {
            0 => false,
            1 => true,
            other => {
                return Err(EngineError::Validation(format!(
                    "label must be 0 or 1, got {}",
                    other
                )))
            }
        };

        self.recorder
            .store(user_id, sensor, readings, danger, true)
            .await
    }

    pub fn toggle_protection(&self, user_id: &str, active: bool) -> bool {
        let active = self.protection.set_active(user_id, active);
        info!(user_id = %user_id, active, "Protection toggled");
        active
    }

    pub async fn protection_status(&self, user_id: &str) -> Result<ProtectionStatus> {
        Ok(ProtectionStatus {
            is_active: self.protection.is_active(user_id),
            bracelet_connected: device::has_connected_device(self.db.pool(), user_id).await?,
        })
    }

    /// Pair a device with a user, taking it over if another user had it.
    pub async fn register_device(
        &self,
        user_id: &str,
        device_name: &str,
        device_mac: &str,
        firmware_version: Option<&str>,
    ) -> Result<ConnectedDevice> {
        if device_name.trim().is_empty() {
            return Err(EngineError::Validation("device_name is required".to_string()));
        }
        user::get_user(self.db.pool(), user_id).await?;

        let paired = device::register_device(
            self.db.pool(),
            user_id,
            device_name.trim(),
            device_mac,
            firmware_version,
        )
        .await?;
        info!(user_id = %user_id, device_id = %paired.id, "Device registered");
        Ok(paired)
    }

    /// The user's most recently seen device.
    pub async fn device_status(&self, user_id: &str) -> Result<ConnectedDevice> {
        device::latest_device(self.db.pool(), user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Device",
                id: format!("for user {}", user_id),
            })
    }

    /// Report a paired device as connected or disconnected.
    pub async fn set_device_connected(
        &self,
        user_id: &str,
        device_id: &str,
        connected: bool,
    ) -> Result<ConnectedDevice> {
        let updated = device::set_connected(self.db.pool(), user_id, device_id, connected).await?;
        info!(user_id = %user_id, device_id = %device_id, connected, "Device status updated");
        Ok(updated)
    }

    pub async fn remove_device(&self, user_id: &str, device_id: &str) -> Result<()> {
        device::delete_device(self.db.pool(), user_id, device_id).await?;
        info!(user_id = %user_id, device_id = %device_id, "Device removed");
        Ok(())
    }

    /// Set or clear the push token used for the owner's dispatch notice.
    pub async fn set_push_token(&self, user_id: &str, token: Option<&str>) -> Result<()> {
        let token = token.map(str::trim).filter(|t| !t.is_empty());
        user::set_fcm_token(self.db.pool(), user_id, token).await?;
        info!(user_id = %user_id, registered = token.is_some(), "Push token updated");
        Ok(())
    }

    pub async fn dispatch(&self, alert_id: &str) -> Result<DispatchReport> {
        self.manager.dispatch(alert_id).await
    }

    pub async fn cancel(&self, alert_id: &str) -> Result<Alert> {
        self.manager.cancel(alert_id).await
    }

    pub async fn resolve(&self, alert_id: &str) -> Result<Alert> {
        self.manager.resolve(alert_id).await
    }

    pub async fn get_alert(&self, alert_id: &str) -> Result<Alert> {
        self.manager.get_alert(alert_id).await
    }

    pub async fn history(&self, user_id: &str) -> Result<Vec<Alert>> {
        self.manager.history(user_id).await
    }

    async fn last_known_position(&self, user_id: &str) -> Result<(f64, f64)> {
        match location::last_location(self.db.pool(), user_id).await? {
            Some(last) => Ok((last.latitude, last.longitude)),
            None => {
                warn!(user_id = %user_id, "No recorded location, using (0, 0)");
                Ok((0.0, 0.0))
            }
        }
    }
}

fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(EngineError::Validation(format!("invalid latitude {}", latitude)));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(EngineError::Validation(format!("invalid longitude {}", longitude)));
    }
    Ok(())
}
