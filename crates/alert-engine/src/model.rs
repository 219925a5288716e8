//! Engine-level types shared by the trigger sources.

use std::fmt;
use std::str::FromStr;

use database::Alert;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Sensor that produced a reading window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorType {
    Accelerometer,
    Gyroscope,
}

impl SensorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorType::Accelerometer => "accelerometer",
            SensorType::Gyroscope => "gyroscope",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accelerometer" => Ok(SensorType::Accelerometer),
            "gyroscope" => Ok(SensorType::Gyroscope),
            other => Err(EngineError::Validation(format!(
                "unknown sensor type '{}'",
                other
            ))),
        }
    }
}

/// What caused an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerSource {
    /// Explicit user action.
    Manual,
    /// Sensor classifier decided the user is in danger.
    AutoSensor(SensorType),
    /// Hardware device signal.
    Bracelet,
}

impl TriggerSource {
    /// Tag stored on the alert.
    pub fn tag(&self) -> String {
        match self {
            TriggerSource::Manual => "manual".to_string(),
            TriggerSource::AutoSensor(sensor) => format!("auto_sensor:{}", sensor),
            TriggerSource::Bracelet => "bracelet".to_string(),
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl FromStr for TriggerSource {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(TriggerSource::Manual),
            "bracelet" => Ok(TriggerSource::Bracelet),
            other => match other.strip_prefix("auto_sensor:") {
                Some(sensor) => Ok(TriggerSource::AutoSensor(sensor.parse()?)),
                None => Err(EngineError::Validation(format!(
                    "unknown trigger type '{}'",
                    other
                ))),
            },
        }
    }
}

/// Classifier sensitivity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    High,
    #[default]
    Medium,
    Low,
}

impl Sensitivity {
    /// Minimum danger probability that triggers an alert.
    pub fn threshold(&self) -> f64 {
        match self {
            Sensitivity::High => 0.35,
            Sensitivity::Medium => 0.60,
            Sensitivity::Low => 0.85,
        }
    }

    /// Parse a tier name; missing or unrecognized values fall back to medium.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(|l| l.trim().to_ascii_lowercase()).as_deref() {
            Some("high") => Sensitivity::High,
            Some("low") => Sensitivity::Low,
            _ => Sensitivity::Medium,
        }
    }
}

/// One 3-axis sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Client timestamp in milliseconds.
    #[serde(default)]
    pub timestamp: i64,
}

/// Why a trigger call returned what it returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// A new alert was created and dispatched.
    Triggered,
    /// An alert for this user is already in countdown; it was returned unchanged.
    AlreadyInCountdown,
    /// The user triggered within the cooldown window.
    OnCooldown,
}

impl TriggerReason {
    pub fn message(&self) -> &'static str {
        match self {
            TriggerReason::Triggered => "SOS triggered and messages sent",
            TriggerReason::AlreadyInCountdown => "Alert already in countdown",
            TriggerReason::OnCooldown => "SOS on cooldown, please wait before triggering again",
        }
    }
}

/// Result of a trigger attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggerOutcome {
    pub alert: Option<Alert>,
    pub reason: TriggerReason,
}

impl TriggerOutcome {
    pub fn triggered(alert: Alert) -> Self {
        Self {
            alert: Some(alert),
            reason: TriggerReason::Triggered,
        }
    }

    pub fn in_countdown(alert: Alert) -> Self {
        Self {
            alert: Some(alert),
            reason: TriggerReason::AlreadyInCountdown,
        }
    }

    pub fn on_cooldown(alert: Option<Alert>) -> Self {
        Self {
            alert,
            reason: TriggerReason::OnCooldown,
        }
    }

    /// Whether this call created a new alert.
    pub fn is_new(&self) -> bool {
        self.reason == TriggerReason::Triggered
    }
}

/// Summary of one dispatch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    /// Contact numbers attempted, in directory order.
    pub contacted: Vec<String>,
    /// Contact sends issued (contacts x channels).
    pub attempted: usize,
    /// Contact sends that failed or timed out.
    pub failed: usize,
    /// Whether a push to the owner's device was issued.
    pub push_attempted: bool,
}

/// Response of the sensor auto-trigger path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorAnalysis {
    pub alert_triggered: bool,
    pub alert_id: Option<String>,
    /// Danger probability reported by the classifier.
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<TriggerReason>,
}

impl SensorAnalysis {
    pub(crate) fn not_triggered(confidence: f64) -> Self {
        Self {
            alert_triggered: false,
            alert_id: None,
            confidence,
            reason: None,
        }
    }
}

/// Protection state of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtectionStatus {
    pub is_active: bool,
    pub bracelet_connected: bool,
}
