//! Database models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::DatabaseError;

/// A user profile as far as the alert engine needs it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// Identity-provider user id.
    pub id: String,
    /// Name shown to contacts in alert messages.
    pub full_name: String,
    /// User-level custom SOS message (highest priority).
    pub sos_message: Option<String>,
    /// Push token of the user's own device.
    pub fcm_token: Option<String>,
}

/// A person designated to receive emergency notifications for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TrustedContact {
    pub id: String,
    pub user_id: String,
    pub name: String,
    /// E.164 phone number.
    pub phone: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A recorded position of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub user_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub recorded_at: DateTime<Utc>,
}

/// A hardware device (bracelet) paired with a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ConnectedDevice {
    #[serde(rename = "device_id")]
    pub id: String,
    #[serde(skip_serializing)]
    pub user_id: String,
    pub device_name: String,
    pub device_mac: String,
    pub firmware_version: Option<String>,
    pub is_connected: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub paired_at: DateTime<Utc>,
}

/// Lifecycle state of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Countdown,
    Sent,
    Cancelled,
    Resolved,
}

impl AlertStatus {
    /// Column representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Countdown => "countdown",
            AlertStatus::Sent => "sent",
            AlertStatus::Cancelled => "cancelled",
            AlertStatus::Resolved => "resolved",
        }
    }

    /// True once the incident has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(self, AlertStatus::Cancelled | AlertStatus::Resolved)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "countdown" => Ok(AlertStatus::Countdown),
            "sent" => Ok(AlertStatus::Sent),
            "cancelled" => Ok(AlertStatus::Cancelled),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(DatabaseError::InvalidColumn {
                column: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// One emergency incident, from trigger to resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "alert_id")]
    pub id: String,
    pub user_id: String,
    /// Trigger source tag (`manual`, `auto_sensor:<type>`, `bracelet`).
    pub trigger_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub status: AlertStatus,
    /// Exact text sent to contacts, fixed at trigger time.
    pub sos_message: String,
    /// Destinations attempted during dispatch.
    #[serde(rename = "contacted_numbers")]
    pub contacted: Vec<String>,
    pub triggered_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Raw `sos_alerts` row; `status` and `contacted_numbers` are decoded into [`Alert`].
#[derive(Debug, FromRow)]
pub(crate) struct AlertRow {
    pub id: String,
    pub user_id: String,
    pub trigger_type: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub status: String,
    pub sos_message: String,
    pub contacted_numbers: String,
    pub triggered_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<AlertRow> for Alert {
    type Error = DatabaseError;

    fn try_from(row: AlertRow) -> Result<Self, Self::Error> {
        Ok(Alert {
            status: row.status.parse()?,
            contacted: serde_json::from_str(&row.contacted_numbers)?,
            id: row.id,
            user_id: row.user_id,
            trigger_type: row.trigger_type,
            latitude: row.latitude,
            longitude: row.longitude,
            address: row.address,
            sos_message: row.sos_message,
            triggered_at: row.triggered_at,
            sent_at: row.sent_at,
            resolved_at: row.resolved_at,
        })
    }
}

/// One raw sensor reading kept for offline retraining.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TrainingSample {
    pub user_id: String,
    pub sensor_type: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Client-side reading timestamp (milliseconds).
    pub timestamp: i64,
    /// 1 = danger, 0 = safe.
    pub label: i64,
    /// True when the label was confirmed by the user.
    pub is_verified: bool,
}
