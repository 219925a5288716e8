//! Push notifications to the user's own device.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FcmConfig;
use crate::error::ChannelError;

/// Android notification channel the mobile app registers for SOS pushes.
pub const SOS_ANDROID_CHANNEL: &str = "sos_channel";

/// A push notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: HashMap::new(),
        }
    }

    /// Attach a data key/value pair.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// Trait for delivering push notifications to a device token.
#[async_trait]
pub trait PushSender: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send_push(&self, device_token: &str, message: &PushMessage) -> Result<(), ChannelError>;
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
    sound: &'static str,
    android_channel_id: &'static str,
}

#[derive(Serialize)]
struct FcmRequest<'a> {
    to: &'a str,
    priority: &'static str,
    notification: FcmNotification<'a>,
    data: &'a HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    success: u32,
    #[serde(default)]
    failure: u32,
}

/// Push delivery through the FCM HTTP API.
#[derive(Clone)]
pub struct FcmPushSender {
    http: Client,
    config: FcmConfig,
}

impl FcmPushSender {
    pub fn new(config: FcmConfig) -> Result<Self, ChannelError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(ChannelError::Http)?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    fn name(&self) -> &'static str {
        "fcm"
    }

    async fn send_push(&self, device_token: &str, message: &PushMessage) -> Result<(), ChannelError> {
        let request = FcmRequest {
            to: device_token,
            priority: "high",
            notification: FcmNotification {
                title: &message.title,
                body: &message.body,
                sound: "alarm",
                android_channel_id: SOS_ANDROID_CHANNEL,
            },
            data: &message.data,
        };

        debug!("Sending push notification");
        let resp = self
            .http
            .post(&self.config.send_url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("key={}", self.config.server_key),
            )
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let result: FcmResponse = resp.json().await?;
        if result.failure > 0 && result.success == 0 {
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
                message: "device token rejected".to_string(),
            });
        }

        info!("Push notification sent");
        Ok(())
    }
}

/// A push sender that only logs, used when FCM is not configured.
#[derive(Debug, Clone, Default)]
pub struct LoggingPushSender;

#[async_trait]
impl PushSender for LoggingPushSender {
    fn name(&self) -> &'static str {
        "logging-push"
    }

    async fn send_push(&self, _device_token: &str, message: &PushMessage) -> Result<(), ChannelError> {
        tracing::info!("[push] Mock push: {} - {}", message.title, message.body);
        Ok(())
    }
}
