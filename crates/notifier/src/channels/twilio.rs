//! Twilio-backed SMS and WhatsApp channels.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use super::{ChannelKind, NotifyChannel};
use crate::config::TwilioConfig;
use crate::error::ChannelError;

/// HTTP timeout for a single Twilio request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Successful message creation response.
#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

/// Twilio error payload.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

/// Thin client for the Twilio Messages resource.
#[derive(Clone)]
struct TwilioClient {
    http: Client,
    config: TwilioConfig,
}

impl TwilioClient {
    fn new(config: TwilioConfig) -> Result<Self, ChannelError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(ChannelError::Http)?;
        Ok(Self { http, config })
    }

    /// Create a message; returns the Twilio message SID.
    async fn create_message(&self, from: &str, to: &str, body: &str) -> Result<String, ChannelError> {
        let resp = self
            .http
            .post(self.config.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[("From", from), ("To", to), ("Body", body)])
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let message: MessageResponse = resp.json().await?;
            return Ok(message.sid);
        }

        let text = resp.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(err) => match err.code {
                Some(code) => format!("{} (code {})", err.message, code),
                None => err.message,
            },
            Err(_) => text,
        };

        Err(ChannelError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Prefix a number with `whatsapp:` unless already present.
pub fn whatsapp_address(number: &str) -> String {
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{}", number)
    }
}

/// SMS delivery through Twilio.
#[derive(Clone)]
pub struct SmsChannel {
    client: TwilioClient,
    from: String,
}

impl SmsChannel {
    /// Create the channel; requires `phone_number` to be configured.
    pub fn new(config: TwilioConfig) -> Result<Self, ChannelError> {
        let from = config
            .phone_number
            .clone()
            .ok_or_else(|| ChannelError::NotConfigured("TWILIO_PHONE_NUMBER".to_string()))?;
        Ok(Self {
            client: TwilioClient::new(config)?,
            from,
        })
    }
}

#[async_trait]
impl NotifyChannel for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn name(&self) -> &'static str {
        "twilio-sms"
    }

    async fn send(&self, to: &str, body: &str) -> Result<(), ChannelError> {
        debug!(to = %to, "Sending SMS");
        let sid = self.client.create_message(&self.from, to, body).await?;
        info!(to = %to, sid = %sid, "SMS sent");
        Ok(())
    }
}

/// WhatsApp delivery through Twilio.
#[derive(Clone)]
pub struct WhatsAppChannel {
    client: TwilioClient,
    from: String,
}

impl WhatsAppChannel {
    /// Create the channel; requires `whatsapp_from` to be configured.
    pub fn new(config: TwilioConfig) -> Result<Self, ChannelError> {
        let from = config
            .whatsapp_from
            .as_deref()
            .map(whatsapp_address)
            .ok_or_else(|| ChannelError::NotConfigured("TWILIO_WHATSAPP_FROM".to_string()))?;
        Ok(Self {
            client: TwilioClient::new(config)?,
            from,
        })
    }
}

#[async_trait]
impl NotifyChannel for WhatsAppChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WhatsApp
    }

    fn name(&self) -> &'static str {
        "twilio-whatsapp"
    }

    async fn send(&self, to: &str, body: &str) -> Result<(), ChannelError> {
        let to = whatsapp_address(to);
        debug!(to = %to, "Sending WhatsApp message");
        let sid = self.client.create_message(&self.from, &to, body).await?;
        info!(to = %to, sid = %sid, "WhatsApp message sent");
        Ok(())
    }
}
