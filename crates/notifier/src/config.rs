//! Provider credentials loaded from the environment.

use std::env;

/// Twilio REST API base URL.
pub const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// FCM legacy HTTP endpoint.
pub const FCM_SEND_URL: &str = "https://fcm.googleapis.com/fcm/send";

/// Credentials for the Twilio messaging API.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Sender number for SMS (E.164).
    pub phone_number: Option<String>,
    /// Sender for WhatsApp, e.g. `whatsapp:+14155238886`.
    pub whatsapp_from: Option<String>,
    /// API base URL; overridable for testing against a local stub.
    pub api_base: String,
}

impl TwilioConfig {
    /// Create a configuration with the given account credentials.
    pub fn new(account_sid: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            phone_number: None,
            whatsapp_from: None,
            api_base: TWILIO_API_BASE.to_string(),
        }
    }

    /// Set the SMS sender number.
    pub fn with_phone_number(mut self, number: impl Into<String>) -> Self {
        self.phone_number = Some(number.into());
        self
    }

    /// Set the WhatsApp sender.
    pub fn with_whatsapp_from(mut self, from: impl Into<String>) -> Self {
        self.whatsapp_from = Some(from.into());
        self
    }

    /// Messages resource URL for this account.
    pub fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            self.account_sid
        )
    }
}

/// Credentials for Firebase Cloud Messaging.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub server_key: String,
    pub send_url: String,
}

impl FcmConfig {
    pub fn new(server_key: impl Into<String>) -> Self {
        Self {
            server_key: server_key.into(),
            send_url: FCM_SEND_URL.to_string(),
        }
    }
}

/// All notification provider settings.
#[derive(Debug, Clone, Default)]
pub struct NotifierConfig {
    pub twilio: Option<TwilioConfig>,
    pub fcm: Option<FcmConfig>,
}

impl NotifierConfig {
    /// Load provider credentials from environment variables.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `TWILIO_ACCOUNT_SID` | Twilio account SID |
    /// | `TWILIO_AUTH_TOKEN` | Twilio auth token |
    /// | `TWILIO_PHONE_NUMBER` | SMS sender number |
    /// | `TWILIO_WHATSAPP_FROM` | WhatsApp sender (`whatsapp:+...`) |
    /// | `FCM_SERVER_KEY` | Firebase server key for push |
    ///
    /// Missing credentials leave the corresponding provider unset.
    pub fn from_env() -> Self {
        let twilio = match (
            non_empty_var("TWILIO_ACCOUNT_SID"),
            non_empty_var("TWILIO_AUTH_TOKEN"),
        ) {
            (Some(sid), Some(token)) => {
                let mut config = TwilioConfig::new(sid, token);
                config.phone_number = non_empty_var("TWILIO_PHONE_NUMBER");
                config.whatsapp_from = non_empty_var("TWILIO_WHATSAPP_FROM");
                Some(config)
            }
            _ => None,
        };

        let fcm = non_empty_var("FCM_SERVER_KEY").map(FcmConfig::new);

        Self { twilio, fcm }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
