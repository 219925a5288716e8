//! Notification channel implementations.

pub mod logging;
pub mod twilio;

use std::fmt;

use async_trait::async_trait;

use crate::error::ChannelError;

/// Transport used to reach a trusted contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Sms,
    WhatsApp,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Sms => "sms",
            ChannelKind::WhatsApp => "whatsapp",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for channels that deliver one text message to one phone number.
///
/// Sends are best-effort: an `Err` means this attempt failed and will not be
/// retried by the caller.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Which transport this channel uses.
    fn kind(&self) -> ChannelKind;

    /// Get the name of this channel (for logs).
    fn name(&self) -> &'static str;

    /// Send `body` to the phone number `to`.
    async fn send(&self, to: &str, body: &str) -> Result<(), ChannelError>;
}
