//! Channel that only logs, used when a provider is not configured.

use async_trait::async_trait;

use super::{ChannelKind, NotifyChannel};
use crate::error::ChannelError;

/// A logging channel for development that logs every message instead of sending it.
#[derive(Debug, Clone)]
pub struct LoggingChannel {
    kind: ChannelKind,
}

impl LoggingChannel {
    pub fn new(kind: ChannelKind) -> Self {
        Self { kind }
    }
}

#[async_trait]
impl NotifyChannel for LoggingChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn name(&self) -> &'static str {
        match self.kind {
            ChannelKind::Sms => "logging-sms",
            ChannelKind::WhatsApp => "logging-whatsapp",
        }
    }

    async fn send(&self, to: &str, body: &str) -> Result<(), ChannelError> {
        tracing::info!("[{}] Mock message to {}: {}", self.kind, to, body);
        Ok(())
    }
}
