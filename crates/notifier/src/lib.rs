//! Notification channels for Asfalis emergency alerts.
//!
//! This crate provides the outbound side of an alert: text channels that reach
//! a trusted contact's phone (SMS and WhatsApp through Twilio) and a push
//! sender for the user's own device (FCM).
//!
//! Every send is best-effort. Callers decide how failures are logged; nothing
//! here retries.
//!
//! # Example
//!
//! ```no_run
//! use notifier::{Notifier, NotifierConfig};
//!
//! # async fn example() -> Result<(), notifier::ChannelError> {
//! let notifier = Notifier::from_config(NotifierConfig::from_env());
//!
//! for channel in notifier.channels() {
//!     channel.send("+1234567890", "Hello!").await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod channels;
pub mod config;
pub mod error;
pub mod push;

pub use channels::logging::LoggingChannel;
pub use channels::twilio::{SmsChannel, WhatsAppChannel};
pub use channels::{ChannelKind, NotifyChannel};
pub use config::{FcmConfig, NotifierConfig, TwilioConfig};
pub use error::ChannelError;
pub use push::{FcmPushSender, LoggingPushSender, PushMessage, PushSender};

use std::sync::Arc;

use tracing::{info, warn};

/// The set of channels an alert is fanned out over.
#[derive(Clone)]
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    push: Arc<dyn PushSender>,
}

impl Notifier {
    /// Build channels from provider configuration.
    ///
    /// SMS and WhatsApp are always present; a channel whose credentials are
    /// missing degrades to a [`LoggingChannel`].
    pub fn from_config(config: NotifierConfig) -> Self {
        let sms: Arc<dyn NotifyChannel> = match config.twilio.clone().map(SmsChannel::new) {
            Some(Ok(channel)) => {
                info!("Twilio SMS channel enabled");
                Arc::new(channel)
            }
            Some(Err(e)) => {
                warn!(error = %e, "Twilio SMS unavailable, logging instead");
                Arc::new(LoggingChannel::new(ChannelKind::Sms))
            }
            None => {
                warn!("Twilio not configured, SMS will be logged only");
                Arc::new(LoggingChannel::new(ChannelKind::Sms))
            }
        };

        let whatsapp: Arc<dyn NotifyChannel> = match config.twilio.map(WhatsAppChannel::new) {
            Some(Ok(channel)) => {
                info!("Twilio WhatsApp channel enabled");
                Arc::new(channel)
            }
            Some(Err(e)) => {
                warn!(error = %e, "Twilio WhatsApp unavailable, logging instead");
                Arc::new(LoggingChannel::new(ChannelKind::WhatsApp))
            }
            None => Arc::new(LoggingChannel::new(ChannelKind::WhatsApp)),
        };

        let push: Arc<dyn PushSender> = match config.fcm.map(FcmPushSender::new) {
            Some(Ok(sender)) => {
                info!("FCM push enabled");
                Arc::new(sender)
            }
            Some(Err(e)) => {
                warn!(error = %e, "FCM unavailable, logging instead");
                Arc::new(LoggingPushSender)
            }
            None => {
                warn!("FCM not configured, push notifications will be logged only");
                Arc::new(LoggingPushSender)
            }
        };

        Self::with_channels(vec![sms, whatsapp], push)
    }

    /// Create a notifier with specific channels.
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>, push: Arc<dyn PushSender>) -> Self {
        Self { channels, push }
    }

    /// Contact-facing channels, in fan-out order.
    pub fn channels(&self) -> &[Arc<dyn NotifyChannel>] {
        &self.channels
    }

    /// Push sender for the user's own device.
    pub fn push(&self) -> &Arc<dyn PushSender> {
        &self.push
    }

    /// Get the number of contact-facing channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
