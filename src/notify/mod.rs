//! Notification channels.
//!
//! Defines the `Notifier` trait, the channels (Discord webhook, Telegram
//! bot) and the `Dispatcher` that sends one message to all of them.

pub mod composer;
pub mod discord;
pub mod telegram;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::engine::fanout::{CompositeError, FanOut, TaskError};
use crate::types::ApiError;

/// A destination for the daily digest.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name for logging and error context.
    fn name(&self) -> &str;

    async fn send_message(&self, message: &str) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// One channel that did not accept the message.
#[derive(Debug, thiserror::Error)]
#[error("send message to {channel}: {cause}")]
pub struct ChannelError {
    pub channel: String,
    pub cause: TaskError<ApiError>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no notification channels configured")]
    NoChannels,

    #[error("fail to send messages: {0}")]
    AllFailed(CompositeError<ChannelError>),
}

/// Outcome of a dispatch that reached at least one channel.
#[derive(Debug)]
pub struct Delivery {
    pub delivered: Vec<String>,
    /// Channels that failed while others succeeded. Also logged at `warn`.
    pub failed: Vec<ChannelError>,
}

impl Delivery {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Sends a message to every channel concurrently. Delivery to at least one
/// channel counts as success.
pub struct Dispatcher {
    channels: Vec<Arc<dyn Notifier>>,
    fan_out: FanOut,
}

impl Dispatcher {
    /// All channels are contacted at once.
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        let fan_out = FanOut::new(channels.len());
        Self { channels, fan_out }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.fan_out = self.fan_out.with_deadline(deadline);
        self
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    pub async fn dispatch(&self, message: &str) -> Result<Delivery, DispatchError> {
        if self.channels.is_empty() {
            return Err(DispatchError::NoChannels);
        }

        let message: Arc<str> = Arc::from(message);
        let report = self
            .fan_out
            .run(self.channels.clone(), move |channel| {
                let message = Arc::clone(&message);
                async move { channel.send_message(&message).await }
            })
            .await;

        let mut failures = Vec::new();
        let mut delivered = Vec::new();
        for (channel, slot) in self.channels.iter().zip(report.into_slots()) {
            match slot {
                Ok(()) => delivered.push(channel.name().to_string()),
                Err(cause) => failures.push(ChannelError {
                    channel: channel.name().to_string(),
                    cause,
                }),
            }
        }

        if delivered.is_empty() {
            return match CompositeError::from_errors(failures) {
                Some(composite) => Err(DispatchError::AllFailed(composite)),
                None => Err(DispatchError::NoChannels),
            };
        }

        for failure in &failures {
            warn!(
                channel = %failure.channel,
                error = %failure.cause,
                "Error on send a message, but at least one was sent"
            );
        }
        info!(delivered = ?delivered, failed = failures.len(), "Message dispatched");
        Ok(Delivery {
            delivered,
            failed: failures,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
