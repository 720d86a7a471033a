//! Discord webhook channel.
//!
//! The transport's base URL is the webhook URL itself, so the message is
//! posted to the empty path.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::Notifier;
use crate::http::Transport;
use crate::types::ApiError;

#[derive(Debug, Serialize)]
struct DiscordMessage<'a> {
    content: &'a str,
}

pub struct DiscordNotifier {
    transport: Arc<dyn Transport>,
}

impl DiscordNotifier {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "Discord"
    }

    async fn send_message(&self, message: &str) -> Result<(), ApiError> {
        let payload = serde_json::to_value(DiscordMessage { content: message })
            .map_err(|e| ApiError::decode("marshal discord message", e))?;
        self.transport.post_json("", &payload).await?;
        Ok(())
    }
}
