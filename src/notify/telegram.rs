//! Telegram bot channel.
//!
//! API: `https://api.telegram.org/bot<token>/sendMessage`. The bot token is
//! part of the URL, so the transport is built from a secret URL and errors
//! never include it.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;

use super::Notifier;
use crate::http::Transport;
use crate::types::ApiError;

const API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramNotifier {
    transport: Arc<dyn Transport>,
    chat_id: SecretString,
}

impl TelegramNotifier {
    pub fn new(transport: Arc<dyn Transport>, chat_id: SecretString) -> Self {
        Self { transport, chat_id }
    }

    /// Endpoint the transport must be bound to for `bot_token`.
    pub fn endpoint(bot_token: &SecretString) -> SecretString {
        SecretString::new(format!(
            "{API_URL}/bot{}/sendMessage",
            bot_token.expose_secret()
        ))
    }

    /// Telegram gets plain text: drop the Markdown headers and bold markers
    /// used for Discord.
    fn plain_text(message: &str) -> String {
        message
            .replace('#', "")
            .replace('*', "")
            .replace("\n ", "\n")
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "Telegram"
    }

    async fn send_message(&self, message: &str) -> Result<(), ApiError> {
        let text = Self::plain_text(message);
        let payload = serde_json::to_value(TelegramMessage {
            chat_id: self.chat_id.expose_secret(),
            text: &text,
        })
        .map_err(|e| ApiError::decode("marshal telegram message", e))?;
        self.transport.post_json("", &payload).await?;
        Ok(())
    }
}
