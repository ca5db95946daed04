use async_trait::async_trait;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::{debug, info};

use super::Notifier;
use crate::config::{ChatTarget, Destination};
use crate::errors::MonitorError;

/// Telegram's hard limit is 4096; leave some headroom.
const MAX_MESSAGE_LEN: usize = 4000;

/// Sends reports through the Telegram Bot API. Each destination carries its
/// own bot token, so a `Bot` is built per delivery on a shared HTTP client.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_url: Option<reqwest::Url>,
}

impl TelegramNotifier {
    pub fn new(timeout: Duration, api_url: Option<&str>) -> Result<Self, MonitorError> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(timeout)
            .build()
            .map_err(|e| MonitorError::Delivery(format!("failed to build HTTP client: {}", e)))?;
        let api_url = api_url
            .map(reqwest::Url::parse)
            .transpose()
            .map_err(|e| MonitorError::Delivery(format!("invalid Telegram API URL: {}", e)))?;
        Ok(Self { client, api_url })
    }

    fn bot(&self, token: &str) -> Bot {
        let bot = Bot::with_client(token, self.client.clone());
        match &self.api_url {
            Some(url) => bot.set_api_url(url.clone()),
            None => bot,
        }
    }
}

fn recipient(chat: &ChatTarget) -> Recipient {
    match chat {
        ChatTarget::Id(id) => Recipient::Id(ChatId(*id)),
        ChatTarget::Username(name) => match name.parse::<i64>() {
            Ok(id) => Recipient::Id(ChatId(id)),
            Err(_) => Recipient::ChannelUsername(name.clone()),
        },
    }
}

/// Split long messages for Telegram's length limit
fn split_message(text: &str, max_len: usize) -> Vec<String> {
    if text.len() <= max_len {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        // Walk back to a valid UTF-8 char boundary so slicing doesn't panic
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        let actual_end = if end < text.len() {
            text[start..end]
                .rfind('\n')
                .map(|pos| start + pos + 1)
                .unwrap_or(end)
        } else {
            end
        };

        chunks.push(text[start..actual_end].to_string());
        start = actual_end;
    }

    chunks
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, destination: &Destination, text: &str) -> Result<(), MonitorError> {
        let bot = self.bot(&destination.bot_token);
        let chunks = split_message(text, MAX_MESSAGE_LEN);
        debug!(
            "Sending {} message chunk(s) to {}",
            chunks.len(),
            destination.chat
        );

        for chunk in chunks {
            bot.send_message(recipient(&destination.chat), chunk)
                .await
                .map_err(|e| MonitorError::Delivery(e.to_string()))?;
        }

        info!("Notification delivered to {}", destination.chat);
        Ok(())
    }
}
