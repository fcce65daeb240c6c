//! Telegram Bot API notifier
//!
//! Posts to `sendMessage` with HTML parse mode. Delivery counts as
//! successful only when the HTTP status is 2xx and the response body
//! carries `"ok": true`.

use super::error::ScanError;
use super::notifier::Notifier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: reqwest::Client,
    api_url: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier for one bot/chat pair
    ///
    /// # Arguments
    /// * `bot_token` - token from BotFather
    /// * `chat_id` - numeric chat or `@channel` name
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self, ScanError> {
        Self::with_base_url(TELEGRAM_API, bot_token, chat_id)
    }

    pub fn with_base_url(base_url: &str, bot_token: &str, chat_id: &str) -> Result<Self, ScanError> {
        if bot_token.trim().is_empty() || chat_id.trim().is_empty() {
            return Err(ScanError::Configuration(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID are required".into(),
            ));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScanError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: format!(
                "{}/bot{}/sendMessage",
                base_url.trim_end_matches('/'),
                bot_token.trim()
            ),
            chat_id: chat_id.trim().to_string(),
        })
    }

    async fn post(&self, text: &str) -> Result<(), ScanError> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
        };

        let response = self.http.post(&self.api_url).json(&request).send().await?;
        let status = response.status();
        let body: SendMessageResponse = response.json().await?;

        if !status.is_success() || !body.ok {
            return Err(ScanError::TransientFetch(format!(
                "Telegram API error {}: {}",
                status,
                body.description.unwrap_or_default()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> bool {
        match self.post(text).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("❌ Telegram delivery failed: {}", e);
                false
            }
        }
    }
}
