//! Telegram Bot API delivery.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{AvailabilityNotice, NotifyError, Notifier};
use crate::db::User;

/// Telegram adapter settings.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot API base URL.
    pub api_url: String,
    /// Bot token.
    pub token: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends notices as Telegram chat messages.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The endpoint embeds the bot token.
        f.debug_struct("TelegramNotifier").finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(NotifyError::Transport)?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                config.token
            ),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, user: &User, notice: &AvailabilityNotice) -> Result<(), NotifyError> {
        let text = notice.render_html(user);
        let body = SendMessage {
            chat_id: user.id,
            text: &text,
            parse_mode: "HTML",
        };

        debug!(user_id = user.id, plan_code = %notice.plan_code, "Sending notice");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(NotifyError::Transport)?;

        let status = response.status();
        let reply = response.json::<BotResponse>().await.ok();

        match reply {
            Some(BotResponse { ok: true, .. }) if status.is_success() => Ok(()),
            reply => {
                let description = reply
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| "no description".to_string());
                error!(
                    user_id = user.id,
                    status = %status,
                    description = %description,
                    "Telegram rejected message"
                );
                Err(NotifyError::Rejected {
                    status: status.as_u16(),
                    description,
                })
            }
        }
    }
}
