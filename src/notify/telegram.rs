use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChannelSender, ChannelTarget};
use crate::error::DispatchError;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API `sendMessage` transport.
#[derive(Clone)]
pub struct TelegramSender {
    api_base: String,
    token: String,
    client: Client,
    timeout: Duration,
    max_attempts: u8,
}

impl TelegramSender {
    pub fn new(token: String) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_attempts: 2,
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Total attempts per channel, including the first. Clamped to at least 1.
    pub fn with_attempts(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    fn url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    async fn send_once(&self, payload: &SendMessage<'_>) -> Result<(), DispatchError> {
        let rsp = self
            .client
            .post(self.url())
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            // reqwest errors can carry the URL, and the URL carries the token
            .map_err(|e| DispatchError::Transport(e.without_url()))?;

        let status = rsp.status();
        let body: Option<ApiReply> = rsp.json().await.ok();
        match body {
            Some(ApiReply { ok: true, .. }) if status.is_success() => Ok(()),
            other => Err(DispatchError::Rejected {
                status: status.as_u16(),
                description: other
                    .and_then(|r| r.description)
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a ChannelTarget,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Deserialize)]
struct ApiReply {
    ok: bool,
    description: Option<String>,
}

fn is_retryable(e: &DispatchError) -> bool {
    match e {
        DispatchError::Transport(_) => true,
        DispatchError::Rejected { status, .. } => *status == 429 || *status >= 500,
        DispatchError::Aborted(_) => false,
    }
}

#[async_trait::async_trait]
impl ChannelSender for TelegramSender {
    async fn send(&self, target: &ChannelTarget, message: &str) -> Result<(), DispatchError> {
        let payload = SendMessage {
            chat_id: target,
            text: message,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            match self.send_once(&payload).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_attempts && is_retryable(&e) => {
                    tracing::debug!(target: "notify", channel = %target, attempt, error = %e, "retrying send");
                    tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
