// src/notify/mod.rs
pub mod render;
pub mod telegram;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::error::DispatchError;

pub use render::render_alert;
pub use telegram::TelegramSender;

/// Where a message goes. Telegram accepts numeric chat ids and `@channel` names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelTarget {
    Numeric(i64),
    Named(String),
}

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTarget::Numeric(id) => write!(f, "{id}"),
            ChannelTarget::Named(name) => f.write_str(name),
        }
    }
}

impl FromStr for ChannelTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        if t.is_empty() {
            return Err("empty channel id".to_string());
        }
        Ok(match t.parse::<i64>() {
            Ok(id) => ChannelTarget::Numeric(id),
            Err(_) => ChannelTarget::Named(t.to_string()),
        })
    }
}

/// Parse a comma separated channel list, skipping blanks.
pub fn parse_channel_list(raw: &str) -> Vec<ChannelTarget> {
    raw.split(',')
        .filter_map(|part| part.parse().ok())
        .collect()
}

/// Transport for a single message to a single channel.
#[async_trait::async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send(&self, target: &ChannelTarget, message: &str) -> Result<(), DispatchError>;
    fn name(&self) -> &'static str;
}

pub type DispatchOutcome = (ChannelTarget, Result<(), DispatchError>);

/// Fans one message out to many channels. Channels never affect each other.
#[derive(Clone)]
pub struct Notifier {
    sender: Arc<dyn ChannelSender>,
}

impl Notifier {
    pub fn new(sender: Arc<dyn ChannelSender>) -> Self {
        Self { sender }
    }

    /// Send `message` to every target concurrently and wait for all of them.
    /// Outcomes come back in target order.
    pub async fn dispatch(&self, targets: &[ChannelTarget], message: &str) -> Vec<DispatchOutcome> {
        let message: Arc<str> = Arc::from(message);
        let mut set = JoinSet::new();
        for (idx, target) in targets.iter().cloned().enumerate() {
            let sender = Arc::clone(&self.sender);
            let message = Arc::clone(&message);
            set.spawn(async move {
                let res = sender.send(&target, &message).await;
                (idx, res)
            });
        }

        let mut results: Vec<Option<Result<(), DispatchError>>> =
            targets.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, res)) => results[idx] = Some(res),
                Err(e) => tracing::error!(target: "notify", error = %e, "send task failed"),
            }
        }

        targets
            .iter()
            .cloned()
            .zip(results)
            .map(|(target, res)| {
                let res = res.unwrap_or_else(|| {
                    Err(DispatchError::Aborted("task ended without a result".into()))
                });
                match &res {
                    Ok(()) => {
                        counter!("alert_dispatch_total").increment(1);
                        tracing::debug!(target: "notify", channel = %target, sender = self.sender.name(), "sent");
                    }
                    Err(e) => {
                        counter!("alert_dispatch_failures_total").increment(1);
                        tracing::warn!(target: "notify", channel = %target, sender = self.sender.name(), error = %e, "send failed");
                    }
                }
                (target, res)
            })
            .collect()
    }
}
