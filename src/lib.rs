// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod cycle;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod notify;
pub mod scheduler;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::config::AlertConfig;
pub use crate::cycle::{AlertCycle, AlertCycleResult, CycleOutcome, CycleSettings, CycleState};
pub use crate::feed::{SeismicEvent, SeismicFeed};
pub use crate::notify::{ChannelSender, ChannelTarget, Notifier};
pub use crate::scheduler::Scheduler;
pub use crate::store::{AnnouncedSet, AnnouncedStore};

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::feed::EmscFeedClient;
use crate::notify::TelegramSender;
use crate::store::JsonFileStore;

/// Wire the production controller: EMSC feed, JSON file store, Telegram sender.
pub fn build_alert_cycle(cfg: &AlertConfig) -> anyhow::Result<AlertCycle> {
    let feed = EmscFeedClient::new(cfg.feed_endpoint.clone(), cfg.request_timeout())
        .context("building feed http client")?;
    let sender = TelegramSender::new(cfg.bot_token.clone())
        .with_api_base(cfg.telegram_api_base.clone())
        .with_timeout(cfg.request_timeout_secs);
    let store = JsonFileStore::new(cfg.store_path.clone());

    info!(
        endpoint = %cfg.feed_endpoint,
        store = %cfg.store_path.display(),
        channels = cfg.channel_ids.len(),
        min_magnitude = cfg.min_magnitude,
        token_len = cfg.bot_token.len(),
        "alert cycle configured"
    );

    Ok(AlertCycle::new(
        CycleSettings::from_config(cfg),
        Arc::new(feed),
        Arc::new(store),
        Notifier::new(Arc::new(sender)),
    ))
}
