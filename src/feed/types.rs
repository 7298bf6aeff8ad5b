// src/feed/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// One earthquake as reported by the feed. Built fresh on every fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicEvent {
    /// Feed-unique identifier; `None` when the feed omitted it.
    pub id: Option<String>,
    pub magnitude: f64,
    pub magnitude_type: String, // e.g. "mb", "Mw", "ML"
    pub depth_km: Option<f64>,
    pub region: String,
    pub time: Option<DateTime<Utc>>,
    pub coordinates: Option<Coordinates>,
}

/// Results always come back newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub min_magnitude: f64,
    pub limit: u32,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl FeedQuery {
    /// Query used by the alert cycle: newest `limit` events up to `end`.
    pub fn alerts(min_magnitude: f64, limit: u32, end: DateTime<Utc>) -> Self {
        Self {
            min_magnitude,
            limit,
            start: None,
            end: Some(end),
        }
    }
}

#[async_trait::async_trait]
pub trait SeismicFeed: Send + Sync {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<SeismicEvent>, FetchError>;
    fn name(&self) -> &'static str;
}
