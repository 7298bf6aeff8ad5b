//! Alert cycle controller.
//!
//! One cycle: load the announced set, fetch candidate events, drop the ones
//! already announced, broadcast the rest, then persist the grown set.
//!
//! Delivery is at most once per identifier as long as the store write
//! succeeds. A failed write means the next cycle reloads the previous set and
//! may announce the same events again (at least once, for that failure only).

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::Serialize;

use crate::config::AlertConfig;
use crate::feed::{FeedQuery, SeismicEvent, SeismicFeed};
use crate::metrics::ensure_metrics_described;
use crate::notify::{render_alert, ChannelTarget, Notifier};
use crate::store::{AnnouncedSet, AnnouncedStore, LoadStatus, LoadedSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Idle,
    LoadingState,
    Fetching,
    Filtering,
    Dispatching,
    Persisting,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleState::Idle => "idle",
            CycleState::LoadingState => "loading_state",
            CycleState::Fetching => "fetching",
            CycleState::Filtering => "filtering",
            CycleState::Dispatching => "dispatching",
            CycleState::Persisting => "persisting",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Everything ran; individual channel sends may still have failed.
    Completed,
    /// Feed unavailable; nothing was sent or stored.
    FeedUnavailable,
    /// Messages went out but the announced set was not saved.
    PersistFailed,
}

/// What a single cycle did. Kept for logs, metrics and `/status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertCycleResult {
    pub started_at: DateTime<Utc>,
    pub outcome: CycleOutcome,
    pub fetched: usize,
    pub new: usize,
    pub already_announced: usize,
    /// Repeats of an id already seen earlier in the same response.
    pub duplicates_in_batch: usize,
    /// New events without an identifier (sent, never deduplicated).
    pub unidentified: usize,
    /// Events broadcast this cycle.
    pub dispatched: usize,
    pub send_attempts: usize,
    pub send_failures: usize,
    /// Whether the announced set was written this cycle.
    pub saved: bool,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl AlertCycleResult {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            outcome: CycleOutcome::Completed,
            fetched: 0,
            new: 0,
            already_announced: 0,
            duplicates_in_batch: 0,
            unidentified: 0,
            dispatched: 0,
            send_attempts: 0,
            send_failures: 0,
            saved: false,
            errors: Vec::new(),
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CycleSettings {
    pub min_magnitude: f64,
    pub feed_limit: u32,
    pub channels: Vec<ChannelTarget>,
}

impl CycleSettings {
    pub fn from_config(cfg: &AlertConfig) -> Self {
        Self {
            min_magnitude: cfg.min_magnitude,
            feed_limit: cfg.feed_limit,
            channels: cfg.channel_ids.clone(),
        }
    }
}

/// Events split by the filtering step, in feed order.
#[derive(Debug)]
pub struct Partition<'a> {
    pub fresh: Vec<&'a SeismicEvent>,
    pub already_announced: usize,
    pub duplicates_in_batch: usize,
    pub unidentified: usize,
}

/// An id repeated within one batch only goes out once.
pub fn partition_new<'a>(events: &'a [SeismicEvent], announced: &AnnouncedSet) -> Partition<'a> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut part = Partition {
        fresh: Vec::with_capacity(events.len()),
        already_announced: 0,
        duplicates_in_batch: 0,
        unidentified: 0,
    };

    for ev in events {
        match ev.id.as_deref() {
            Some(id) if announced.contains(id) => part.already_announced += 1,
            Some(id) if !seen.insert(id) => part.duplicates_in_batch += 1,
            Some(_) => part.fresh.push(ev),
            None => {
                tracing::warn!(
                    target: "alert",
                    region = %ev.region,
                    magnitude = ev.magnitude,
                    "event without identifier; sending without dedup"
                );
                part.unidentified += 1;
                part.fresh.push(ev);
            }
        }
    }
    part
}

/// Resets the controller to `Idle` however the cycle ends.
struct IdleOnDrop<'a>(&'a Mutex<CycleState>);

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        // a poisoned lock still gets reset
        let mut st = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *st = CycleState::Idle;
    }
}

pub struct AlertCycle {
    feed: Arc<dyn SeismicFeed>,
    store: Arc<dyn AnnouncedStore>,
    notifier: Notifier,
    settings: CycleSettings,
    state: Mutex<CycleState>,
    last: RwLock<Option<AlertCycleResult>>,
}

impl AlertCycle {
    pub fn new(
        settings: CycleSettings,
        feed: Arc<dyn SeismicFeed>,
        store: Arc<dyn AnnouncedStore>,
        notifier: Notifier,
    ) -> Self {
        ensure_metrics_described();
        Self {
            feed,
            store,
            notifier,
            settings,
            state: Mutex::new(CycleState::Idle),
            last: RwLock::new(None),
        }
    }

    pub fn state(&self) -> CycleState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Result of the most recent finished cycle.
    pub fn last_result(&self) -> Option<AlertCycleResult> {
        self.last.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn enter(&self, next: CycleState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
        tracing::trace!(target: "alert", state = %next, "cycle state");
    }

    pub async fn run_cycle(&self) -> AlertCycleResult {
        self.run_cycle_at(Utc::now()).await
    }

    /// Run one cycle with `started_at` as the feed's upper time bound.
    pub async fn run_cycle_at(&self, started_at: DateTime<Utc>) -> AlertCycleResult {
        let _idle = IdleOnDrop(&self.state);
        let t0 = Instant::now();
        let mut result = AlertCycleResult::new(started_at);

        self.enter(CycleState::LoadingState);
        let LoadedSet {
            set: mut announced,
            status,
        } = self.store.load().await;

        self.enter(CycleState::Fetching);
        let query = FeedQuery::alerts(
            self.settings.min_magnitude,
            self.settings.feed_limit,
            started_at,
        );
        let events = match self.feed.fetch(&query).await {
            Ok(events) => events,
            Err(e) => {
                counter!("alert_fetch_errors_total").increment(1);
                tracing::warn!(target: "alert", feed = self.feed.name(), error = %e, "feed fetch failed; cycle skipped");
                result.outcome = CycleOutcome::FeedUnavailable;
                result.errors.push(e.to_string());
                return self.finish(result, t0);
            }
        };
        result.fetched = events.len();

        self.enter(CycleState::Filtering);
        let part = partition_new(&events, &announced);
        result.new = part.fresh.len();
        result.already_announced = part.already_announced;
        result.duplicates_in_batch = part.duplicates_in_batch;
        result.unidentified = part.unidentified;

        self.enter(CycleState::Dispatching);
        for ev in &part.fresh {
            let message = render_alert(ev);
            let outcomes = self.notifier.dispatch(&self.settings.channels, &message).await;
            let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();

            result.dispatched += 1;
            result.send_attempts += outcomes.len();
            result.send_failures += failed;
            for (target, res) in outcomes {
                if let Err(e) = res {
                    result.errors.push(format!("channel {target}: {e}"));
                }
            }

            tracing::info!(
                target: "alert",
                id = ev.id.as_deref().unwrap_or("-"),
                region = %ev.region,
                magnitude = ev.magnitude,
                channels = self.settings.channels.len(),
                failed,
                "alert dispatched"
            );
        }

        self.enter(CycleState::Persisting);
        let mut added = 0usize;
        for id in part.fresh.iter().filter_map(|ev| ev.id.as_deref()) {
            if announced.insert(id) {
                added += 1;
            }
        }

        // A missing or corrupt store is rewritten even if nothing was added.
        if added > 0 || status != LoadStatus::Loaded {
            match self.store.save(&announced).await {
                Ok(()) => result.saved = true,
                Err(e) => {
                    counter!("alert_persist_errors_total").increment(1);
                    tracing::error!(
                        target: "alert",
                        error = %e,
                        unsaved = added,
                        "saving announced set failed; these events may be announced again"
                    );
                    result.outcome = CycleOutcome::PersistFailed;
                    result.errors.push(e.to_string());
                }
            }
        }

        self.finish(result, t0)
    }

    fn finish(&self, mut result: AlertCycleResult, t0: Instant) -> AlertCycleResult {
        let elapsed = t0.elapsed();
        result.duration_ms = elapsed.as_millis() as u64;

        let outcome = match result.outcome {
            CycleOutcome::Completed => "completed",
            CycleOutcome::FeedUnavailable => "feed_unavailable",
            CycleOutcome::PersistFailed => "persist_failed",
        };
        counter!("alert_cycles_total", "outcome" => outcome).increment(1);
        counter!("alert_events_fetched_total").increment(result.fetched as u64);
        counter!("alert_events_new_total").increment(result.new as u64);
        counter!("alert_unidentified_events_total").increment(result.unidentified as u64);
        histogram!("alert_cycle_ms").record(elapsed.as_secs_f64() * 1_000.0);
        gauge!("alert_cycle_last_run_ts").set(result.started_at.timestamp() as f64);

        tracing::info!(
            target: "alert",
            outcome,
            fetched = result.fetched,
            new = result.new,
            duplicates = result.duplicates_in_batch,
            dispatched = result.dispatched,
            send_failures = result.send_failures,
            saved = result.saved,
            ms = result.duration_ms,
            "alert cycle finished"
        );

        *self.last.write().unwrap_or_else(|e| e.into_inner()) = Some(result.clone());
        result
    }
}
