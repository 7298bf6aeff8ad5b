// tests/scheduler.rs
mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{channels, cycle_with, event, FakeFeed, RecordingSender};
use seismic_alert::error::FetchError;
use seismic_alert::feed::FeedQuery;
use seismic_alert::store::MemoryStore;
use seismic_alert::{CycleState, Scheduler, SeismicEvent, SeismicFeed};
use tokio::sync::oneshot;

#[tokio::test(start_paused = true)]
async fn ticks_on_fixed_interval_until_shutdown() {
    let feed = FakeFeed::with(vec![event(Some("a"), 6.6)]);
    let sender = RecordingSender::new();
    let cycle = Arc::new(cycle_with(
        feed.clone(),
        Arc::new(MemoryStore::new()),
        sender.clone(),
        channels(&[1]),
    ));

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(Scheduler::new(cycle.clone(), Duration::from_secs(60)).run_until(
        async move {
            let _ = stop_rx.await;
        },
    ));

    // ticks at t=0, 60, 120
    tokio::time::sleep(Duration::from_secs(150)).await;
    stop_tx.send(()).unwrap();
    handle.await.unwrap();

    assert_eq!(feed.queries.lock().len(), 3);
    // announced once, then deduplicated on later ticks
    assert_eq!(sender.count(), 1);
    assert_eq!(cycle.state(), CycleState::Idle);
}

/// Panics on the first fetch, then behaves.
struct PanicsOnce {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl SeismicFeed for PanicsOnce {
    async fn fetch(&self, _query: &FeedQuery) -> Result<Vec<SeismicEvent>, FetchError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("feed decoder bug");
        }
        Ok(vec![event(Some("after-panic"), 6.2)])
    }

    fn name(&self) -> &'static str {
        "panics-once"
    }
}

#[tokio::test(start_paused = true)]
async fn keeps_ticking_after_a_panicking_cycle() {
    let feed = Arc::new(PanicsOnce {
        calls: AtomicUsize::new(0),
    });
    let sender = RecordingSender::new();
    let cycle = Arc::new(cycle_with(
        feed.clone(),
        Arc::new(MemoryStore::new()),
        sender.clone(),
        channels(&[1]),
    ));

    let handle = Scheduler::new(cycle.clone(), Duration::from_secs(30)).spawn();
    tokio::time::sleep(Duration::from_secs(45)).await;
    handle.abort();

    assert_eq!(feed.calls.load(Ordering::SeqCst), 2);
    assert_eq!(sender.count(), 1);
    assert_eq!(cycle.state(), CycleState::Idle);
}

/// Takes longer than the scheduler interval and tracks concurrent fetches.
#[derive(Default)]
struct SlowFeed {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait::async_trait]
impl SeismicFeed for SlowFeed {
    async fn fetch(&self, _query: &FeedQuery) -> Result<Vec<SeismicEvent>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(25)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test(start_paused = true)]
async fn overlong_cycle_does_not_overlap() {
    let feed = Arc::new(SlowFeed::default());
    let cycle = Arc::new(cycle_with(
        feed.clone(),
        Arc::new(MemoryStore::new()),
        RecordingSender::new(),
        channels(&[1]),
    ));

    // 10s interval, 25s cycles: missed ticks are skipped, so runs start at t=0, 30, 60, 90
    let handle = Scheduler::new(cycle, Duration::from_secs(10)).spawn();
    tokio::time::sleep(Duration::from_secs(100)).await;
    handle.abort();

    assert_eq!(feed.calls.load(Ordering::SeqCst), 4);
    assert_eq!(feed.max_in_flight.load(Ordering::SeqCst), 1);
}
