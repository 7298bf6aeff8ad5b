// tests/common/mod.rs
// Shared fakes for the alert pipeline integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use seismic_alert::error::{DispatchError, FetchError, PersistError};
use seismic_alert::feed::FeedQuery;
use seismic_alert::store::{AnnouncedSet, AnnouncedStore, LoadedSet, MemoryStore};
use seismic_alert::{
    AlertCycle, ChannelSender, ChannelTarget, CycleSettings, Notifier, SeismicEvent, SeismicFeed,
};

pub fn event(id: Option<&str>, magnitude: f64) -> SeismicEvent {
    SeismicEvent {
        id: id.map(str::to_string),
        magnitude,
        magnitude_type: "mb".into(),
        depth_km: Some(10.0),
        region: "AZORES ISLANDS REGION".into(),
        time: None,
        coordinates: None,
    }
}

pub fn channels(ids: &[i64]) -> Vec<ChannelTarget> {
    ids.iter().copied().map(ChannelTarget::Numeric).collect()
}

#[derive(Default)]
pub struct FakeFeed {
    pub events: Mutex<Vec<SeismicEvent>>,
    pub fail: AtomicBool,
    pub queries: Mutex<Vec<FeedQuery>>,
}

impl FakeFeed {
    pub fn with(events: Vec<SeismicEvent>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(events),
            ..Self::default()
        })
    }
}

#[async_trait::async_trait]
impl SeismicFeed for FakeFeed {
    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<SeismicEvent>, FetchError> {
        self.queries.lock().push(query.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(FetchError::Status { status: 503 });
        }
        Ok(self.events.lock().clone())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Records every send; channels in `failing` get a rejection instead.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(ChannelTarget, String)>>,
    pub failing: HashSet<ChannelTarget>,
}

impl RecordingSender {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(targets: &[ChannelTarget]) -> Arc<Self> {
        Arc::new(Self {
            failing: targets.iter().cloned().collect(),
            ..Self::default()
        })
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn sent_to(&self, target: &ChannelTarget) -> usize {
        self.sent.lock().iter().filter(|(t, _)| t == target).count()
    }
}

#[async_trait::async_trait]
impl ChannelSender for RecordingSender {
    async fn send(&self, target: &ChannelTarget, message: &str) -> Result<(), DispatchError> {
        if self.failing.contains(target) {
            return Err(DispatchError::Rejected {
                status: 403,
                description: "Forbidden: bot is not a member of the channel chat".into(),
            });
        }
        self.sent.lock().push((target.clone(), message.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Memory store whose `save` can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_saves: AtomicBool,
    pub save_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl AnnouncedStore for FlakyStore {
    async fn load(&self) -> LoadedSet {
        self.inner.load().await
    }

    async fn save(&self, set: &AnnouncedSet) -> Result<(), PersistError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(PersistError::Io {
                path: "announced.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            });
        }
        self.inner.save(set).await
    }
}

pub fn cycle_with(
    feed: Arc<dyn SeismicFeed>,
    store: Arc<dyn AnnouncedStore>,
    sender: Arc<dyn ChannelSender>,
    targets: Vec<ChannelTarget>,
) -> AlertCycle {
    let settings = CycleSettings {
        min_magnitude: 6.0,
        feed_limit: 10,
        channels: targets,
    };
    AlertCycle::new(settings, feed, store, Notifier::new(sender))
}

/// Serve `router` on an ephemeral localhost port.
pub async fn serve(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
