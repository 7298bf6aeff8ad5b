use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metric descriptions so every series shows up on /metrics.
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("alert_cycles_total", "Alert cycles run, by outcome.");
        describe_counter!("alert_events_fetched_total", "Events returned by the feed.");
        describe_counter!("alert_events_new_total", "Events not announced before.");
        describe_counter!(
            "alert_unidentified_events_total",
            "Events without an identifier (dispatched, never deduplicated)."
        );
        describe_counter!("alert_dispatch_total", "Successful channel sends.");
        describe_counter!("alert_dispatch_failures_total", "Failed channel sends.");
        describe_counter!("alert_fetch_errors_total", "Cycles skipped because the feed failed.");
        describe_counter!("alert_persist_errors_total", "Announced-set writes that failed.");
        describe_counter!("feed_events_total", "Events decoded from feed responses.");
        describe_counter!("feed_skipped_features_total", "Feed records skipped as unreadable.");
        describe_histogram!("alert_cycle_ms", "Alert cycle duration in milliseconds.");
        describe_histogram!("feed_fetch_ms", "Feed request duration in milliseconds.");
        describe_gauge!("alert_cycle_last_run_ts", "Unix ts when the last alert cycle started.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once, from the binary.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
