//! Seismic alert daemon: binary entrypoint.
//! Polls the feed on a fixed interval and broadcasts new strong earthquakes.
//!
//! Operational note: delivery is at most once per event while the store file
//! can be written. If a write fails, events from that cycle may be announced a
//! second time on the next tick.

use std::sync::Arc;

use anyhow::Context;
use seismic_alert::api::{self, AppState};
use seismic_alert::metrics::Metrics;
use seismic_alert::{build_alert_cycle, AlertConfig, Scheduler};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `RUST_LOG` controls verbosity; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("seismic_alert=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "ctrl-c handler failed; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AlertConfig::load().context("loading alert configuration")?;
    let metrics = Metrics::init().context("installing metrics recorder")?;
    let cycle = Arc::new(build_alert_cycle(&cfg)?);

    if let Some(addr) = cfg.http_addr {
        let router = api::create_router(AppState {
            cycle: Arc::clone(&cycle),
        })
        .merge(metrics.router());
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding status listener on {addr}"))?;
        tracing::info!(%addr, "status listener up");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "status listener stopped");
            }
        });
    }

    Scheduler::new(cycle, cfg.poll_interval())
        .run_until(shutdown_signal())
        .await;
    Ok(())
}
