//! Run exactly one alert cycle with the configured feed, store and channels,
//! then print what happened. Handy after deploys or config changes.

use anyhow::Context;
use seismic_alert::{build_alert_cycle, AlertConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = AlertConfig::load().context("loading alert configuration")?;
    let cycle = build_alert_cycle(&cfg)?;
    let res = cycle.run_cycle().await;

    println!("{}", serde_json::to_string_pretty(&res)?);
    Ok(())
}
