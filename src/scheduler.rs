// src/scheduler.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::cycle::AlertCycle;

/// Ticks the alert cycle on a fixed start-to-start interval.
///
/// The first cycle runs immediately. The next tick is only awaited after the
/// current cycle returns, so cycles never overlap; ticks missed by an
/// overrunning cycle are skipped rather than bunched up.
pub struct Scheduler {
    cycle: Arc<AlertCycle>,
    interval: Duration,
}

impl Scheduler {
    /// A zero `interval` is bumped to 1ms (tokio intervals must be non-zero).
    pub fn new(cycle: Arc<AlertCycle>, interval: Duration) -> Self {
        Self {
            cycle,
            interval: interval.max(Duration::from_millis(1)),
        }
    }

    /// Run until `shutdown` resolves. An in-flight cycle is finished first.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(target: "scheduler", interval_secs = self.interval.as_secs(), "alert scheduler started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            // Own task, so a panicking cycle can't take the loop down with it.
            let cycle = Arc::clone(&self.cycle);
            match tokio::spawn(async move { cycle.run_cycle().await }).await {
                Ok(res) => {
                    tracing::debug!(target: "scheduler", outcome = ?res.outcome, "tick done");
                }
                Err(e) => {
                    tracing::error!(target: "scheduler", error = %e, "alert cycle panicked; continuing");
                }
            }
        }
        tracing::info!(target: "scheduler", "alert scheduler stopped");
    }

    /// Detach the scheduler onto the runtime; it runs until aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run_until(std::future::pending()))
    }
}
