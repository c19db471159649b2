// src/scheduler.rs
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;

use crate::manager::QuakesFeedManager;

#[derive(Clone, Copy, Debug)]
pub struct PollerCfg {
    pub interval_secs: u64,
}

/// Spawn a loop polling `manager` every `cfg.interval_secs`. The first poll runs
/// immediately. Each update is awaited before the next tick, so polls never overlap.
pub fn spawn_poller(mut manager: QuakesFeedManager, cfg: PollerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let summary = manager.update().await;

            counter!("quakes_poll_runs_total").increment(1);
            tracing::info!(
                target: "quakes",
                status = summary.status.as_str(),
                generated = summary.generated.len(),
                updated = summary.updated.len(),
                removed = summary.removed.len(),
                last_timestamp = ?summary.last_timestamp,
                "quakes poll tick"
            );
        }
    })
}
