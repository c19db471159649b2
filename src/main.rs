//! quakes-poller — polls the GeoNet NZ quakes feed and logs new, updated and
//! removed quakes.
//!
//! Configuration is read from `$QUAKES_CONFIG_PATH` or `config/quakes.toml`.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use geonetnz_quakes::scheduler::{spawn_poller, PollerCfg};
use geonetnz_quakes::{config, HttpSource, LoggingHandler, QuakesFeed, QuakesFeedManager};

/// Compact logs by default, JSON when QUAKES_LOG_JSON=1.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("geonetnz_quakes=info,quakes=info,warn"));
    let json = std::env::var("QUAKES_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default()?;
    if let Some(addr) = cfg.metrics_addr {
        geonetnz_quakes::telemetry::install_exporter(addr)?;
    }

    let feed = QuakesFeed::new(cfg.feed_config()?, Box::new(HttpSource::new()))?;
    let manager = QuakesFeedManager::new(feed, Box::new(LoggingHandler));
    tracing::info!(%manager, interval_secs = cfg.interval_secs, "starting quakes poller");

    let poller = spawn_poller(
        manager,
        PollerCfg {
            interval_secs: cfg.interval_secs,
        },
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    poller.abort();
    Ok(())
}
