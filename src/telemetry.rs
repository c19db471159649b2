use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("quakes_updates_total", "Feed updates, labelled by status.");
        describe_counter!("quakes_entries_total", "Entries parsed from the feed.");
        describe_counter!(
            "quakes_entries_kept_total",
            "Entries kept after radius, magnitude and time filtering."
        );
        describe_counter!(
            "quakes_malformed_entries_total",
            "Entries whose time could not be parsed, under either malformed-time policy."
        );
        describe_counter!("quakes_fetch_errors_total", "Feed transport errors after retries.");
        describe_counter!(
            "quakes_decode_errors_total",
            "Fetched bodies that could not be decoded into entries."
        );
        describe_counter!("quakes_poll_runs_total", "Scheduler ticks.");
        describe_histogram!("quakes_fetch_ms", "Feed fetch time in milliseconds.");
        describe_gauge!(
            "quakes_last_update_ts",
            "Unix ts when the feed was last updated."
        );
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from within a tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
