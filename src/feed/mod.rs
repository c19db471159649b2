// src/feed/mod.rs
pub mod source;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, gauge, histogram};
use serde::Deserialize;

use crate::clock::{Clock, SystemClock};
use crate::consts::{feed_url, VALID_MMI};
use crate::entry::QuakeEntry;
use crate::error::{EntryError, FeedError};
use crate::filter::{filter_entries, filter_radius, newest_timestamp, FilterConfig};
use crate::geo::Coordinates;
use crate::geojson::{parse_feature_collection, Feature};
use source::{FeedSource, FetchOutcome};

/// What to do with a record whose `time` is present but unparsable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedTimePolicy {
    /// Drop the record, log it and keep processing the batch.
    #[default]
    Skip,
    /// Fail the whole update cycle.
    Abort,
}

/// Per-feed configuration, fixed for the lifetime of the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    pub home: Coordinates,
    /// -1 disables MMI filtering at the source.
    pub mmi: i32,
    pub filter_radius: Option<f64>,
    pub filter: FilterConfig,
    pub malformed_time: MalformedTimePolicy,
}

impl FeedConfig {
    pub fn new(home: impl Into<Coordinates>) -> Self {
        Self {
            home: home.into(),
            mmi: -1,
            filter_radius: None,
            filter: FilterConfig::default(),
            malformed_time: MalformedTimePolicy::default(),
        }
    }

    pub fn with_mmi(mut self, mmi: i32) -> Self {
        self.mmi = mmi;
        self
    }

    pub fn with_radius(mut self, km: f64) -> Self {
        self.filter_radius = Some(km);
        self
    }

    pub fn with_minimum_magnitude(mut self, magnitude: f64) -> Self {
        self.filter.minimum_magnitude = Some(magnitude);
        self
    }

    pub fn with_recency_window(mut self, window: Duration) -> Self {
        self.filter.recency_window = Some(window);
        self
    }

    pub fn with_malformed_time(mut self, policy: MalformedTimePolicy) -> Self {
        self.malformed_time = policy;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Ok,
    OkNoData,
    Error,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Ok => "ok",
            UpdateStatus::OkNoData => "ok_no_data",
            UpdateStatus::Error => "error",
        }
    }
}

/// Outcome of one poll. `entries` is only set for [`UpdateStatus::Ok`].
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    pub status: UpdateStatus,
    pub entries: Option<Vec<QuakeEntry>>,
}

impl FeedUpdate {
    fn ok(entries: Vec<QuakeEntry>) -> Self {
        Self {
            status: UpdateStatus::Ok,
            entries: Some(entries),
        }
    }

    fn without_entries(status: UpdateStatus) -> Self {
        Self {
            status,
            entries: None,
        }
    }
}

/// The GeoNet NZ quakes feed.
pub struct QuakesFeed {
    config: FeedConfig,
    url: String,
    source: Box<dyn FeedSource>,
    clock: Arc<dyn Clock>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl QuakesFeed {
    pub fn new(config: FeedConfig, source: Box<dyn FeedSource>) -> Result<Self, FeedError> {
        Self::with_clock(config, source, Arc::new(SystemClock))
    }

    /// Fails with [`FeedError::InvalidMmi`] when `config.mmi` is outside `-1..=7`.
    pub fn with_clock(
        config: FeedConfig,
        source: Box<dyn FeedSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FeedError> {
        if !VALID_MMI.contains(&config.mmi) {
            tracing::error!(mmi = config.mmi, "invalid MMI provided");
            return Err(FeedError::InvalidMmi(config.mmi));
        }
        let url = feed_url(config.mmi);
        Ok(Self {
            config,
            url,
            source,
            clock,
            last_timestamp: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Current time as seen by this feed's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Newest entry time of the last successful update.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_timestamp
    }

    /// Fetch, decode, build entries, filter and record the newest timestamp.
    pub async fn update(&mut self) -> FeedUpdate {
        crate::telemetry::ensure_described();

        let t0 = std::time::Instant::now();
        let fetched = self.source.fetch(&self.url).await;
        histogram!("quakes_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let update = match fetched {
            Ok(FetchOutcome::NotModified) => FeedUpdate::without_entries(UpdateStatus::OkNoData),
            Ok(FetchOutcome::Body(body)) => match self.process(&body) {
                Ok(entries) => FeedUpdate::ok(entries),
                Err(e) => {
                    tracing::warn!(error = ?e, url = %self.url, "quakes feed processing failed");
                    counter!("quakes_decode_errors_total").increment(1);
                    FeedUpdate::without_entries(UpdateStatus::Error)
                }
            },
            Err(e) => {
                tracing::warn!(error = ?e, source = self.source.name(), url = %self.url, "quakes feed fetch failed");
                counter!("quakes_fetch_errors_total").increment(1);
                FeedUpdate::without_entries(UpdateStatus::Error)
            }
        };

        counter!("quakes_updates_total", "status" => update.status.as_str()).increment(1);
        gauge!("quakes_last_update_ts").set(self.now().timestamp() as f64);
        update
    }

    fn process(&mut self, body: &str) -> Result<Vec<QuakeEntry>> {
        let collection = parse_feature_collection(body)?;
        counter!("quakes_entries_total").increment(collection.features.len() as u64);

        let entries = self.build_entries(collection.features)?;
        let total = entries.len();
        let entries = filter_radius(entries, self.config.filter_radius);
        let filtered = filter_entries(entries, &self.config.filter, self.clock.as_ref());

        self.last_timestamp = newest_timestamp(&filtered);
        tracing::debug!(
            total,
            kept = filtered.len(),
            last_timestamp = ?self.last_timestamp,
            "quakes entries filtered"
        );
        counter!("quakes_entries_kept_total").increment(filtered.len() as u64);
        Ok(filtered)
    }

    fn build_entries(&self, features: Vec<Feature>) -> Result<Vec<QuakeEntry>, EntryError> {
        let mut out = Vec::with_capacity(features.len());
        for feature in features {
            match QuakeEntry::new(self.config.home, feature) {
                Ok(entry) => out.push(entry),
                Err(e) => {
                    counter!("quakes_malformed_entries_total").increment(1);
                    match self.config.malformed_time {
                        MalformedTimePolicy::Skip => {
                            tracing::warn!(error = %e, "skipping quake entry");
                        }
                        MalformedTimePolicy::Abort => return Err(e),
                    }
                }
            }
        }
        Ok(out)
    }
}

impl fmt::Display for QuakesFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QuakesFeed(home={}, url={}, radius={}, magnitude={}, time={})",
            self.config.home,
            self.url,
            display_opt(self.config.filter_radius),
            display_opt(self.config.filter.minimum_magnitude),
            self.config
                .filter
                .recency_window
                .map(format_window)
                .unwrap_or_else(|| "None".to_string()),
        )
    }
}

fn display_opt<T: fmt::Display>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "None".to_string())
}

/// `H:MM:SS`, e.g. `1:00:00`.
fn format_window(window: Duration) -> String {
    let secs = window.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.abs();
    format!(
        "{sign}{}:{:02}:{:02}",
        secs / 3600,
        (secs % 3600) / 60,
        secs % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_formats_like_h_mm_ss() {
        assert_eq!(format_window(Duration::hours(1)), "1:00:00");
        assert_eq!(format_window(Duration::seconds(3725)), "1:02:05");
        assert_eq!(format_window(Duration::minutes(30)), "0:30:00");
    }

    #[test]
    fn mmi_range_bounds() {
        let src = || Box::new(source::FixtureSource::sequence(vec![])) as Box<dyn FeedSource>;
        let home = (-41.2, 174.7);
        for ok in [-1, 0, 5, 7] {
            let feed = QuakesFeed::new(FeedConfig::new(home).with_mmi(ok), src()).unwrap();
            assert_eq!(feed.url(), format!("https://api.geonet.org.nz/quake?MMI={ok}"));
        }
        for bad in [-2, 8, 10] {
            let err = QuakesFeed::new(FeedConfig::new(home).with_mmi(bad), src()).err();
            assert_eq!(err, Some(FeedError::InvalidMmi(bad)));
        }
    }

    #[test]
    fn invalid_mmi_message_names_the_range() {
        let msg = FeedError::InvalidMmi(10).to_string();
        assert!(msg.contains("10"));
        assert!(msg.contains("-1..=7"));
    }
}
