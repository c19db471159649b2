// src/filter.rs
//! Entry filtering and newest-timestamp selection.
//!
//! Both are total over any list of entries: optional fields that are absent
//! simply fail an active predicate, they never raise.

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::entry::QuakeEntry;

/// Caller-side thresholds applied after the radius filter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterConfig {
    /// Inclusive lower bound. `Some(0.0)` is the same as unset.
    pub minimum_magnitude: Option<f64>,
    /// Keep entries with `now - window <= time <= now`. A zero window is the same as unset.
    pub recency_window: Option<Duration>,
}

impl FilterConfig {
    pub fn active_minimum_magnitude(&self) -> Option<f64> {
        self.minimum_magnitude.filter(|m| *m != 0.0)
    }

    pub fn active_recency_window(&self) -> Option<Duration> {
        self.recency_window.filter(|w| !w.is_zero())
    }
}

/// Narrow `entries` to those passing every active predicate, magnitude first.
///
/// The clock is only consulted when the recency window is active.
pub fn filter_entries(
    entries: Vec<QuakeEntry>,
    config: &FilterConfig,
    clock: &dyn Clock,
) -> Vec<QuakeEntry> {
    let mut filtered = entries;

    if let Some(min) = config.active_minimum_magnitude() {
        filtered.retain(|e| e.magnitude().is_some_and(|m| m >= min));
    }

    if let Some(window) = config.active_recency_window() {
        let now = clock.now();
        // a window reaching past the representable range keeps the whole past
        let cutoff = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        filtered.retain(|e| e.time().is_some_and(|t| cutoff <= t && t <= now));
    }

    filtered
}

/// Keep entries within `radius` km of home. `None` disables the filter.
pub fn filter_radius(entries: Vec<QuakeEntry>, radius: Option<f64>) -> Vec<QuakeEntry> {
    match radius {
        Some(r) => entries
            .into_iter()
            .filter(|e| e.distance_to_home() <= r)
            .collect(),
        None => entries,
    }
}

/// Newest `time` among already-filtered entries.
pub fn newest_timestamp(entries: &[QuakeEntry]) -> Option<DateTime<Utc>> {
    entries.iter().filter_map(QuakeEntry::time).max()
}
