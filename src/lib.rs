// src/lib.rs
// Public library surface for the poller binary and integration tests.

pub mod clock;
pub mod config;
pub mod consts;
pub mod entry;
pub mod error;
pub mod feed;
pub mod filter;
pub mod geo;
pub mod geojson;
pub mod manager;
pub mod scheduler;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::clock::{Clock, FixedClock, SystemClock};
pub use crate::entry::QuakeEntry;
pub use crate::error::{EntryError, FeedError};
pub use crate::feed::source::{FeedSource, FetchOutcome, FixtureResponse, FixtureSource, HttpSource};
pub use crate::feed::{FeedConfig, FeedUpdate, MalformedTimePolicy, QuakesFeed, UpdateStatus};
pub use crate::filter::{filter_entries, newest_timestamp, FilterConfig};
pub use crate::geo::Coordinates;
pub use crate::manager::{
    EntityEvent, EntityHandler, LoggingHandler, QuakesFeedManager, RecordingHandler, UpdateSummary,
};
