// src/error.rs
use thiserror::Error;

use crate::consts::VALID_MMI;

/// Raised while constructing a feed. Fatal: no feed instance is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("invalid MMI {0}: minimum MMI must be one of {min}..={max}", min = VALID_MMI.start(), max = VALID_MMI.end())]
    InvalidMmi(i32),
}

/// Raised while building a single entry from a raw feature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("malformed time {value:?} in entry {id}", id = .external_id.as_deref().unwrap_or("<no id>"))]
    MalformedTime {
        external_id: Option<String>,
        value: String,
    },
}
