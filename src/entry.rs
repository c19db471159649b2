//! # Quake entry
//! One observation from the GeoNet quakes feed.
//!
//! Entries are built fresh on every poll from the raw GeoJSON feature and never
//! mutated afterwards. Scalar properties are looked up on access. The `time`
//! property is parsed once at construction because a malformed value has to
//! surface as an error instead of reading as "no time".

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde_json::Value;

use crate::consts::{
    ATTRIBUTION, ATTR_DEPTH, ATTR_LOCALITY, ATTR_MAGNITUDE, ATTR_MMI, ATTR_PUBLIC_ID,
    ATTR_QUALITY, ATTR_TIME,
};
use crate::error::EntryError;
use crate::geo::{distance_km, Coordinates};
use crate::geojson::{Feature, Properties};

/// Layout of the date/time part before the fractional seconds.
const SOURCE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const SOURCE_TIME_PREFIX_LEN: usize = "YYYY-MM-DDTHH:MM:SS".len();

#[derive(Debug, Clone, PartialEq)]
pub struct QuakeEntry {
    properties: Properties,
    coordinates: Option<Coordinates>,
    distance_to_home: f64,
    time: Option<DateTime<Utc>>,
}

impl QuakeEntry {
    /// Build an entry relative to `home`.
    ///
    /// Fails only when the `time` property is present but malformed.
    pub fn new(home: Coordinates, feature: Feature) -> Result<Self, EntryError> {
        let Feature {
            geometry,
            properties,
        } = feature;

        let time = read_time(&properties)?;
        let coordinates = geometry.as_ref().and_then(|g| g.coordinates());
        let distance_to_home = coordinates
            .map(|c| distance_km(home, c))
            .unwrap_or(f64::INFINITY);

        Ok(Self {
            properties,
            coordinates,
            distance_to_home,
            time,
        })
    }

    pub fn attribution(&self) -> &'static str {
        ATTRIBUTION
    }

    pub fn external_id(&self) -> Option<&str> {
        self.properties.get_str(ATTR_PUBLIC_ID)
    }

    pub fn title(&self) -> Option<&str> {
        self.locality()
    }

    pub fn locality(&self) -> Option<&str> {
        self.properties.get_str(ATTR_LOCALITY)
    }

    pub fn depth(&self) -> Option<f64> {
        self.properties.get_f64(ATTR_DEPTH)
    }

    pub fn magnitude(&self) -> Option<f64> {
        self.properties.get_f64(ATTR_MAGNITUDE)
    }

    pub fn mmi(&self) -> Option<i64> {
        self.properties.get_i64(ATTR_MMI)
    }

    pub fn quality(&self) -> Option<&str> {
        self.properties.get_str(ATTR_QUALITY)
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        self.time
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    /// Kilometres from the home coordinates; infinite without a point geometry.
    pub fn distance_to_home(&self) -> f64 {
        self.distance_to_home
    }
}

impl fmt::Display for QuakeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QuakeEntry(id={})",
            self.external_id().unwrap_or("None")
        )
    }
}

fn read_time(properties: &Properties) -> Result<Option<DateTime<Utc>>, EntryError> {
    let malformed = |value: String| EntryError::MalformedTime {
        external_id: properties.get_str(ATTR_PUBLIC_ID).map(str::to_string),
        value,
    };

    match properties.get(ATTR_TIME) {
        None => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => match parse_source_time(s) {
            Some(t) => {
                tracing::debug!(time = %t, "time parsed");
                Ok(Some(t))
            }
            None => Err(malformed(s.clone())),
        },
        Some(other) => Err(malformed(other.to_string())),
    }
}

/// Parse `YYYY-MM-DDTHH:MM:SS.ffffffZ` as UTC. The fraction takes 1 to 6 digits.
/// Every prefix field must be zero-padded and leap seconds are rejected.
pub fn parse_source_time(raw: &str) -> Option<DateTime<Utc>> {
    let body = raw.strip_suffix('Z')?;
    let (prefix, fraction) = body.split_once('.')?;
    if !is_source_time_prefix(prefix)
        || fraction.is_empty()
        || fraction.len() > 6
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(body, SOURCE_TIME_FORMAT).ok()?;
    // chrono folds second 60 into the nanosecond field
    if naive.nanosecond() >= 1_000_000_000 {
        return None;
    }
    Some(naive.and_utc())
}

fn is_source_time_prefix(prefix: &str) -> bool {
    prefix.len() == SOURCE_TIME_PREFIX_LEN
        && prefix.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            10 => b == b'T',
            13 | 16 => b == b':',
            _ => b.is_ascii_digit(),
        })
}
