// src/consts.rs
use std::ops::RangeInclusive;

// Property keys inside each GeoJSON feature.
pub const ATTR_DEPTH: &str = "depth";
pub const ATTR_LOCALITY: &str = "locality";
pub const ATTR_MAGNITUDE: &str = "magnitude";
pub const ATTR_MMI: &str = "mmi";
pub const ATTR_PUBLIC_ID: &str = "publicID";
pub const ATTR_QUALITY: &str = "quality";
pub const ATTR_TIME: &str = "time";

pub const ATTRIBUTION: &str = "GeoNet Geological hazard information for New Zealand";

/// `{}` is replaced by the MMI value, verbatim.
pub const URL_TEMPLATE: &str = "https://api.geonet.org.nz/quake?MMI={}";

/// -1 means "no MMI filtering at the source".
pub const VALID_MMI: RangeInclusive<i32> = -1..=7;

pub fn feed_url(mmi: i32) -> String {
    URL_TEMPLATE.replace("{}", &mmi.to_string())
}
