// src/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::feed::{FeedConfig, MalformedTimePolicy};
use crate::geo::Coordinates;

pub const ENV_CONFIG_PATH: &str = "QUAKES_CONFIG_PATH";
pub const ENV_INTERVAL_SECS: &str = "QUAKES_INTERVAL_SECS";
pub const ENV_MMI: &str = "QUAKES_MMI";
pub const DEFAULT_CONFIG_PATH: &str = "config/quakes.toml";

fn default_latitude() -> f64 {
    -41.2865
}
fn default_longitude() -> f64 {
    174.7762
}
fn default_mmi() -> i32 {
    -1
}
fn default_interval_secs() -> u64 {
    300
}

/// Poller settings. All fields are optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Home location, defaults to Wellington.
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    #[serde(default = "default_mmi")]
    pub mmi: i32,
    #[serde(default)]
    pub radius_km: Option<f64>,
    #[serde(default)]
    pub minimum_magnitude: Option<f64>,
    /// Only report quakes from the last N minutes.
    #[serde(default)]
    pub recency_mins: Option<i64>,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default)]
    pub malformed_time: MalformedTimePolicy,
    #[serde(default)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            latitude: default_latitude(),
            longitude: default_longitude(),
            mmi: default_mmi(),
            radius_km: None,
            minimum_magnitude: None,
            recency_mins: None,
            interval_secs: default_interval_secs(),
            malformed_time: MalformedTimePolicy::default(),
            metrics_addr: None,
        }
    }
}

impl AppConfig {
    /// Build the feed configuration. Fails when `recency_mins` does not fit a duration.
    pub fn feed_config(&self) -> Result<FeedConfig> {
        let recency_window = self
            .recency_mins
            .map(|mins| {
                chrono::Duration::try_minutes(mins)
                    .ok_or_else(|| anyhow!("recency_mins {mins} is out of range"))
            })
            .transpose()?;
        let mut cfg = FeedConfig::new(Coordinates::new(self.latitude, self.longitude))
            .with_mmi(self.mmi)
            .with_malformed_time(self.malformed_time);
        cfg.filter_radius = self.radius_km;
        cfg.filter.minimum_magnitude = self.minimum_magnitude;
        cfg.filter.recency_window = recency_window;
        Ok(cfg)
    }

    /// Apply `QUAKES_INTERVAL_SECS` / `QUAKES_MMI` on top of file values.
    fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(v) = std::env::var(ENV_INTERVAL_SECS) {
            self.interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_INTERVAL_SECS}={v:?} is not a number"))?;
        }
        if let Ok(v) = std::env::var(ENV_MMI) {
            self.mmi = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MMI}={v:?} is not an integer"))?;
        }
        Ok(self)
    }
}

/// Load config from an explicit TOML file.
pub fn load_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading quakes config from {}", path.display()))?;
    parse_config(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $QUAKES_CONFIG_PATH
/// 2) config/quakes.toml
/// 3) built-in defaults
///
/// Env overrides are applied last in every case.
pub fn load_default() -> Result<AppConfig> {
    let cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        load_from(&pb)?
    } else {
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            load_from(&default_p)?
        } else {
            AppConfig::default()
        }
    };
    cfg.apply_env_overrides()
}

fn parse_config(s: &str) -> Result<AppConfig> {
    Ok(toml::from_str(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.mmi, -1);
        assert_eq!(cfg.interval_secs, 300);
    }

    #[test]
    fn full_file_maps_to_feed_config() {
        let cfg = parse_config(
            r#"
latitude = -41.2
longitude = 174.7
mmi = 5
radius_km = 500.0
minimum_magnitude = 5.5
recency_mins = 60
malformed_time = "abort"
metrics_addr = "127.0.0.1:9100"
"#,
        )
        .unwrap();
        let feed = cfg.feed_config().unwrap();
        assert_eq!(feed.home, Coordinates::new(-41.2, 174.7));
        assert_eq!(feed.mmi, 5);
        assert_eq!(feed.filter_radius, Some(500.0));
        assert_eq!(feed.filter.minimum_magnitude, Some(5.5));
        assert_eq!(feed.filter.recency_window, Some(chrono::Duration::hours(1)));
        assert_eq!(feed.malformed_time, MalformedTimePolicy::Abort);
        assert_eq!(cfg.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
    }

    #[test]
    fn out_of_range_recency_is_rejected() {
        let cfg = parse_config("recency_mins = 9223372036854775807").unwrap();
        let err = cfg.feed_config().unwrap_err();
        assert!(err.to_string().contains("recency_mins"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(parse_config("minimum_magnitud = 4.0").is_err());
    }
}
