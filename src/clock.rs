// src/clock.rs
use chrono::{DateTime, Utc};

/// Source of "now" for time-window filtering.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Used to make recency filtering deterministic.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn system_clock_reads_current_time() {
        let before = Utc::now();
        let now = SystemClock.now();
        let after = Utc::now();
        assert!(before <= now && now <= after);
    }

    #[test]
    fn fixed_clock_is_fixed() {
        let t = Utc.with_ymd_and_hms(2019, 7, 24, 19, 30, 0).unwrap();
        let c = FixedClock(t);
        assert_eq!(c.now(), t);
        assert_eq!(c.now(), t);
    }
}
