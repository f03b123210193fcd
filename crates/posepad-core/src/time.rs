//! Message timestamps

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Seconds and nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Time {
    pub secs: u32,
    pub nsecs: u32,
}

impl Time {
    pub fn new(secs: u32, nsecs: u32) -> Self {
        // Carry overflowing nanoseconds into seconds
        Self {
            secs: secs.saturating_add(nsecs / NANOS_PER_SEC),
            nsecs: nsecs % NANOS_PER_SEC,
        }
    }

    /// Convert a wall-clock instant, clamping times before the epoch to zero
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        let secs = datetime.timestamp();
        if secs < 0 {
            return Self::default();
        }
        Self::new(
            u32::try_from(secs).unwrap_or(u32::MAX),
            datetime.timestamp_subsec_nanos(),
        )
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.secs as i64, self.nsecs).single()
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::default();
        }
        let whole = secs.trunc();
        let nsecs = ((secs - whole) * NANOS_PER_SEC as f64).round() as u32;
        Self::new(whole.min(u32::MAX as f64) as u32, nsecs)
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + self.nsecs as f64 / NANOS_PER_SEC as f64
    }

    pub fn is_zero(&self) -> bool {
        self.secs == 0 && self.nsecs == 0
    }

    pub fn saturating_add(&self, duration: Duration) -> Self {
        let secs = u32::try_from(duration.as_secs()).unwrap_or(u32::MAX);
        let total_nsecs = self.nsecs + duration.subsec_nanos();
        Self::new(self.secs.saturating_add(secs), total_nsecs)
    }
}

impl From<DateTime<Utc>> for Time {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::from_datetime(datetime)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nsecs)
    }
}
