//! Timestamp model.
//!
//! Order times are ISO-8601 local date-times with an optional fixed UTC
//! offset. A run must use a single convention (all naive, or all with
//! the same offset); `validation::validate_input` enforces that before
//! any interval arithmetic happens.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const AWARE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M:%S%:z"];

/// A same-day timestamp, optionally carrying a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

/// Failure to parse a timestamp string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp '{0}': expected ISO-8601 date-time")]
pub struct TimestampParseError(pub String);

impl Timestamp {
    /// Creates a timestamp without an offset.
    pub fn naive(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset: None,
        }
    }

    /// Creates a timestamp with a fixed offset.
    pub fn with_offset(local: NaiveDateTime, offset: FixedOffset) -> Self {
        Self {
            local,
            offset: Some(offset),
        }
    }

    /// Wall-clock date-time as written.
    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    /// UTC offset, if the timestamp carried one.
    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// Local hour of day (0-23).
    pub fn hour(&self) -> u32 {
        self.local.hour()
    }

    /// Point on a common timeline: UTC for offset-aware values, the
    /// wall clock itself for naive ones.
    fn instant(&self) -> NaiveDateTime {
        match self.offset {
            Some(offset) => self.local - Duration::seconds(i64::from(offset.local_minus_utc())),
            None => self.local,
        }
    }

    /// Signed time from `self` to `later`.
    pub fn until(&self, later: &Timestamp) -> Duration {
        later.instant().signed_duration_since(self.instant())
    }

    /// Whether both timestamps follow the same offset convention.
    pub fn same_convention(&self, other: &Timestamp) -> bool {
        self.offset == other.offset
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant()
            .cmp(&other.instant())
            .then_with(|| {
                let a = self.offset.map(|o| o.local_minus_utc());
                let b = other.offset.map(|o| o.local_minus_utc());
                a.cmp(&b)
            })
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Timestamp {
    type Err = TimestampParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::with_offset(dt.naive_local(), *dt.offset()));
        }
        for fmt in AWARE_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(Self::with_offset(dt.naive_local(), *dt.offset()));
            }
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(local) = NaiveDateTime::parse_from_str(s, fmt) {
                return Ok(Self::naive(local));
            }
        }
        Err(TimestampParseError(s.to_string()))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format("%Y-%m-%dT%H:%M:%S"))?;
        if let Some(offset) = self.offset {
            write!(f, "{offset}")?;
        }
        Ok(())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
