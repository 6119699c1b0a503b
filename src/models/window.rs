//! Service window model.
//!
//! Each order occupies its driver from pickup until teardown. Setup
//! falls strictly between the two and does not affect conflicts.
//!
//! # Interval semantics
//! The occupied span is `[pickup, teardown]` with touching endpoints
//! allowed: an order ending at 10:00 does not conflict with one picked
//! up at 10:00 (the buffer rule decides whether that is acceptable).

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::Timestamp;

/// Pickup, setup, and teardown times of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceWindow {
    /// Driver collects the order.
    pub pickup: Timestamp,
    /// Setup at the venue begins.
    pub setup: Timestamp,
    /// Teardown completes; driver is free afterwards.
    pub teardown: Timestamp,
}

impl ServiceWindow {
    /// Creates a new window.
    pub fn new(pickup: Timestamp, setup: Timestamp, teardown: Timestamp) -> Self {
        Self {
            pickup,
            setup,
            teardown,
        }
    }

    /// Whether `pickup < setup < teardown`.
    pub fn is_well_ordered(&self) -> bool {
        self.pickup < self.setup && self.setup < self.teardown
    }

    /// Time the driver is occupied (teardown - pickup).
    #[inline]
    pub fn duration(&self) -> Duration {
        self.pickup.until(&self.teardown)
    }

    /// Whether two windows conflict.
    ///
    /// Conflict iff NOT (a.teardown <= b.pickup OR b.teardown <= a.pickup).
    pub fn overlaps(&self, other: &Self) -> bool {
        !(self.teardown <= other.pickup || other.teardown <= self.pickup)
    }

    /// Idle time between the earlier window's teardown and the later
    /// window's pickup. `None` if the windows overlap.
    pub fn gap_to(&self, other: &Self) -> Option<Duration> {
        if self.teardown <= other.pickup {
            Some(self.teardown.until(&other.pickup))
        } else if other.teardown <= self.pickup {
            Some(other.teardown.until(&self.pickup))
        } else {
            None
        }
    }
}
