//! Time-interval utilities over order windows.
//!
//! Thin order-level wrappers around [`ServiceWindow`] arithmetic, shared
//! by the feasibility checker, the post-hoc validator and the data profile.

use chrono::Duration;

use crate::models::{Order, ServiceWindow};

/// Whether two orders conflict in time.
///
/// Conflict iff NOT (a.teardown <= b.pickup OR b.teardown <= a.pickup).
/// Touching boundaries do not conflict.
pub fn overlaps(a: &Order, b: &Order) -> bool {
    a.window().overlaps(&b.window())
}

/// Idle gap between two orders, whichever comes first. `None` if they overlap.
pub fn gap_between(a: &Order, b: &Order) -> Option<Duration> {
    a.window().gap_to(&b.window())
}

/// Whether the orders are disjoint with at least `min_buffer_minutes`
/// between the earlier teardown and the later pickup.
///
/// Overlapping orders never satisfy the buffer.
pub fn buffer_satisfied(a: &Order, b: &Order, min_buffer_minutes: i64) -> bool {
    window_buffer_satisfied(&a.window(), &b.window(), min_buffer_minutes)
}

/// [`buffer_satisfied`] over raw windows.
pub fn window_buffer_satisfied(a: &ServiceWindow, b: &ServiceWindow, min_buffer_minutes: i64) -> bool {
    match a.gap_to(b) {
        // A buffer too large to express in seconds is never satisfied.
        Some(gap) => min_buffer_minutes
            .checked_mul(60)
            .is_some_and(|required| gap.num_seconds() >= required),
        None => false,
    }
}

/// All index pairs `(i, j)`, `i < j`, whose windows overlap.
pub fn find_time_conflicts(orders: &[Order]) -> Vec<(usize, usize)> {
    let mut conflicts = Vec::new();
    for i in 0..orders.len() {
        for j in (i + 1)..orders.len() {
            if overlaps(&orders[i], &orders[j]) {
                conflicts.push((i, j));
            }
        }
    }
    conflicts
}
