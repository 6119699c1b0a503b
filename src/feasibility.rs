//! Feasibility checking of a single tentative assignment.
//!
//! Answers: can `order` be appended to `driver`'s current list without
//! violating a hard constraint? Rules are checked in a fixed order and
//! the first failure is reported:
//!
//! 1. Capacity: fewer than `max_orders_per_day` orders already assigned.
//! 2. Capability: every [`Requirement`] implied by the order's tags is met.
//! 3. Overlap: no assigned order's window intersects the new one.
//! 4. Buffer: every assigned order leaves at least the minimum idle gap.
//!
//! The checker is pure; callers commit only after `check` returns `Ok`.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

use crate::interval;
use crate::models::{Capability, Driver, Order, Tag};

/// A capability requirement implied by an order tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Wedding,
    Vip,
    Corporate,
}

/// Tag → requirement table, in check order.
static REQUIREMENT_TABLE: [(Tag, Requirement); 3] = [
    (Tag::Wedding, Requirement::Wedding),
    (Tag::Vip, Requirement::Vip),
    (Tag::Corporate, Requirement::Corporate),
];

impl Requirement {
    /// Capability a driver needs to meet this requirement.
    pub fn capability(&self) -> Capability {
        match self {
            Requirement::Wedding => Capability::Wedding,
            Requirement::Vip => Capability::Vip,
            Requirement::Corporate => Capability::Corporate,
        }
    }

    /// Requirements implied by `order`'s tags, in check order.
    pub fn for_order(order: &Order) -> impl Iterator<Item = Requirement> + '_ {
        REQUIREMENT_TABLE
            .iter()
            .filter(move |(tag, _)| order.has_tag(tag))
            .map(|(_, req)| *req)
    }

    /// Whether `driver` meets this requirement.
    pub fn is_met_by(&self, driver: &Driver) -> bool {
        driver.has_capability(&self.capability())
    }
}

/// First unmet requirement of `order` for `driver`, if any.
pub fn missing_requirement(order: &Order, driver: &Driver) -> Option<Requirement> {
    Requirement::for_order(order).find(|req| !req.is_met_by(driver))
}

/// Whether `driver` has every capability `order` requires.
pub fn is_capability_compatible(order: &Order, driver: &Driver) -> bool {
    missing_requirement(order, driver).is_none()
}

/// Drivers whose capabilities satisfy `order`, ignoring load and time.
pub fn compatible_drivers<'a>(order: &Order, drivers: &'a [Driver]) -> Vec<&'a Driver> {
    drivers
        .iter()
        .filter(|d| is_capability_compatible(order, d))
        .collect()
}

/// Why an order cannot be added to a driver's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rejection {
    /// Driver already holds `capacity` orders.
    AtCapacity { assigned: usize, capacity: u32 },
    /// Driver lacks the capability for this requirement.
    MissingCapability { requirement: Requirement },
    /// Windows intersect with an assigned order.
    TimeConflict { order_id: String },
    /// Disjoint from an assigned order, but too close to it.
    InsufficientBuffer {
        order_id: String,
        gap_minutes: i64,
        required_minutes: i64,
    },
    /// Driver is not part of the run.
    UnknownDriver { driver_id: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::AtCapacity { assigned, capacity } => {
                write!(f, "at capacity ({assigned}/{capacity})")
            }
            Rejection::MissingCapability { requirement } => {
                write!(f, "missing {} capability", requirement.capability())
            }
            Rejection::TimeConflict { order_id } => {
                write!(f, "time conflict with order {order_id}")
            }
            Rejection::InsufficientBuffer {
                order_id,
                gap_minutes,
                required_minutes,
            } => write!(
                f,
                "insufficient buffer with order {order_id} ({gap_minutes} min < {required_minutes} min)"
            ),
            Rejection::UnknownDriver { driver_id } => {
                write!(f, "driver {driver_id} is not part of the run")
            }
        }
    }
}

/// Hard-constraint checker for tentative assignments.
#[derive(Debug, Clone, Copy)]
pub struct FeasibilityChecker {
    min_buffer_minutes: i64,
}

impl FeasibilityChecker {
    /// Creates a checker requiring `min_buffer_minutes` between orders.
    pub fn new(min_buffer_minutes: i64) -> Self {
        Self { min_buffer_minutes }
    }

    /// Configured minimum buffer.
    pub fn min_buffer_minutes(&self) -> i64 {
        self.min_buffer_minutes
    }

    /// Checks whether `order` can join `assigned` on `driver`.
    ///
    /// Returns the first violated rule.
    pub fn check<O: Borrow<Order>>(
        &self,
        order: &Order,
        driver: &Driver,
        assigned: &[O],
    ) -> Result<(), Rejection> {
        if assigned.len() >= driver.capacity() {
            return Err(Rejection::AtCapacity {
                assigned: assigned.len(),
                capacity: driver.max_orders_per_day,
            });
        }

        if let Some(requirement) = missing_requirement(order, driver) {
            return Err(Rejection::MissingCapability { requirement });
        }

        if let Some(other) = assigned
            .iter()
            .map(<O as Borrow<Order>>::borrow)
            .find(|other| interval::overlaps(order, other))
        {
            return Err(Rejection::TimeConflict {
                order_id: other.id.clone(),
            });
        }

        for other in assigned.iter().map(<O as Borrow<Order>>::borrow) {
            if !interval::buffer_satisfied(order, other, self.min_buffer_minutes) {
                let gap_minutes = interval::gap_between(order, other)
                    .map(|g| g.num_minutes())
                    .unwrap_or(0);
                return Err(Rejection::InsufficientBuffer {
                    order_id: other.id.clone(),
                    gap_minutes,
                    required_minutes: self.min_buffer_minutes,
                });
            }
        }

        Ok(())
    }

    /// Boolean form of [`check`](Self::check).
    pub fn is_feasible<O: Borrow<Order>>(&self, order: &Order, driver: &Driver, assigned: &[O]) -> bool {
        self.check(order, driver, assigned).is_ok()
    }
}

impl Default for FeasibilityChecker {
    fn default() -> Self {
        Self::new(15)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;

    fn ts(t: &str) -> Timestamp {
        format!("2024-06-01T{t}:00").parse().unwrap()
    }

    fn order(id: &str, pickup: &str, setup: &str, teardown: &str, tags: &[&str]) -> Order {
        tags.iter().fold(
            Order::new(id, ts(pickup), ts(setup), ts(teardown), "R"),
            |o, t| o.with_tag(*t),
        )
    }

    fn wedding_driver(capacity: u32) -> Driver {
        Driver::new("D", "R", capacity).with_capability("wedding")
    }

    #[test]
    fn test_overlap_scenario() {
        let d = wedding_driver(2);
        let a = order("A", "09:00", "09:20", "10:00", &["wedding"]);
        let b = order("B", "09:30", "09:50", "10:30", &["wedding"]);
        let checker = FeasibilityChecker::new(15);
        assert_eq!(
            checker.check(&b, &d, &[a]),
            Err(Rejection::TimeConflict {
                order_id: "A".into()
            })
        );
    }

    #[test]
    fn test_buffer_scenario() {
        let d = wedding_driver(2);
        let a = order("A", "09:00", "09:20", "10:00", &["wedding"]);
        let c = order("C", "10:10", "10:20", "11:00", &["wedding"]);
        let checker = FeasibilityChecker::new(15);
        let rejection = checker.check(&c, &d, &[&a]).unwrap_err();
        assert_eq!(
            rejection,
            Rejection::InsufficientBuffer {
                order_id: "A".into(),
                gap_minutes: 10,
                required_minutes: 15
            }
        );
        assert!(rejection.to_string().contains("insufficient buffer"));
    }

    #[test]
    fn test_missing_vip_scenario() {
        let e = Driver::new("E", "R", 1);
        let f = order("F", "09:00", "09:20", "10:00", &["vip"]);
        let result = FeasibilityChecker::default().check::<Order>(&f, &e, &[]);
        assert_eq!(
            result,
            Err(Rejection::MissingCapability {
                requirement: Requirement::Vip
            })
        );
        assert_eq!(result.unwrap_err().to_string(), "missing vip capability");
    }

    #[test]
    fn test_capacity_checked_first() {
        // Also lacks capability and conflicts, but capacity is reported.
        let d = Driver::new("D", "R", 1);
        let a = order("A", "09:00", "09:20", "10:00", &[]);
        let b = order("B", "09:00", "09:20", "10:00", &["wedding"]);
        assert_eq!(
            FeasibilityChecker::default().check(&b, &d, &[a]),
            Err(Rejection::AtCapacity {
                assigned: 1,
                capacity: 1
            })
        );
    }

    #[test]
    fn test_capability_checked_before_overlap() {
        let d = Driver::new("D", "R", 3);
        let a = order("A", "09:00", "09:20", "10:00", &[]);
        let b = order("B", "09:00", "09:20", "10:00", &["corporate"]);
        assert_eq!(
            FeasibilityChecker::default().check(&b, &d, &[a]),
            Err(Rejection::MissingCapability {
                requirement: Requirement::Corporate
            })
        );
    }

    #[test]
    fn test_requirement_order_reports_wedding_first() {
        let d = Driver::new("D", "R", 3);
        let o = order("O", "09:00", "09:20", "10:00", &["vip", "wedding"]);
        assert_eq!(missing_requirement(&o, &d), Some(Requirement::Wedding));
        let d = d.with_capability("wedding");
        assert_eq!(missing_requirement(&o, &d), Some(Requirement::Vip));
    }

    #[test]
    fn test_zero_capacity_driver_rejects() {
        let d = Driver::new("Z", "R", 0);
        let o = order("O", "09:00", "09:20", "10:00", &[]);
        assert!(!FeasibilityChecker::default().is_feasible::<Order>(&o, &d, &[]));
    }

    #[test]
    fn test_feasible_with_enough_gap() {
        let d = wedding_driver(3);
        let a = order("A", "09:00", "09:20", "10:00", &["wedding"]);
        let b = order("B", "12:00", "12:20", "13:00", &[]);
        let c = order("C", "10:30", "10:40", "11:30", &["wedding"]);
        let checker = FeasibilityChecker::new(15);
        assert!(checker.is_feasible(&c, &d, &[a, b]));
    }

    #[test]
    fn test_idempotent() {
        let d = wedding_driver(2);
        let a = order("A", "09:00", "09:20", "10:00", &["wedding"]);
        let c = order("C", "10:10", "10:20", "11:00", &["wedding"]);
        let assigned = vec![a];
        let checker = FeasibilityChecker::new(15);
        let first = checker.check(&c, &d, &assigned);
        let second = checker.check(&c, &d, &assigned);
        assert_eq!(first, second);
        assert_eq!(assigned.len(), 1);
    }

    #[test]
    fn test_compatible_drivers() {
        let drivers = vec![
            Driver::new("W", "R", 2).with_capability("wedding"),
            Driver::new("WV", "R", 2).with_capability("wedding").with_capability("vip"),
            Driver::new("G", "R", 2),
        ];
        let o = order("O", "09:00", "09:20", "10:00", &["vip", "wedding"]);
        let ids: Vec<&str> = compatible_drivers(&o, &drivers)
            .iter()
            .map(|d| d.id.as_str())
            .collect();
        assert_eq!(ids, vec!["WV"]);

        let plain = order("P", "09:00", "09:20", "10:00", &["early_setup"]);
        assert_eq!(compatible_drivers(&plain, &drivers).len(), 3);
    }
}
