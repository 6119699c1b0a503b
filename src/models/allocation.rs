//! Allocation (solution) model.
//!
//! An allocation pairs drivers with the orders they committed to,
//! lists the orders left over with a reason, and records any
//! constraint violations found when re-checking the result.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Driver, Order};

/// A driver and the orders committed to it, in commit order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    /// The assigned driver.
    pub driver: Driver,
    /// Committed orders, in the order they were accepted.
    pub orders: Vec<Order>,
    /// Human-readable explanation supplied with the proposal.
    pub reasoning: String,
    /// `orders / max(max_orders_per_day, 1) * 100`.
    pub utilization: f64,
}

/// Why an order ended up without a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnallocationReason {
    /// No driver can satisfy the order's capability requirements.
    NoCapableDrivers,
    /// Capable drivers exist but none has headroom left.
    CapableDriversAtCapacity,
    /// Every driver is at its daily limit.
    AllDriversAtCapacity,
    /// Drivers had room but time windows or region choices ruled them out.
    ConflictsOrRegion,
}

impl fmt::Display for UnallocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnallocationReason::NoCapableDrivers => "no capability-matching drivers",
            UnallocationReason::CapableDriversAtCapacity => {
                "all capability-matching drivers at capacity"
            }
            UnallocationReason::AllDriversAtCapacity => "all drivers at full capacity",
            UnallocationReason::ConflictsOrRegion => {
                "time conflicts or regional constraints prevented allocation"
            }
        })
    }
}

/// An order that no driver took.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnallocatedOrder {
    pub order: Order,
    /// Derived once after all stages have run.
    #[serde(rename = "unallocation_reason")]
    pub reason: UnallocationReason,
    /// Last feasibility rejection seen for this order, if it was ever proposed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_rejection: Option<String>,
}

impl UnallocatedOrder {
    pub fn new(order: Order, reason: UnallocationReason) -> Self {
        Self {
            order,
            reason,
            last_rejection: None,
        }
    }

    pub fn with_last_rejection(mut self, rejection: impl Into<String>) -> Self {
        self.last_rejection = Some(rejection.into());
        self
    }
}

/// A constraint violation found in a finished allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Related entity ID (driver or order).
    pub entity_id: String,
    /// Human-readable description.
    pub message: String,
    /// Severity (0-100, higher = worse).
    pub severity: i32,
}

/// Classification of constraint violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationType {
    /// Driver holds more orders than its daily limit.
    CapacityExceeded,
    /// Driver lacks a capability an order requires.
    CapabilityMismatch,
    /// Two of a driver's orders overlap in time.
    TimeOverlap,
    /// Two of a driver's orders are closer than the minimum buffer.
    InsufficientBuffer,
    /// One order appears under more than one driver.
    DuplicateAssignment,
    /// Most of a driver's orders lie outside its preferred region.
    RegionMismatch,
}

impl Assignment {
    /// Creates an assignment and derives its utilization.
    pub fn new(driver: Driver, orders: Vec<Order>, reasoning: impl Into<String>) -> Self {
        let utilization = utilization_pct(orders.len(), driver.max_orders_per_day);
        Self {
            driver,
            orders,
            reasoning: reasoning.into(),
            utilization,
        }
    }

    /// Number of committed orders.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Whether the assignment contains `order_id`.
    pub fn contains(&self, order_id: &str) -> bool {
        self.orders.iter().any(|o| o.id == order_id)
    }

    /// Orders whose region differs from the driver's preferred region.
    pub fn out_of_region_orders(&self) -> Vec<&Order> {
        self.orders
            .iter()
            .filter(|o| o.region != self.driver.preferred_region)
            .collect()
    }
}

/// `count / max(capacity, 1) * 100`.
pub fn utilization_pct(count: usize, capacity: u32) -> f64 {
    count as f64 / capacity.max(1) as f64 * 100.0
}

impl Violation {
    /// Creates a capacity exceeded violation.
    pub fn capacity_exceeded(driver_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationType::CapacityExceeded, driver_id, message, 90)
    }

    /// Creates a capability mismatch violation.
    pub fn capability_mismatch(order_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationType::CapabilityMismatch, order_id, message, 90)
    }

    /// Creates a time overlap violation.
    pub fn time_overlap(driver_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationType::TimeOverlap, driver_id, message, 95)
    }

    /// Creates an insufficient buffer violation.
    pub fn insufficient_buffer(driver_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationType::InsufficientBuffer, driver_id, message, 70)
    }

    /// Creates a duplicate assignment violation.
    pub fn duplicate_assignment(order_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationType::DuplicateAssignment, order_id, message, 100)
    }

    /// Creates a region mismatch warning.
    pub fn region_mismatch(driver_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ViolationType::RegionMismatch, driver_id, message, 20)
    }

    fn new(
        violation_type: ViolationType,
        entity_id: impl Into<String>,
        message: impl Into<String>,
        severity: i32,
    ) -> Self {
        Self {
            violation_type,
            entity_id: entity_id.into(),
            message: message.into(),
            severity,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;

    fn order(id: &str, region: &str) -> Order {
        let ts = |t: &str| -> Timestamp { format!("2024-06-01T{t}:00").parse().unwrap() };
        Order::new(id, ts("09:00"), ts("09:30"), ts("10:00"), region)
    }

    #[test]
    fn test_assignment_utilization() {
        let d = Driver::new("D1", "North", 4);
        let a = Assignment::new(d, vec![order("A", "North"), order("B", "South")], "cluster");
        assert_eq!(a.order_count(), 2);
        assert!((a.utilization - 50.0).abs() < 1e-10);
        assert!(a.contains("B"));
        assert!(!a.contains("C"));
    }

    #[test]
    fn test_utilization_zero_capacity() {
        assert!((utilization_pct(0, 0) - 0.0).abs() < 1e-10);
        assert!((utilization_pct(1, 0) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_out_of_region_orders() {
        let d = Driver::new("D1", "North", 4);
        let a = Assignment::new(
            d,
            vec![order("A", "North"), order("B", "South"), order("C", "East")],
            "",
        );
        let ids: Vec<&str> = a.out_of_region_orders().iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["B", "C"]);
    }

    #[test]
    fn test_unallocation_reason_text_non_empty() {
        for reason in [
            UnallocationReason::NoCapableDrivers,
            UnallocationReason::CapableDriversAtCapacity,
            UnallocationReason::AllDriversAtCapacity,
            UnallocationReason::ConflictsOrRegion,
        ] {
            assert!(!reason.to_string().is_empty());
        }
        assert_eq!(
            UnallocationReason::AllDriversAtCapacity.to_string(),
            "all drivers at full capacity"
        );
    }

    #[test]
    fn test_unallocated_serializes_reason_field() {
        let u = UnallocatedOrder::new(order("A", "North"), UnallocationReason::ConflictsOrRegion)
            .with_last_rejection("time conflict with order B");
        let v = serde_json::to_value(&u).unwrap();
        assert_eq!(v["unallocation_reason"], "conflicts_or_region");
        assert_eq!(v["last_rejection"], "time conflict with order B");
    }

    #[test]
    fn test_violation_factories() {
        let v1 = Violation::capacity_exceeded("D1", "over");
        assert_eq!(v1.violation_type, ViolationType::CapacityExceeded);
        assert_eq!(v1.entity_id, "D1");

        let v2 = Violation::duplicate_assignment("Q1", "twice");
        assert_eq!(v2.violation_type, ViolationType::DuplicateAssignment);
        assert_eq!(v2.severity, 100);

        let v3 = Violation::region_mismatch("D1", "far");
        assert_eq!(v3.violation_type, ViolationType::RegionMismatch);
        assert_eq!(v3.to_string(), "far");
    }
}
