//! Allocation quality metrics.
//!
//! Computes aggregate indicators from the final assignments.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Allocation rate | allocated / total orders * 100 (0 without orders) |
//! | Average utilization | mean per-driver utilization over drivers used |
//! | Drivers used | assignments with at least one order |
//! | Regional distribution | allocated orders per order region |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Assignment;

/// Allocation performance indicators.
///
/// Percentages are in 0.0..=100.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationMetrics {
    pub total_orders: usize,
    pub allocated_orders: usize,
    pub unallocated_orders: usize,
    /// Percentage of orders allocated.
    pub allocation_rate: f64,
    /// Mean utilization of drivers that received work.
    pub average_utilization: f64,
    /// Drivers with at least one order.
    pub total_drivers_used: usize,
    /// Allocated orders by order region.
    pub regional_distribution: BTreeMap<String, usize>,
}

impl AllocationMetrics {
    /// Computes metrics from final assignments.
    ///
    /// # Arguments
    /// * `total_orders` - Number of input orders.
    /// * `assignments` - Final per-driver assignments.
    pub fn calculate(total_orders: usize, assignments: &[Assignment]) -> Self {
        let allocated: usize = assignments.iter().map(Assignment::order_count).sum();

        let mut regional_distribution = BTreeMap::new();
        for assignment in assignments {
            for order in &assignment.orders {
                *regional_distribution.entry(order.region.clone()).or_insert(0) += 1;
            }
        }

        let allocation_rate = if total_orders == 0 {
            0.0
        } else {
            allocated as f64 / total_orders as f64 * 100.0
        };

        let average_utilization = if assignments.is_empty() {
            0.0
        } else {
            let sum: f64 = assignments.iter().map(|a| a.utilization).sum();
            sum / assignments.len() as f64
        };

        Self {
            total_orders,
            allocated_orders: allocated,
            unallocated_orders: total_orders.saturating_sub(allocated),
            allocation_rate,
            average_utilization,
            total_drivers_used: assignments.len(),
            regional_distribution,
        }
    }

    /// Whether the allocation meets the given quality thresholds.
    pub fn meets_thresholds(&self, min_allocation_rate: f64, min_utilization: f64) -> bool {
        self.allocation_rate >= min_allocation_rate && self.average_utilization >= min_utilization
    }
}
