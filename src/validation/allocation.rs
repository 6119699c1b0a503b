//! Post-hoc validation of a finished allocation.
//!
//! Re-checks every hard constraint from scratch over the final
//! assignments, independent of the orchestrator's bookkeeping.
//!
//! | Check | Scope | Kind |
//! |-------|-------|------|
//! | Capacity | per driver | error |
//! | Capability | per assigned order | error |
//! | Overlap | all pairs within a driver | error |
//! | Buffer | all disjoint pairs within a driver | error |
//! | Duplicate assignment | across drivers | error |
//! | Region mismatch | per driver | warning |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::AllocatorConfig;
use crate::feasibility::Requirement;
use crate::interval;
use crate::models::{Assignment, Violation};

/// Findings of a post-hoc validation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Hard-constraint violations. Any entry invalidates the allocation.
    pub errors: Vec<Violation>,
    /// Soft issues.
    pub warnings: Vec<Violation>,
}

impl ValidationReport {
    /// Whether no hard constraint is violated.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Highest error severity, or 0.
    pub fn max_severity(&self) -> i32 {
        self.errors.iter().map(|v| v.severity).max().unwrap_or(0)
    }
}

/// Validates final assignments against the hard constraints.
///
/// Never mutates the input; findings are returned, not raised.
pub fn validate_allocation(
    assignments: &[Assignment],
    config: &AllocatorConfig,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    for assignment in assignments {
        check_driver(assignment, config, &mut report);
    }

    // Duplicate scan: order id -> first driver holding it.
    let mut holders: HashMap<&str, &str> = HashMap::new();
    for assignment in assignments {
        for order in &assignment.orders {
            match holders.get(order.id.as_str()) {
                Some(&first) if first != assignment.driver.id => {
                    report.errors.push(Violation::duplicate_assignment(
                        &order.id,
                        format!(
                            "Order {} assigned to both {} and {}",
                            order.id, first, assignment.driver.id
                        ),
                    ));
                }
                Some(_) => {
                    report.errors.push(Violation::duplicate_assignment(
                        &order.id,
                        format!(
                            "Order {} listed twice for {}",
                            order.id, assignment.driver.id
                        ),
                    ));
                }
                None => {
                    holders.insert(&order.id, &assignment.driver.id);
                }
            }
        }
    }

    report
}

fn check_driver(assignment: &Assignment, config: &AllocatorConfig, report: &mut ValidationReport) {
    let driver = &assignment.driver;
    let orders = &assignment.orders;

    if orders.len() > driver.capacity() {
        report.errors.push(Violation::capacity_exceeded(
            &driver.id,
            format!(
                "Driver {} has {} orders but capacity is {}",
                driver.id,
                orders.len(),
                driver.max_orders_per_day
            ),
        ));
    }

    for order in orders {
        for requirement in Requirement::for_order(order) {
            if !requirement.is_met_by(driver) {
                report.errors.push(Violation::capability_mismatch(
                    &order.id,
                    format!(
                        "Order {} requires {} but driver {} lacks it",
                        order.id,
                        requirement.capability(),
                        driver.id
                    ),
                ));
            }
        }
    }

    for i in 0..orders.len() {
        for j in (i + 1)..orders.len() {
            let (a, b) = (&orders[i], &orders[j]);
            if a.id == b.id {
                continue;
            }
            if interval::overlaps(a, b) {
                report.errors.push(Violation::time_overlap(
                    &driver.id,
                    format!("Driver {}: orders {} and {} overlap", driver.id, a.id, b.id),
                ));
            } else if !interval::buffer_satisfied(a, b, config.min_buffer_minutes) {
                let gap = interval::gap_between(a, b)
                    .map(|g| g.num_minutes())
                    .unwrap_or(0);
                report.errors.push(Violation::insufficient_buffer(
                    &driver.id,
                    format!(
                        "Driver {}: only {} min between {} and {} (need {})",
                        driver.id, gap, a.id, b.id, config.min_buffer_minutes
                    ),
                ));
            }
        }
    }

    let out_of_region = assignment.out_of_region_orders();
    if !orders.is_empty()
        && out_of_region.len() as f64 / orders.len() as f64 > config.region_mismatch_ratio
    {
        let sample: Vec<&str> = out_of_region.iter().take(3).map(|o| o.id.as_str()).collect();
        report.warnings.push(Violation::region_mismatch(
            &driver.id,
            format!(
                "Driver {} ({}) has {}/{} orders outside preferred region: {}",
                driver.id,
                driver.preferred_region,
                out_of_region.len(),
                orders.len(),
                sample.join(", ")
            ),
        ));
    }
}
