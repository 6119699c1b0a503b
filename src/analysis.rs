//! Pre-allocation data profile and constraint report.
//!
//! Summarizes a run's input before any stage executes and flags
//! structural problems that will limit the achievable allocation.
//!
//! # Findings
//!
//! | Level | Condition |
//! |-------|-----------|
//! | critical | wedding-family orders > wedding-capable capacity |
//! | warning | wedding-family orders > 2 x wedding-capable drivers |
//! | warning | region with orders but no preferred drivers |
//! | warning | region orders per preferred driver > `overloaded_region_ratio` |
//! | info | evening orders > `evening_load_ratio` x drivers |
//! | info | orders with TBD addresses |

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::AllocatorConfig;
use crate::models::{Driver, Order};
use crate::priority::{categorize_drivers, categorize_orders, DriverCategory, PriorityCategory};

/// Orders bucketed by local setup hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDistribution {
    /// Setup before 12:00.
    pub morning: usize,
    /// Setup 12:00-17:59.
    pub afternoon: usize,
    /// Setup 18:00 or later.
    pub evening: usize,
}

impl TimeDistribution {
    fn record(&mut self, hour: u32) {
        match hour {
            0..=11 => self.morning += 1,
            12..=17 => self.afternoon += 1,
            _ => self.evening += 1,
        }
    }
}

/// Input statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataProfile {
    pub total_orders: usize,
    pub total_drivers: usize,
    /// Orders in the vip_wedding, vip and wedding categories.
    pub wedding_orders: usize,
    pub wedding_drivers: usize,
    /// Summed capacity of wedding-capable drivers.
    pub wedding_capacity: usize,
    pub total_capacity: usize,
    /// `total_orders / total_capacity * 100`, 0 without capacity.
    pub required_utilization: f64,
    pub orders_by_region: BTreeMap<String, usize>,
    pub drivers_by_region: BTreeMap<String, usize>,
    pub time_distribution: TimeDistribution,
    pub priority_distribution: BTreeMap<PriorityCategory, usize>,
    /// Orders whose postal code marks an unresolved address.
    pub tbd_addresses: usize,
}

impl DataProfile {
    /// Profiles the run input.
    pub fn calculate(orders: &[Order], drivers: &[Driver]) -> Self {
        let categorized_orders = categorize_orders(orders);
        let categorized_drivers = categorize_drivers(drivers);

        let total_capacity: usize = drivers.iter().map(Driver::capacity).sum();
        let required_utilization = if total_capacity == 0 {
            0.0
        } else {
            orders.len() as f64 / total_capacity as f64 * 100.0
        };

        let mut orders_by_region = BTreeMap::new();
        let mut time_distribution = TimeDistribution::default();
        for order in orders {
            *orders_by_region.entry(order.region.clone()).or_insert(0) += 1;
            time_distribution.record(order.setup_time.hour());
        }

        let mut drivers_by_region = BTreeMap::new();
        for driver in drivers {
            *drivers_by_region
                .entry(driver.preferred_region.clone())
                .or_insert(0) += 1;
        }

        let priority_distribution = PriorityCategory::ALL
            .iter()
            .map(|&c| (c, categorized_orders.count(c)))
            .collect();

        Self {
            total_orders: orders.len(),
            total_drivers: drivers.len(),
            wedding_orders: categorized_orders.wedding_family_count(),
            wedding_drivers: categorized_drivers.wedding_capable.len(),
            wedding_capacity: categorized_drivers.capacity(DriverCategory::WeddingCapable),
            total_capacity,
            required_utilization,
            orders_by_region,
            drivers_by_region,
            time_distribution,
            priority_distribution,
            tbd_addresses: orders.iter().filter(|o| o.has_tbd_address()).count(),
        }
    }
}

/// Constraint findings, by severity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstraintReport {
    pub critical: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
}

impl ConstraintReport {
    /// Derives findings from a profile.
    pub fn identify(profile: &DataProfile, config: &AllocatorConfig) -> Self {
        let mut report = Self::default();

        if profile.wedding_orders > 0 {
            if profile.wedding_orders > profile.wedding_capacity {
                report.critical.push(format!(
                    "Wedding orders ({}) exceed wedding driver capacity ({})",
                    profile.wedding_orders, profile.wedding_capacity
                ));
            } else if profile.wedding_orders > profile.wedding_drivers * 2 {
                report.warnings.push(format!(
                    "High wedding order load: {} orders for {} drivers",
                    profile.wedding_orders, profile.wedding_drivers
                ));
            }
        }

        let regions: BTreeSet<&String> = profile
            .orders_by_region
            .keys()
            .chain(profile.drivers_by_region.keys())
            .collect();
        for region in regions {
            let orders = profile.orders_by_region.get(region).copied().unwrap_or(0);
            let drivers = profile.drivers_by_region.get(region).copied().unwrap_or(0);
            if orders > 0 && drivers == 0 {
                report.warnings.push(format!(
                    "Region '{region}' has {orders} orders but no preferred drivers"
                ));
            } else if drivers > 0 {
                let ratio = orders as f64 / drivers as f64;
                if ratio > config.overloaded_region_ratio {
                    report.warnings.push(format!(
                        "Region '{region}' overloaded: {ratio:.1} orders per driver"
                    ));
                }
            }
        }

        let evening = profile.time_distribution.evening;
        if evening as f64 > profile.total_drivers as f64 * config.evening_load_ratio {
            report.info.push(format!(
                "Many orders concentrated in evening ({evening}), may cause time conflicts"
            ));
        }

        if profile.tbd_addresses > 0 {
            report.info.push(format!(
                "{} orders have TBD addresses (postal code {})",
                profile.tbd_addresses,
                crate::models::TBD_POSTAL_CODE
            ));
        }

        report
    }

    /// Critical and warning findings as result warnings; critical ones
    /// are prefixed with `critical: `.
    pub fn result_warnings(&self) -> Vec<String> {
        self.critical
            .iter()
            .map(|c| format!("critical: {c}"))
            .chain(self.warnings.iter().cloned())
            .collect()
    }

    pub fn has_critical(&self) -> bool {
        !self.critical.is_empty()
    }
}
