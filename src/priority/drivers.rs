//! Driver capability tiers.

use serde::{Deserialize, Serialize};

use crate::models::{Capability, Driver};

/// Capability tier of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverCategory {
    /// Has `wedding` or `vip`.
    WeddingCapable,
    /// Otherwise has `corporate` or `seminars`.
    CorporateCapable,
    /// Everyone else.
    General,
}

impl DriverCategory {
    /// Tier of `driver`.
    pub fn of(driver: &Driver) -> Self {
        if driver.has_capability(&Capability::Wedding) || driver.has_capability(&Capability::Vip)
        {
            DriverCategory::WeddingCapable
        } else if driver.has_capability(&Capability::Corporate)
            || driver.has_capability(&Capability::Seminars)
        {
            DriverCategory::CorporateCapable
        } else {
            DriverCategory::General
        }
    }
}

/// Drivers partitioned by [`DriverCategory`], input order preserved.
#[derive(Debug, Clone, Default)]
pub struct CategorizedDrivers<'a> {
    pub wedding_capable: Vec<&'a Driver>,
    pub corporate_capable: Vec<&'a Driver>,
    pub general: Vec<&'a Driver>,
}

impl<'a> CategorizedDrivers<'a> {
    /// Drivers in `category`.
    pub fn get(&self, category: DriverCategory) -> &[&'a Driver] {
        match category {
            DriverCategory::WeddingCapable => &self.wedding_capable,
            DriverCategory::CorporateCapable => &self.corporate_capable,
            DriverCategory::General => &self.general,
        }
    }

    /// Summed daily capacity of the drivers in `category`.
    pub fn capacity(&self, category: DriverCategory) -> usize {
        self.get(category).iter().map(|d| d.capacity()).sum()
    }
}

/// Partitions `drivers` into capability tiers.
pub fn categorize_drivers(drivers: &[Driver]) -> CategorizedDrivers<'_> {
    let mut categorized = CategorizedDrivers::default();
    for driver in drivers {
        match DriverCategory::of(driver) {
            DriverCategory::WeddingCapable => categorized.wedding_capable.push(driver),
            DriverCategory::CorporateCapable => categorized.corporate_capable.push(driver),
            DriverCategory::General => categorized.general.push(driver),
        }
    }
    categorized
}
