//! Allocation stages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Driver, Order, Tag};
use crate::priority::{CategorizedDrivers, CategorizedOrders, DriverCategory, PriorityCategory};

const WEDDING_POOL: &[DriverCategory] = &[DriverCategory::WeddingCapable];
const CORPORATE_POOL: &[DriverCategory] = &[DriverCategory::CorporateCapable, DriverCategory::General];

/// One ordered phase of an allocation run.
///
/// Stages run in declaration order; earlier stages consume driver
/// capacity before later ones see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    VipWedding,
    VipCorporate,
    Vip,
    Wedding,
    Corporate,
    Regular,
}

impl Stage {
    /// All stages, in execution order.
    pub const ALL: [Stage; 6] = [
        Stage::VipWedding,
        Stage::VipCorporate,
        Stage::Vip,
        Stage::Wedding,
        Stage::Corporate,
        Stage::Regular,
    ];

    /// Snake-case name.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::VipWedding => "vip_wedding",
            Stage::VipCorporate => "vip_corporate",
            Stage::Vip => "vip",
            Stage::Wedding => "wedding",
            Stage::Corporate => "corporate",
            Stage::Regular => "regular",
        }
    }

    /// Priority category the stage draws its orders from.
    pub fn category(&self) -> PriorityCategory {
        match self {
            Stage::VipWedding => PriorityCategory::VipWedding,
            Stage::VipCorporate | Stage::Vip => PriorityCategory::Vip,
            Stage::Wedding => PriorityCategory::Wedding,
            Stage::Corporate => PriorityCategory::Corporate,
            Stage::Regular => PriorityCategory::Regular,
        }
    }

    /// Driver tiers eligible for the stage, in pool order.
    ///
    /// `None` means every driver, in input order.
    pub fn driver_tiers(&self) -> Option<&'static [DriverCategory]> {
        match self {
            Stage::VipWedding | Stage::VipCorporate | Stage::Vip | Stage::Wedding => {
                Some(WEDDING_POOL)
            }
            Stage::Corporate => Some(CORPORATE_POOL),
            Stage::Regular => None,
        }
    }

    /// Orders handled by this stage, in priority order.
    ///
    /// The `vip` category is split: orders also tagged `corporate` go to
    /// [`Stage::VipCorporate`], the rest to [`Stage::Vip`].
    pub fn select_orders<'a>(&self, categorized: &CategorizedOrders<'a>) -> Vec<&'a Order> {
        let bucket = categorized.get(self.category()).iter().copied();
        match self {
            Stage::VipCorporate => bucket.filter(|o| o.has_tag(&Tag::Corporate)).collect(),
            Stage::Vip => bucket.filter(|o| !o.has_tag(&Tag::Corporate)).collect(),
            _ => bucket.collect(),
        }
    }

    /// Drivers eligible for this stage, before the capacity filter.
    pub fn select_drivers<'a>(
        &self,
        categorized: &CategorizedDrivers<'a>,
        all: &'a [Driver],
    ) -> Vec<&'a Driver> {
        match self.driver_tiers() {
            Some(tiers) => tiers
                .iter()
                .flat_map(|&tier| categorized.get(tier).iter().copied())
                .collect(),
            None => all.iter().collect(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
