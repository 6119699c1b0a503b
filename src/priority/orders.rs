//! Order priority scoring and categorization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Order, Tag};

/// Priority tier of an order. Declaration order is precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityCategory {
    VipWedding,
    Vip,
    Wedding,
    Corporate,
    Regular,
}

impl PriorityCategory {
    /// All categories, highest precedence first.
    pub const ALL: [PriorityCategory; 5] = [
        PriorityCategory::VipWedding,
        PriorityCategory::Vip,
        PriorityCategory::Wedding,
        PriorityCategory::Corporate,
        PriorityCategory::Regular,
    ];

    /// Category of `order`, first match wins.
    pub fn of(order: &Order) -> Self {
        let vip = order.has_tag(&Tag::Vip);
        let wedding = order.has_tag(&Tag::Wedding);
        if vip && wedding {
            PriorityCategory::VipWedding
        } else if vip {
            PriorityCategory::Vip
        } else if wedding {
            PriorityCategory::Wedding
        } else if order.has_tag(&Tag::Corporate) {
            PriorityCategory::Corporate
        } else {
            PriorityCategory::Regular
        }
    }

    /// Snake-case name, as used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            PriorityCategory::VipWedding => "vip_wedding",
            PriorityCategory::Vip => "vip",
            PriorityCategory::Wedding => "wedding",
            PriorityCategory::Corporate => "corporate",
            PriorityCategory::Regular => "regular",
        }
    }

    /// Whether the category needs a wedding-capable driver pool.
    pub fn is_wedding_family(&self) -> bool {
        matches!(
            self,
            PriorityCategory::VipWedding | PriorityCategory::Vip | PriorityCategory::Wedding
        )
    }
}

impl fmt::Display for PriorityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Priority score of an order (higher = more important).
pub fn priority_score(order: &Order) -> u8 {
    let vip = order.has_tag(&Tag::Vip);
    let wedding = order.has_tag(&Tag::Wedding);
    let corporate = order.has_tag(&Tag::Corporate);
    match (vip, wedding, corporate) {
        (true, true, _) => 100,
        (true, false, _) => 90,
        (false, true, _) => 80,
        (false, false, true) if order.has_tag(&Tag::EarlySetup) => 60,
        (false, false, true) => 50,
        _ => 30,
    }
}

/// Orders partitioned by [`PriorityCategory`].
///
/// Each bucket is sorted by descending [`priority_score`]; ties keep
/// input order.
#[derive(Debug, Clone, Default)]
pub struct CategorizedOrders<'a> {
    pub vip_wedding: Vec<&'a Order>,
    pub vip: Vec<&'a Order>,
    pub wedding: Vec<&'a Order>,
    pub corporate: Vec<&'a Order>,
    pub regular: Vec<&'a Order>,
}

impl<'a> CategorizedOrders<'a> {
    /// Orders in `category`.
    pub fn get(&self, category: PriorityCategory) -> &[&'a Order] {
        match category {
            PriorityCategory::VipWedding => &self.vip_wedding,
            PriorityCategory::Vip => &self.vip,
            PriorityCategory::Wedding => &self.wedding,
            PriorityCategory::Corporate => &self.corporate,
            PriorityCategory::Regular => &self.regular,
        }
    }

    fn bucket_mut(&mut self, category: PriorityCategory) -> &mut Vec<&'a Order> {
        match category {
            PriorityCategory::VipWedding => &mut self.vip_wedding,
            PriorityCategory::Vip => &mut self.vip,
            PriorityCategory::Wedding => &mut self.wedding,
            PriorityCategory::Corporate => &mut self.corporate,
            PriorityCategory::Regular => &mut self.regular,
        }
    }

    /// Number of orders in `category`.
    pub fn count(&self, category: PriorityCategory) -> usize {
        self.get(category).len()
    }

    /// Total orders across all categories.
    pub fn total(&self) -> usize {
        PriorityCategory::ALL.iter().map(|&c| self.count(c)).sum()
    }

    /// Orders in the vip_wedding, vip and wedding categories.
    pub fn wedding_family_count(&self) -> usize {
        PriorityCategory::ALL
            .iter()
            .filter(|c| c.is_wedding_family())
            .map(|&c| self.count(c))
            .sum()
    }
}

/// Partitions `orders` into priority categories.
pub fn categorize_orders(orders: &[Order]) -> CategorizedOrders<'_> {
    let mut categorized = CategorizedOrders::default();
    for order in orders {
        categorized.bucket_mut(PriorityCategory::of(order)).push(order);
    }
    for category in PriorityCategory::ALL {
        // sort_by_key is stable: equal scores keep input order.
        categorized
            .bucket_mut(category)
            .sort_by_key(|o| std::cmp::Reverse(priority_score(o)));
    }
    categorized
}
