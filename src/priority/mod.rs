//! Priority classification of orders and capability tiers of drivers.
//!
//! Orders are scored from their tag set and partitioned into five
//! mutually exclusive categories (first match wins):
//!
//! | Category | Rule | Score |
//! |----------|------|-------|
//! | `vip_wedding` | `vip` and `wedding` | 100 |
//! | `vip` | `vip` | 90 |
//! | `wedding` | `wedding` | 80 |
//! | `corporate` | `corporate` (+`early_setup` scores 60) | 50 |
//! | `regular` | anything else | 30 |
//!
//! Drivers fall into exactly one of `wedding_capable`,
//! `corporate_capable`, or `general`.

mod drivers;
mod orders;

pub use drivers::{categorize_drivers, CategorizedDrivers, DriverCategory};
pub use orders::{categorize_orders, priority_score, CategorizedOrders, PriorityCategory};
