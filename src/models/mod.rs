//! Allocation domain models.
//!
//! Provides the core data types for representing an allocation run:
//! the orders to place, the drivers that can take them, and the
//! resulting per-driver assignments.
//!
//! # Domain Mappings
//!
//! | crew-alloc | Scheduling | Catering |
//! |------------|------------|----------|
//! | Order | Job | Delivery + setup + teardown |
//! | Driver | Resource | Delivery specialist |
//! | Capability | Skill | Wedding / VIP / corporate certification |
//! | Assignment | Resource schedule | Driver's day plan |

mod allocation;
mod driver;
mod order;
mod time;
mod window;

pub use allocation::{
    utilization_pct, Assignment, UnallocatedOrder, UnallocationReason, Violation, ViolationType,
};
pub use driver::{Capability, Driver};
pub use order::{GeoPoint, Order, Tag, TBD_POSTAL_CODE};
pub use time::{Timestamp, TimestampParseError};
pub use window::ServiceWindow;
