//! Input validation for allocation runs.
//!
//! Checks structural integrity of orders and drivers before any stage
//! runs. Detects:
//! - Duplicate IDs
//! - Missing required fields
//! - Badly ordered service windows
//! - Mixed timestamp offset conventions

use std::collections::HashSet;
use std::fmt;

use crate::models::{Driver, Order};

/// Validation result.
pub type InputResult = Result<(), Vec<InputError>>;

/// An input error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputError {
    /// Error category.
    pub kind: InputErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of input errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputErrorKind {
    /// Two orders or two drivers share the same ID.
    DuplicateId,
    /// A required field is empty.
    MissingField,
    /// `pickup_time < setup_time < teardown_time` does not hold.
    InvalidTimeWindow,
    /// Timestamps disagree on naive vs. offset, or on the offset itself.
    MixedTimezones,
}

impl InputError {
    fn new(kind: InputErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates orders and drivers for an allocation run.
///
/// Checks:
/// 1. No duplicate order IDs
/// 2. No duplicate driver IDs
/// 3. Orders have an id and a region
/// 4. Drivers have an id, a name and a preferred region
/// 5. Every order satisfies `pickup < setup < teardown`
/// 6. All order timestamps share one offset convention
///
/// A driver with `max_orders_per_day = 0` is valid; it never receives work.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(orders: &[Order], drivers: &[Driver]) -> InputResult {
    let mut errors = Vec::new();

    let mut order_ids = HashSet::new();
    for order in orders {
        if order.id.trim().is_empty() {
            errors.push(InputError::new(
                InputErrorKind::MissingField,
                "Order with empty order_id",
            ));
        } else if !order_ids.insert(order.id.as_str()) {
            errors.push(InputError::new(
                InputErrorKind::DuplicateId,
                format!("Duplicate order ID: {}", order.id),
            ));
        }

        if order.region.trim().is_empty() {
            errors.push(InputError::new(
                InputErrorKind::MissingField,
                format!("Order '{}' has no region", order.id),
            ));
        }

        if !order.window().is_well_ordered() {
            errors.push(InputError::new(
                InputErrorKind::InvalidTimeWindow,
                format!(
                    "Order '{}' times must satisfy pickup < setup < teardown ({} / {} / {})",
                    order.id, order.pickup_time, order.setup_time, order.teardown_time
                ),
            ));
        }
    }

    let mut driver_ids = HashSet::new();
    for driver in drivers {
        if driver.id.trim().is_empty() {
            errors.push(InputError::new(
                InputErrorKind::MissingField,
                "Driver with empty driver_id",
            ));
        } else if !driver_ids.insert(driver.id.as_str()) {
            errors.push(InputError::new(
                InputErrorKind::DuplicateId,
                format!("Duplicate driver ID: {}", driver.id),
            ));
        }

        for (field, value) in [
            ("name", &driver.name),
            ("preferred_region", &driver.preferred_region),
        ] {
            if value.trim().is_empty() {
                errors.push(InputError::new(
                    InputErrorKind::MissingField,
                    format!("Driver '{}' has no {field}", driver.id),
                ));
            }
        }
    }

    if let Some(err) = detect_mixed_timezones(orders) {
        errors.push(err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Finds the first timestamp whose convention differs from the first
/// order's pickup time.
fn detect_mixed_timezones(orders: &[Order]) -> Option<InputError> {
    let reference = orders.first()?.pickup_time;
    for order in orders {
        for ts in [order.pickup_time, order.setup_time, order.teardown_time] {
            if !ts.same_convention(&reference) {
                let describe = |offset: Option<chrono::FixedOffset>| match offset {
                    Some(o) => o.to_string(),
                    None => "naive".to_string(),
                };
                return Some(InputError::new(
                    InputErrorKind::MixedTimezones,
                    format!(
                        "Order '{}' uses offset {} but the run uses {}",
                        order.id,
                        describe(ts.offset()),
                        describe(reference.offset())
                    ),
                ));
            }
        }
    }
    None
}
