//! Input and result validation.
//!
//! - [`validate_input`]: structural checks on orders and drivers before
//!   a run (duplicate IDs, missing fields, time windows, offsets).
//! - [`validate_allocation`]: independent re-check of a finished
//!   allocation against the hard constraints.

mod allocation;
mod input;

pub use allocation::{validate_allocation, ValidationReport};
pub use input::{validate_input, InputError, InputErrorKind, InputResult};
