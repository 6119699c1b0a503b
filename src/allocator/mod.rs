//! Staged allocation and allocation metrics.
//!
//! Runs the six priority stages against one shared per-run context,
//! merges the per-stage results into one assignment per driver, and
//! computes allocation quality metrics.
//!
//! # Pipeline
//!
//! | Step | Component |
//! |------|-----------|
//! | Input checks | [`crate::validation::validate_input`] |
//! | Profile | [`crate::analysis::DataProfile`], [`crate::analysis::ConstraintReport`] |
//! | Classification | [`crate::priority`] |
//! | Stages | [`StageOrchestrator`] over [`Stage::ALL`] |
//! | Merge | [`merge_outcomes`], [`collect_unallocated`] |
//! | Metrics | [`AllocationMetrics`] |
//! | Post-hoc checks | [`crate::validation::validate_allocation`] |
//!
//! [`Allocator`] drives the whole pipeline.

mod context;
mod engine;
mod merge;
mod metrics;
mod orchestrator;
mod stage;

pub use context::AllocationContext;
pub use engine::{AllocationError, AllocationResult, Allocator};
pub use merge::{collect_unallocated, merge_outcomes, unallocation_reason};
pub use metrics::AllocationMetrics;
pub use orchestrator::{PartialAssignment, StageOrchestrator, StageOutcome};
pub use stage::Stage;
