//! Staged driver-order allocation.
//!
//! Assigns catering delivery orders to drivers in six priority stages
//! (VIP wedding, VIP corporate, VIP, wedding, corporate, regular).
//! Matching decisions come from a pluggable [`proposer::AssignmentProposer`];
//! every proposal is treated as untrusted and re-checked against the hard
//! constraints before it is committed.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Order`, `Driver`, `Timestamp`, `ServiceWindow`,
//!   `Assignment`, `UnallocatedOrder`, `Violation`
//! - **`interval`**: Overlap, gap and buffer arithmetic on order windows
//! - **`priority`**: Order and driver categorization
//! - **`feasibility`**: Hard-constraint check for one tentative assignment
//! - **`proposer`**: Proposer trait, greedy reference proposer, response parsing
//! - **`allocator`**: Stage orchestration, merging and metrics
//! - **`validation`**: Input checks and post-hoc allocation checks
//! - **`analysis`**: Input profile and constraint report
//! - **`config`**: Run configuration
//! - **`events`**: Structured allocation event stream
//!
//! # Architecture
//!
//! Data flows one way: input validation → classification → per-stage
//! proposal and feasibility filtering → merge and metrics → post-hoc
//! validation → [`allocator::AllocationResult`]. No state survives a run.

pub mod allocator;
pub mod analysis;
pub mod config;
pub mod events;
pub mod feasibility;
pub mod interval;
pub mod models;
pub mod priority;
pub mod proposer;
pub mod validation;
