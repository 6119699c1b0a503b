//! Allocation run driver.
//!
//! # Algorithm
//!
//! 1. Validate the configuration and the input; any problem aborts.
//! 2. Profile the input and collect constraint warnings.
//! 3. Classify orders and drivers.
//! 4. Run every stage against one [`AllocationContext`].
//! 5. Merge partial lists, derive unallocated reasons, compute metrics.
//! 6. Re-validate the final assignments.
//!
//! # Complexity
//! Dominated by the proposer and by post-hoc validation, O(d * k^2)
//! where d=drivers used, k=orders per driver.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{ConstraintReport, DataProfile};
use crate::config::{AllocatorConfig, ConfigError};
use crate::events::{AllocationEvent, EventSink, TracingSink};
use crate::models::{Assignment, Driver, Order, UnallocatedOrder};
use crate::priority::{categorize_drivers, categorize_orders};
use crate::proposer::AssignmentProposer;
use crate::validation::{validate_allocation, validate_input, InputError, ValidationReport};

use super::{collect_unallocated, merge_outcomes, AllocationContext, AllocationMetrics, StageOrchestrator};

/// Failures that prevent a run from starting.
#[derive(Debug, Clone, Error)]
pub enum AllocationError {
    /// The input failed structural validation; every problem is listed.
    #[error("invalid input: {}", join_messages(.0))]
    InvalidInput(Vec<InputError>),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn join_messages(errors: &[InputError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Output of one allocation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationResult {
    /// One entry per driver with at least one order, by descending utilization.
    pub assignments: Vec<Assignment>,
    /// Orders left unassigned, in input order.
    pub unallocated: Vec<UnallocatedOrder>,
    pub metrics: AllocationMetrics,
    /// Constraint findings and soft validation issues.
    pub warnings: Vec<String>,
    /// Post-hoc hard-constraint check of `assignments`.
    pub validation: ValidationReport,
}

impl AllocationResult {
    /// Whether the post-hoc validation found no hard violation.
    ///
    /// Unallocated orders do not make a result invalid.
    pub fn is_valid(&self) -> bool {
        self.validation.is_valid()
    }

    /// Assignment of a given driver.
    pub fn assignment_for(&self, driver_id: &str) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.driver.id == driver_id)
    }
}

/// Staged order allocator.
///
/// Owns the proposer and configuration; each call to
/// [`allocate`](Self::allocate) is an independent run.
#[derive(Debug, Clone)]
pub struct Allocator<P> {
    proposer: P,
    config: AllocatorConfig,
}

impl<P: AssignmentProposer> Allocator<P> {
    /// Creates an allocator with the default configuration.
    pub fn new(proposer: P) -> Self {
        Self {
            proposer,
            config: AllocatorConfig::default(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: AllocatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    pub fn proposer(&self) -> &P {
        &self.proposer
    }

    /// Runs an allocation, logging progress through `tracing`.
    pub fn allocate(
        &mut self,
        orders: &[Order],
        drivers: &[Driver],
    ) -> Result<AllocationResult, AllocationError> {
        let mut sink = TracingSink::new(self.config.log_rejections);
        self.allocate_with_events(orders, drivers, &mut sink)
    }

    /// Runs an allocation, sending every event to `sink`.
    ///
    /// # Errors
    /// Returns [`AllocationError`] before any stage runs when the
    /// configuration or the input is invalid.
    pub fn allocate_with_events(
        &mut self,
        orders: &[Order],
        drivers: &[Driver],
        sink: &mut dyn EventSink,
    ) -> Result<AllocationResult, AllocationError> {
        self.config.validate()?;
        if let Err(errors) = validate_input(orders, drivers) {
            tracing::warn!(errors = errors.len(), "input validation failed");
            return Err(AllocationError::InvalidInput(errors));
        }

        let profile = DataProfile::calculate(orders, drivers);
        let report = ConstraintReport::identify(&profile, &self.config);
        for finding in &report.critical {
            tracing::warn!(finding = %finding, "critical constraint");
        }
        for note in &report.info {
            tracing::info!(note = %note, "input profile");
        }
        let mut warnings = report.result_warnings();

        sink.emit(AllocationEvent::RunStarted {
            orders: orders.len(),
            drivers: drivers.len(),
        });

        let categorized_orders = categorize_orders(orders);
        let categorized_drivers = categorize_drivers(drivers);
        let mut context = AllocationContext::new(drivers);

        let outcomes = StageOrchestrator::new(&self.config).run_all(
            &categorized_orders,
            &categorized_drivers,
            &mut context,
            &mut self.proposer,
            sink,
        );

        let assignments = merge_outcomes(&outcomes);
        let unallocated = collect_unallocated(orders, drivers, &assignments, &context);
        let metrics = AllocationMetrics::calculate(orders.len(), &assignments);
        let validation = validate_allocation(&assignments, &self.config);
        warnings.extend(validation.warnings.iter().map(|v| v.message.clone()));

        sink.emit(AllocationEvent::RunCompleted {
            allocated: metrics.allocated_orders,
            unallocated: unallocated.len(),
            errors: validation.errors.len(),
        });

        Ok(AllocationResult {
            assignments,
            unallocated,
            metrics,
            warnings,
            validation,
        })
    }
}
