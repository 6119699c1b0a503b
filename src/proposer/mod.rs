//! Assignment proposers.
//!
//! A proposer suggests which driver should take which orders in a
//! stage. Proposals are untrusted: the orchestrator resolves every id
//! and runs the feasibility check before anything is committed, so a
//! proposer can be a remote text-generation service, a recorded
//! transcript, or a local heuristic.
//!
//! | Proposer | Source |
//! |----------|--------|
//! | [`GreedyProposer`] | Deterministic region/load heuristic |
//! | [`ReplayProposer`] | Pre-recorded per-stage responses |
//! | `FnMut(&ProposalRequest) -> Result<..>` | Any closure |
//!
//! Raw text responses (JSON, optionally fenced in Markdown) are turned
//! into proposals with [`parse_proposals`].

mod greedy;
mod response;

pub use greedy::GreedyProposer;
pub use response::{parse_proposals, ReplayProposer};

use serde::{Deserialize, Serialize};

use crate::allocator::{AllocationContext, Stage};
use crate::config::{AllocatorConfig, ProposalStrategy};
use crate::models::{Driver, Order};

/// Failure of a proposer call. Always contained to one stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProposerError {
    #[error("proposer timed out after {elapsed_ms} ms (limit {limit_ms} ms)")]
    Timeout { elapsed_ms: u64, limit_ms: u64 },
    #[error("malformed proposer response: {0}")]
    Malformed(String),
    #[error("proposer transport failure: {0}")]
    Transport(String),
}

impl From<serde_json::Error> for ProposerError {
    fn from(err: serde_json::Error) -> Self {
        ProposerError::Malformed(err.to_string())
    }
}

/// One proposed driver with the orders it should take, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(default)]
    pub driver_id: String,
    #[serde(default)]
    pub order_ids: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
}

impl Proposal {
    pub fn new(driver_id: impl Into<String>) -> Self {
        Self {
            driver_id: driver_id.into(),
            order_ids: Vec::new(),
            reasoning: String::new(),
        }
    }

    pub fn with_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_ids.push(order_id.into());
        self
    }

    pub fn with_orders<I, S>(mut self, order_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order_ids.extend(order_ids.into_iter().map(Into::into));
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

/// Everything a proposer may look at for one stage.
#[derive(Debug, Clone, Copy)]
pub struct ProposalRequest<'a> {
    /// Stage being allocated.
    pub stage: Stage,
    /// Stage orders, highest priority first.
    pub orders: &'a [&'a Order],
    /// Eligible drivers with remaining capacity.
    pub drivers: &'a [&'a Driver],
    /// Read-only view of the run so far.
    pub context: &'a AllocationContext<'a>,
    pub config: &'a AllocatorConfig,
}

impl<'a> ProposalRequest<'a> {
    /// Orders already committed to `driver_id`.
    pub fn committed(&self, driver_id: &str) -> &[&'a Order] {
        self.context.committed(driver_id)
    }

    /// Number of orders already committed to `driver_id`.
    pub fn assigned_count(&self, driver_id: &str) -> usize {
        self.context.assigned_count(driver_id)
    }

    pub fn strategy(&self) -> ProposalStrategy {
        self.config.strategy
    }

    pub fn min_buffer_minutes(&self) -> i64 {
        self.config.min_buffer_minutes
    }
}

/// Source of stage proposals.
pub trait AssignmentProposer {
    /// Proposes driver/order pairings for one stage.
    ///
    /// Called at most once per stage.
    fn propose(&mut self, request: &ProposalRequest<'_>) -> Result<Vec<Proposal>, ProposerError>;
}

impl<F> AssignmentProposer for F
where
    F: FnMut(&ProposalRequest<'_>) -> Result<Vec<Proposal>, ProposerError>,
{
    fn propose(&mut self, request: &ProposalRequest<'_>) -> Result<Vec<Proposal>, ProposerError> {
        (*self)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proposal_builder() {
        let p = Proposal::new("D1")
            .with_order("Q1")
            .with_orders(["Q2", "Q3"])
            .with_reasoning("same region");
        assert_eq!(p.order_ids, vec!["Q1", "Q2", "Q3"]);
        assert_eq!(p.reasoning, "same region");
    }

    #[test]
    fn test_proposal_missing_fields_default() {
        let p: Proposal = serde_json::from_str(r#"{"order_ids": ["Q1"]}"#).unwrap();
        assert!(p.driver_id.is_empty());
        assert!(p.reasoning.is_empty());
    }

    #[test]
    fn test_error_display() {
        let e = ProposerError::Timeout {
            elapsed_ms: 1200,
            limit_ms: 1000,
        };
        assert_eq!(
            e.to_string(),
            "proposer timed out after 1200 ms (limit 1000 ms)"
        );
        let e: ProposerError = serde_json::from_str::<Proposal>("nope").unwrap_err().into();
        assert!(matches!(e, ProposerError::Malformed(_)));
    }
}
