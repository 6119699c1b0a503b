//! Greedy region/load proposer.
//!
//! # Algorithm
//!
//! 1. Walk the stage orders in priority order.
//! 2. For each order, keep the drivers for which it is feasible against
//!    their committed orders plus everything proposed so far.
//! 3. Pick the driver in the order's region first, then the one with
//!    the fewest orders, then the earliest in the eligible list.
//!
//! Under [`ProposalStrategy::Conservative`] a cross-region pick is
//! skipped when it would push the driver's out-of-region share above
//! `region_mismatch_ratio`.
//!
//! # Complexity
//! O(n * d * k) where n=stage orders, d=eligible drivers, k=orders per driver.

use crate::config::ProposalStrategy;
use crate::feasibility::FeasibilityChecker;
use crate::models::{Driver, Order};

use super::{AssignmentProposer, Proposal, ProposalRequest, ProposerError};

/// Deterministic reference proposer.
///
/// # Example
///
/// ```
/// use crew_alloc::allocator::Allocator;
/// use crew_alloc::models::{Driver, Order, Timestamp};
/// use crew_alloc::proposer::GreedyProposer;
///
/// let ts = |s: &str| -> Timestamp { s.parse().unwrap() };
/// let orders = vec![Order::new(
///     "Q1",
///     ts("2024-06-01T09:00:00"),
///     ts("2024-06-01T09:30:00"),
///     ts("2024-06-01T11:00:00"),
///     "East",
/// )];
/// let drivers = vec![Driver::new("D1", "East", 3)];
///
/// let mut allocator = Allocator::new(GreedyProposer::new());
/// let result = allocator.allocate(&orders, &drivers).unwrap();
/// assert_eq!(result.metrics.allocated_orders, 1);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyProposer;

impl GreedyProposer {
    pub fn new() -> Self {
        GreedyProposer
    }
}

/// Working list for one eligible driver.
struct Slot<'a> {
    driver: &'a Driver,
    /// Committed plus tentatively proposed.
    orders: Vec<&'a Order>,
    proposed: Vec<String>,
    proposed_in_region: usize,
    out_of_region: usize,
}

impl<'a> Slot<'a> {
    fn out_of_region_share_with(&self, order: &Order) -> f64 {
        let extra = usize::from(order.region != self.driver.preferred_region);
        (self.out_of_region + extra) as f64 / (self.orders.len() + 1) as f64
    }
}

impl AssignmentProposer for GreedyProposer {
    fn propose(&mut self, request: &ProposalRequest<'_>) -> Result<Vec<Proposal>, ProposerError> {
        let checker = FeasibilityChecker::new(request.min_buffer_minutes());
        let conservative = request.strategy() == ProposalStrategy::Conservative;
        let max_share = request.config.region_mismatch_ratio;

        let mut slots: Vec<Slot<'_>> = request
            .drivers
            .iter()
            .map(|&driver| {
                let orders = request.committed(&driver.id).to_vec();
                let out_of_region = orders
                    .iter()
                    .filter(|o| o.region != driver.preferred_region)
                    .count();
                Slot {
                    driver,
                    orders,
                    proposed: Vec::new(),
                    proposed_in_region: 0,
                    out_of_region,
                }
            })
            .collect();
        let mut first_seen: Vec<usize> = Vec::new();

        for &order in request.orders {
            if request.context.is_allocated(&order.id) {
                continue;
            }

            let best = slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| checker.is_feasible(order, slot.driver, &slot.orders))
                .filter(|(_, slot)| {
                    !conservative
                        || order.region == slot.driver.preferred_region
                        || slot.out_of_region_share_with(order) <= max_share
                })
                .min_by_key(|(i, slot)| {
                    (
                        order.region != slot.driver.preferred_region,
                        slot.orders.len(),
                        *i,
                    )
                })
                .map(|(i, _)| i);

            if let Some(i) = best {
                let slot = &mut slots[i];
                if slot.proposed.is_empty() {
                    first_seen.push(i);
                }
                if order.region == slot.driver.preferred_region {
                    slot.proposed_in_region += 1;
                } else {
                    slot.out_of_region += 1;
                }
                slot.orders.push(order);
                slot.proposed.push(order.id.clone());
            }
        }

        Ok(first_seen
            .into_iter()
            .map(|i| {
                let slot = &slots[i];
                Proposal::new(slot.driver.id.clone())
                    .with_orders(slot.proposed.iter().cloned())
                    .with_reasoning(format!(
                        "{} order(s) for {}, {} in preferred region {}",
                        slot.proposed.len(),
                        request.stage,
                        slot.proposed_in_region,
                        slot.driver.preferred_region
                    ))
            })
            .collect())
    }
}
