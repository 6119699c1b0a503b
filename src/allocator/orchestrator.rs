//! Staged allocation.
//!
//! # Algorithm
//!
//! For each [`Stage`] in order:
//! 1. Select the stage's orders and its driver pool; keep drivers with
//!    remaining capacity. Skip the stage if either is empty.
//! 2. Ask the proposer once for `(driver, orders)` proposals.
//! 3. Resolve every id; drop unknown or ineligible drivers and orders
//!    outside the stage or already taken.
//! 4. Run the feasibility check for each order in the proposal's listed
//!    order against the driver's committed list, committing on success.
//!
//! A proposer failure (error or timeout) degrades the stage to zero
//! allocations; the run always continues.

use std::collections::HashMap;
use std::time::Instant;

use crate::config::AllocatorConfig;
use crate::events::{AllocationEvent, DropReason, EventSink, SkipReason};
use crate::feasibility::FeasibilityChecker;
use crate::models::{Driver, Order};
use crate::priority::{CategorizedDrivers, CategorizedOrders};
use crate::proposer::{AssignmentProposer, Proposal, ProposalRequest, ProposerError};

use super::{AllocationContext, Stage};

/// Orders committed to one driver within one stage, in commit order.
#[derive(Debug, Clone)]
pub struct PartialAssignment<'a> {
    pub driver: &'a Driver,
    pub orders: Vec<&'a Order>,
    /// Last non-empty reasoning seen for this driver in the stage.
    pub reasoning: String,
}

/// Result of running one stage.
#[derive(Debug, Clone)]
pub struct StageOutcome<'a> {
    pub stage: Stage,
    /// Non-empty partial lists, in first-commit order of their driver.
    pub partials: Vec<PartialAssignment<'a>>,
    /// Set when the proposer failed and the stage was degraded.
    pub proposer_error: Option<ProposerError>,
}

impl<'a> StageOutcome<'a> {
    fn empty(stage: Stage) -> Self {
        Self {
            stage,
            partials: Vec::new(),
            proposer_error: None,
        }
    }

    /// Orders committed in this stage.
    pub fn committed_count(&self) -> usize {
        self.partials.iter().map(|p| p.orders.len()).sum()
    }
}

/// Runs allocation stages against a shared [`AllocationContext`].
#[derive(Debug, Clone, Copy)]
pub struct StageOrchestrator<'c> {
    config: &'c AllocatorConfig,
    checker: FeasibilityChecker,
}

impl<'c> StageOrchestrator<'c> {
    pub fn new(config: &'c AllocatorConfig) -> Self {
        Self {
            config,
            checker: FeasibilityChecker::new(config.min_buffer_minutes),
        }
    }

    /// Runs every stage in order.
    pub fn run_all<'a, P>(
        &self,
        orders: &CategorizedOrders<'a>,
        drivers: &CategorizedDrivers<'a>,
        context: &mut AllocationContext<'a>,
        proposer: &mut P,
        sink: &mut dyn EventSink,
    ) -> Vec<StageOutcome<'a>>
    where
        P: AssignmentProposer + ?Sized,
    {
        Stage::ALL
            .iter()
            .map(|&stage| self.run_stage(stage, orders, drivers, context, proposer, sink))
            .collect()
    }

    /// Runs a single stage.
    pub fn run_stage<'a, P>(
        &self,
        stage: Stage,
        orders: &CategorizedOrders<'a>,
        drivers: &CategorizedDrivers<'a>,
        context: &mut AllocationContext<'a>,
        proposer: &mut P,
        sink: &mut dyn EventSink,
    ) -> StageOutcome<'a>
    where
        P: AssignmentProposer + ?Sized,
    {
        let stage_orders = stage.select_orders(orders);
        if stage_orders.is_empty() {
            sink.emit(AllocationEvent::StageSkipped {
                stage,
                reason: SkipReason::NoOrders,
            });
            return StageOutcome::empty(stage);
        }

        let pool: Vec<&'a Driver> = stage
            .select_drivers(drivers, context.drivers())
            .into_iter()
            .filter(|d| context.remaining_capacity(d) > 0)
            .collect();
        if pool.is_empty() {
            sink.emit(AllocationEvent::StageSkipped {
                stage,
                reason: SkipReason::NoDriverCapacity,
            });
            return StageOutcome::empty(stage);
        }

        sink.emit(AllocationEvent::StageStarted {
            stage,
            orders: stage_orders.len(),
            drivers: pool.len(),
        });

        let proposals = match self.call_proposer(stage, &stage_orders, &pool, context, proposer) {
            Ok(proposals) => proposals,
            Err(error) => {
                sink.emit(AllocationEvent::ProposerFailed {
                    stage,
                    error: error.clone(),
                });
                sink.emit(AllocationEvent::StageCompleted {
                    stage,
                    committed: 0,
                    remaining: stage_orders.len(),
                });
                return StageOutcome {
                    stage,
                    partials: Vec::new(),
                    proposer_error: Some(error),
                };
            }
        };

        let outcome = self.apply_proposals(stage, &stage_orders, &pool, proposals, context, sink);

        let remaining = stage_orders
            .iter()
            .filter(|o| !context.is_allocated(&o.id))
            .count();
        sink.emit(AllocationEvent::StageCompleted {
            stage,
            committed: outcome.committed_count(),
            remaining,
        });
        outcome
    }

    fn call_proposer<'a, P>(
        &self,
        stage: Stage,
        stage_orders: &[&'a Order],
        pool: &[&'a Driver],
        context: &AllocationContext<'a>,
        proposer: &mut P,
    ) -> Result<Vec<Proposal>, ProposerError>
    where
        P: AssignmentProposer + ?Sized,
    {
        let request = ProposalRequest {
            stage,
            orders: stage_orders,
            drivers: pool,
            context,
            config: self.config,
        };

        let started = Instant::now();
        let proposals = proposer.propose(&request)?;
        let elapsed = started.elapsed();

        match self.config.proposer_timeout() {
            Some(limit) if elapsed > limit => Err(ProposerError::Timeout {
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                limit_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
            _ => Ok(proposals),
        }
    }

    fn apply_proposals<'a>(
        &self,
        stage: Stage,
        stage_orders: &[&'a Order],
        pool: &[&'a Driver],
        proposals: Vec<Proposal>,
        context: &mut AllocationContext<'a>,
        sink: &mut dyn EventSink,
    ) -> StageOutcome<'a> {
        let order_lookup: HashMap<&str, &'a Order> =
            stage_orders.iter().map(|&o| (o.id.as_str(), o)).collect();

        let mut outcome = StageOutcome::empty(stage);
        let mut partial_index: HashMap<&str, usize> = HashMap::new();

        for proposal in proposals {
            let driver = match context.driver(&proposal.driver_id) {
                Some(d) if pool.iter().any(|p| p.id == d.id) => d,
                found => {
                    let reason = if found.is_some() {
                        DropReason::IneligibleDriver
                    } else {
                        DropReason::UnknownDriver
                    };
                    sink.emit(AllocationEvent::ProposalDropped {
                        stage,
                        driver_id: proposal.driver_id,
                        order_id: None,
                        reason,
                    });
                    continue;
                }
            };

            for order_id in &proposal.order_ids {
                let Some(&order) = order_lookup.get(order_id.as_str()) else {
                    self.drop_order(sink, stage, driver, order_id, DropReason::OrderNotInStage);
                    continue;
                };
                if context.is_allocated(&order.id) {
                    self.drop_order(sink, stage, driver, order_id, DropReason::AlreadyAllocated);
                    continue;
                }

                match context.try_commit(&self.checker, order, driver) {
                    Ok(()) => {
                        let idx = *partial_index.entry(driver.id.as_str()).or_insert_with(|| {
                            outcome.partials.push(PartialAssignment {
                                driver,
                                orders: Vec::new(),
                                reasoning: String::new(),
                            });
                            outcome.partials.len() - 1
                        });
                        outcome.partials[idx].orders.push(order);
                        sink.emit(AllocationEvent::OrderCommitted {
                            stage,
                            order_id: order.id.clone(),
                            driver_id: driver.id.clone(),
                        });
                    }
                    Err(rejection) => {
                        sink.emit(AllocationEvent::OrderRejected {
                            stage,
                            order_id: order.id.clone(),
                            driver_id: driver.id.clone(),
                            rejection,
                        });
                    }
                }
            }

            if !proposal.reasoning.is_empty() {
                if let Some(&idx) = partial_index.get(driver.id.as_str()) {
                    outcome.partials[idx].reasoning = proposal.reasoning;
                }
            }
        }

        outcome
    }

    fn drop_order(
        &self,
        sink: &mut dyn EventSink,
        stage: Stage,
        driver: &Driver,
        order_id: &str,
        reason: DropReason,
    ) {
        sink.emit(AllocationEvent::ProposalDropped {
            stage,
            driver_id: driver.id.clone(),
            order_id: Some(order_id.to_string()),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use crate::priority::{categorize_drivers, categorize_orders};
    use crate::proposer::ReplayProposer;

    fn ts(t: &str) -> Timestamp {
        format!("2024-06-01T{t}:00").parse().unwrap()
    }

    /// Setup halfway between pickup and teardown.
    fn setup_between(pickup: &str, teardown: &str) -> Timestamp {
        let p = ts(pickup);
        Timestamp::naive(p.local() + p.until(&ts(teardown)) / 2)
    }

    fn order(id: &str, pickup: &str, teardown: &str, tags: &[&str]) -> Order {
        tags.iter().fold(
            Order::new(id, ts(pickup), setup_between(pickup, teardown), ts(teardown), "East"),
            |o, t| o.with_tag(*t),
        )
    }

    fn run(
        orders: &[Order],
        drivers: &[Driver],
        stage: Stage,
        mut proposer: impl AssignmentProposer,
        config: &AllocatorConfig,
    ) -> (usize, Vec<String>, Vec<AllocationEvent>) {
        let co = categorize_orders(orders);
        let cd = categorize_drivers(drivers);
        let mut ctx = AllocationContext::new(drivers);
        let mut events: Vec<AllocationEvent> = Vec::new();
        let outcome = StageOrchestrator::new(config).run_stage(
            stage,
            &co,
            &cd,
            &mut ctx,
            &mut proposer,
            &mut events,
        );
        let committed: Vec<String> = outcome
            .partials
            .iter()
            .flat_map(|p| p.orders.iter().map(|o| o.id.clone()))
            .collect();
        (outcome.committed_count(), committed, events)
    }

    #[test]
    fn test_commits_in_listed_order() {
        let orders = vec![
            order("W1", "09:00", "10:00", &["wedding"]),
            order("W2", "09:30", "10:30", &["wedding"]),
        ];
        let drivers = vec![Driver::new("D1", "East", 3).with_capability("wedding")];
        // W2 first: it wins, W1 then conflicts.
        let replay = ReplayProposer::new().with_stage(
            Stage::Wedding,
            vec![Proposal::new("D1").with_orders(["W2", "W1"])],
        );
        let (count, ids, events) =
            run(&orders, &drivers, Stage::Wedding, replay, &AllocatorConfig::default());
        assert_eq!(count, 1);
        assert_eq!(ids, vec!["W2"]);
        assert!(events
            .iter()
            .any(|e| matches!(e, AllocationEvent::OrderRejected { order_id, .. } if order_id == "W1")));
    }

    #[test]
    fn test_untrusted_ids_are_dropped() {
        let orders = vec![
            order("W1", "09:00", "10:00", &["wedding"]),
            order("R1", "12:00", "13:00", &[]),
        ];
        let drivers = vec![
            Driver::new("D1", "East", 3).with_capability("wedding"),
            Driver::new("G1", "East", 3),
        ];
        let replay = ReplayProposer::new().with_stage(
            Stage::Wedding,
            vec![
                Proposal::new("GHOST").with_order("W1"),
                Proposal::new("G1").with_order("W1"),
                Proposal::new("D1").with_orders(["R1", "NOPE", "W1", "W1"]),
            ],
        );
        let (count, ids, events) =
            run(&orders, &drivers, Stage::Wedding, replay, &AllocatorConfig::default());
        assert_eq!(count, 1);
        assert_eq!(ids, vec!["W1"]);

        let reasons: Vec<DropReason> = events
            .iter()
            .filter_map(|e| match e {
                AllocationEvent::ProposalDropped { reason, .. } => Some(*reason),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                DropReason::UnknownDriver,
                DropReason::IneligibleDriver,
                DropReason::OrderNotInStage,
                DropReason::OrderNotInStage,
                DropReason::AlreadyAllocated,
            ]
        );
    }

    #[test]
    fn test_proposer_failure_degrades_stage() {
        let orders = vec![order("R1", "09:00", "10:00", &[])];
        let drivers = vec![Driver::new("D1", "East", 3)];
        let replay = ReplayProposer::new()
            .with_failure(Stage::Regular, ProposerError::Transport("503".into()));
        let (count, _, events) =
            run(&orders, &drivers, Stage::Regular, replay, &AllocatorConfig::default());
        assert_eq!(count, 0);
        assert!(events
            .iter()
            .any(|e| matches!(e, AllocationEvent::ProposerFailed { .. })));
        assert!(matches!(
            events.last(),
            Some(AllocationEvent::StageCompleted { committed: 0, remaining: 1, .. })
        ));
    }

    #[test]
    fn test_timeout_discards_output() {
        let orders = vec![order("R1", "09:00", "10:00", &[])];
        let drivers = vec![Driver::new("D1", "East", 3)];
        let slow = |_: &ProposalRequest<'_>| -> Result<Vec<Proposal>, ProposerError> {
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(vec![Proposal::new("D1").with_order("R1")])
        };
        let config = AllocatorConfig::default().with_proposer_timeout_ms(1);
        let (count, _, events) = run(&orders, &drivers, Stage::Regular, slow, &config);
        assert_eq!(count, 0);
        assert!(events.iter().any(|e| matches!(
            e,
            AllocationEvent::ProposerFailed {
                error: ProposerError::Timeout { .. },
                ..
            }
        )));
    }

    #[test]
    fn test_skips_without_orders_or_capacity() {
        let orders = vec![order("R1", "09:00", "10:00", &[])];
        let drivers = vec![Driver::new("D0", "East", 0)];
        let mut calls = 0;
        let counting = |_: &ProposalRequest<'_>| -> Result<Vec<Proposal>, ProposerError> {
            calls += 1;
            Ok(Vec::new())
        };
        let co = categorize_orders(&orders);
        let cd = categorize_drivers(&drivers);
        let mut ctx = AllocationContext::new(&drivers);
        let mut events: Vec<AllocationEvent> = Vec::new();
        let config = AllocatorConfig::default();
        let mut proposer = counting;
        let outcomes = StageOrchestrator::new(&config).run_all(
            &co,
            &cd,
            &mut ctx,
            &mut proposer,
            &mut events,
        );
        assert_eq!(outcomes.len(), 6);
        assert_eq!(calls, 0);
        assert!(events.contains(&AllocationEvent::StageSkipped {
            stage: Stage::Regular,
            reason: SkipReason::NoDriverCapacity,
        }));
        assert!(events.contains(&AllocationEvent::StageSkipped {
            stage: Stage::Wedding,
            reason: SkipReason::NoOrders,
        }));
    }

    #[test]
    fn test_reasoning_keeps_last_non_empty() {
        let orders = vec![
            order("R1", "08:00", "09:00", &[]),
            order("R2", "11:00", "12:00", &[]),
        ];
        let drivers = vec![Driver::new("D1", "East", 3)];
        let replay = ReplayProposer::new().with_stage(
            Stage::Regular,
            vec![
                Proposal::new("D1").with_order("R1").with_reasoning("morning"),
                Proposal::new("D1").with_order("R2"),
            ],
        );
        let co = categorize_orders(&orders);
        let cd = categorize_drivers(&drivers);
        let mut ctx = AllocationContext::new(&drivers);
        let config = AllocatorConfig::default();
        let mut replay = replay;
        let outcome = StageOrchestrator::new(&config).run_stage(
            Stage::Regular,
            &co,
            &cd,
            &mut ctx,
            &mut replay,
            &mut crate::events::DiscardEvents,
        );
        assert_eq!(outcome.partials.len(), 1);
        assert_eq!(outcome.partials[0].orders.len(), 2);
        assert_eq!(outcome.partials[0].reasoning, "morning");
    }
}
