//! Structured allocation events.
//!
//! The orchestrator narrates a run as a stream of [`AllocationEvent`]s
//! pushed into an [`EventSink`]. Callers pick the sink:
//!
//! | Sink | Behavior |
//! |------|----------|
//! | `Vec<AllocationEvent>` | Collects every event |
//! | [`DiscardEvents`] | Drops everything |
//! | [`TracingSink`] | Emits `tracing` records |

use std::fmt;

use crate::allocator::Stage;
use crate::feasibility::Rejection;
use crate::proposer::ProposerError;

/// Why a stage did not call the proposer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No orders fall into the stage.
    NoOrders,
    /// Every eligible driver is at capacity (or the pool is empty).
    NoDriverCapacity,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::NoOrders => "no orders",
            SkipReason::NoDriverCapacity => "no eligible driver with remaining capacity",
        })
    }
}

/// Why part of a proposal was ignored before the feasibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Driver id does not exist in the run.
    UnknownDriver,
    /// Driver exists but is not in the stage's eligible pool.
    IneligibleDriver,
    /// Order id is not one of the stage's orders.
    OrderNotInStage,
    /// Order was already committed earlier in the run.
    AlreadyAllocated,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DropReason::UnknownDriver => "unknown driver",
            DropReason::IneligibleDriver => "driver not eligible for stage",
            DropReason::OrderNotInStage => "order not in stage",
            DropReason::AlreadyAllocated => "order already allocated",
        })
    }
}

/// One step of an allocation run.
#[derive(Debug, Clone, PartialEq)]
pub enum AllocationEvent {
    RunStarted {
        orders: usize,
        drivers: usize,
    },
    StageStarted {
        stage: Stage,
        orders: usize,
        drivers: usize,
    },
    StageSkipped {
        stage: Stage,
        reason: SkipReason,
    },
    ProposerFailed {
        stage: Stage,
        error: ProposerError,
    },
    ProposalDropped {
        stage: Stage,
        driver_id: String,
        /// `None` when the whole proposal was dropped.
        order_id: Option<String>,
        reason: DropReason,
    },
    OrderRejected {
        stage: Stage,
        order_id: String,
        driver_id: String,
        rejection: Rejection,
    },
    OrderCommitted {
        stage: Stage,
        order_id: String,
        driver_id: String,
    },
    StageCompleted {
        stage: Stage,
        /// Orders committed in this stage.
        committed: usize,
        /// Stage orders still unallocated afterwards.
        remaining: usize,
    },
    RunCompleted {
        allocated: usize,
        unallocated: usize,
        errors: usize,
    },
}

impl fmt::Display for AllocationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationEvent::RunStarted { orders, drivers } => {
                write!(f, "allocating {orders} orders across {drivers} drivers")
            }
            AllocationEvent::StageStarted {
                stage,
                orders,
                drivers,
            } => write!(f, "[{stage}] {orders} orders, {drivers} drivers available"),
            AllocationEvent::StageSkipped { stage, reason } => {
                write!(f, "[{stage}] skipped: {reason}")
            }
            AllocationEvent::ProposerFailed { stage, error } => {
                write!(f, "[{stage}] proposer failed: {error}")
            }
            AllocationEvent::ProposalDropped {
                stage,
                driver_id,
                order_id: Some(order_id),
                reason,
            } => write!(f, "[{stage}] dropped {order_id} for {driver_id}: {reason}"),
            AllocationEvent::ProposalDropped {
                stage,
                driver_id,
                order_id: None,
                reason,
            } => write!(f, "[{stage}] dropped proposal for {driver_id}: {reason}"),
            AllocationEvent::OrderRejected {
                stage,
                order_id,
                driver_id,
                rejection,
            } => write!(f, "[{stage}] skipped {order_id} for {driver_id}: {rejection}"),
            AllocationEvent::OrderCommitted {
                stage,
                order_id,
                driver_id,
            } => write!(f, "[{stage}] {order_id} -> {driver_id}"),
            AllocationEvent::StageCompleted {
                stage,
                committed,
                remaining,
            } => write!(f, "[{stage}] allocated {committed}, {remaining} remaining"),
            AllocationEvent::RunCompleted {
                allocated,
                unallocated,
                errors,
            } => write!(
                f,
                "allocated {allocated}, unallocated {unallocated}, {errors} validation errors"
            ),
        }
    }
}

/// Receiver of allocation events.
pub trait EventSink {
    fn emit(&mut self, event: AllocationEvent);
}

impl EventSink for Vec<AllocationEvent> {
    fn emit(&mut self, event: AllocationEvent) {
        self.push(event);
    }
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardEvents;

impl EventSink for DiscardEvents {
    fn emit(&mut self, _event: AllocationEvent) {}
}

/// Sink that forwards events to `tracing`.
///
/// Stage progress is logged at info, proposer failures at warn, and
/// per-order decisions at debug (info when `log_rejections` is set).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    log_rejections: bool,
}

impl TracingSink {
    pub fn new(log_rejections: bool) -> Self {
        Self { log_rejections }
    }
}

impl EventSink for TracingSink {
    fn emit(&mut self, event: AllocationEvent) {
        match &event {
            AllocationEvent::RunStarted { orders, drivers } => {
                tracing::info!(orders, drivers, "allocation run started");
            }
            AllocationEvent::StageStarted {
                stage,
                orders,
                drivers,
            } => {
                tracing::info!(stage = %stage, orders, drivers, "stage started");
            }
            AllocationEvent::StageSkipped { stage, reason } => {
                tracing::info!(stage = %stage, reason = %reason, "stage skipped");
            }
            AllocationEvent::ProposerFailed { stage, error } => {
                tracing::warn!(stage = %stage, error = %error, "proposer failed, stage yields no allocations");
            }
            AllocationEvent::ProposalDropped {
                stage,
                driver_id,
                order_id,
                reason,
            } => {
                tracing::debug!(
                    stage = %stage,
                    driver_id = %driver_id,
                    order_id = ?order_id,
                    reason = %reason,
                    "proposal dropped"
                );
            }
            AllocationEvent::OrderRejected {
                stage,
                order_id,
                driver_id,
                rejection,
            } => {
                if self.log_rejections {
                    tracing::info!(stage = %stage, order_id = %order_id, driver_id = %driver_id, rejection = %rejection, "order rejected");
                } else {
                    tracing::debug!(stage = %stage, order_id = %order_id, driver_id = %driver_id, rejection = %rejection, "order rejected");
                }
            }
            AllocationEvent::OrderCommitted {
                stage,
                order_id,
                driver_id,
            } => {
                tracing::debug!(stage = %stage, order_id = %order_id, driver_id = %driver_id, "order committed");
            }
            AllocationEvent::StageCompleted {
                stage,
                committed,
                remaining,
            } => {
                tracing::info!(stage = %stage, committed, remaining, "stage completed");
            }
            AllocationEvent::RunCompleted {
                allocated,
                unallocated,
                errors,
            } => {
                if *errors > 0 {
                    tracing::warn!(allocated, unallocated, errors, "allocation run completed with validation errors");
                } else {
                    tracing::info!(allocated, unallocated, "allocation run completed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing::{span, Event, Level, Metadata, Subscriber};

    #[test]
    fn test_vec_sink_collects() {
        let mut sink: Vec<AllocationEvent> = Vec::new();
        sink.emit(AllocationEvent::RunStarted {
            orders: 3,
            drivers: 2,
        });
        sink.emit(AllocationEvent::StageSkipped {
            stage: Stage::Vip,
            reason: SkipReason::NoOrders,
        });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[1].to_string(), "[vip] skipped: no orders");
    }

    #[test]
    fn test_display_rejection() {
        let e = AllocationEvent::OrderRejected {
            stage: Stage::Wedding,
            order_id: "Q2".into(),
            driver_id: "D1".into(),
            rejection: Rejection::TimeConflict {
                order_id: "Q1".into(),
            },
        };
        assert_eq!(
            e.to_string(),
            "[wedding] skipped Q2 for D1: time conflict with order Q1"
        );
    }

    /// Subscriber that records the level of every event it sees.
    #[derive(Clone, Default)]
    struct LevelRecorder {
        levels: Arc<Mutex<Vec<Level>>>,
    }

    impl Subscriber for LevelRecorder {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &span::Attributes<'_>) -> span::Id {
            span::Id::from_u64(1)
        }
        fn record(&self, _: &span::Id, _: &span::Record<'_>) {}
        fn record_follows_from(&self, _: &span::Id, _: &span::Id) {}
        fn event(&self, event: &Event<'_>) {
            self.levels.lock().unwrap().push(*event.metadata().level());
        }
        fn enter(&self, _: &span::Id) {}
        fn exit(&self, _: &span::Id) {}
    }

    fn levels_for(log_rejections: bool, events: Vec<AllocationEvent>) -> Vec<Level> {
        let recorder = LevelRecorder::default();
        let levels = Arc::clone(&recorder.levels);
        tracing::subscriber::with_default(recorder, || {
            let mut sink = TracingSink::new(log_rejections);
            for event in events {
                sink.emit(event);
            }
        });
        let recorded = levels.lock().unwrap().clone();
        recorded
    }

    fn rejected() -> AllocationEvent {
        AllocationEvent::OrderRejected {
            stage: Stage::Regular,
            order_id: "Q1".into(),
            driver_id: "D1".into(),
            rejection: Rejection::AtCapacity {
                assigned: 1,
                capacity: 1,
            },
        }
    }

    #[test]
    fn test_tracing_sink_levels() {
        let events = vec![
            AllocationEvent::ProposerFailed {
                stage: Stage::Regular,
                error: ProposerError::Transport("connection reset".into()),
            },
            rejected(),
            AllocationEvent::RunCompleted {
                allocated: 1,
                unallocated: 0,
                errors: 2,
            },
            AllocationEvent::RunCompleted {
                allocated: 1,
                unallocated: 0,
                errors: 0,
            },
        ];
        assert_eq!(
            levels_for(false, events),
            vec![Level::WARN, Level::DEBUG, Level::WARN, Level::INFO]
        );
    }

    #[test]
    fn test_tracing_sink_promotes_rejections() {
        assert_eq!(levels_for(true, vec![rejected()]), vec![Level::INFO]);
    }
}

