//! Merging stage results into final assignments.

use std::collections::HashMap;

use crate::feasibility::{compatible_drivers, Requirement};
use crate::models::{Assignment, Driver, Order, UnallocatedOrder, UnallocationReason};

use super::{AllocationContext, StageOutcome};

/// Merges per-stage partial lists into one [`Assignment`] per driver.
///
/// Order lists are concatenated in commit order and the last non-empty
/// reasoning wins. The result is sorted by descending utilization; ties
/// keep the order in which drivers first received work.
pub fn merge_outcomes(outcomes: &[StageOutcome<'_>]) -> Vec<Assignment> {
    let mut merged: Vec<(&Driver, Vec<Order>, String)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for partial in outcomes.iter().flat_map(|o| o.partials.iter()) {
        let idx = *index.entry(partial.driver.id.as_str()).or_insert_with(|| {
            merged.push((partial.driver, Vec::new(), String::new()));
            merged.len() - 1
        });
        let entry = &mut merged[idx];
        entry.1.extend(partial.orders.iter().map(|&o| o.clone()));
        if !partial.reasoning.is_empty() {
            entry.2 = partial.reasoning.clone();
        }
    }

    let mut assignments: Vec<Assignment> = merged
        .into_iter()
        .filter(|(_, orders, _)| !orders.is_empty())
        .map(|(driver, orders, reasoning)| Assignment::new(driver.clone(), orders, reasoning))
        .collect();
    // sort_by is stable.
    assignments.sort_by(|a, b| b.utilization.total_cmp(&a.utilization));
    assignments
}

/// Derives why `order` stayed unallocated, from final driver loads.
pub fn unallocation_reason(
    order: &Order,
    drivers: &[Driver],
    assigned: &HashMap<&str, usize>,
) -> UnallocationReason {
    let has_room = |d: &Driver| {
        let count = assigned.get(d.id.as_str()).copied().unwrap_or(0);
        d.remaining_capacity(count) > 0
    };

    let gated = Requirement::for_order(order)
        .any(|r| matches!(r, Requirement::Wedding | Requirement::Vip));
    if gated {
        let capable = compatible_drivers(order, drivers);
        if capable.is_empty() {
            return UnallocationReason::NoCapableDrivers;
        }
        if !capable.iter().any(|&d| has_room(d)) {
            return UnallocationReason::CapableDriversAtCapacity;
        }
    }

    if !drivers.iter().any(has_room) {
        return UnallocationReason::AllDriversAtCapacity;
    }
    UnallocationReason::ConflictsOrRegion
}

/// Lists every order absent from `assignments`, in input order, with
/// its derived reason and last feasibility rejection.
pub fn collect_unallocated(
    orders: &[Order],
    drivers: &[Driver],
    assignments: &[Assignment],
    context: &AllocationContext<'_>,
) -> Vec<UnallocatedOrder> {
    let assigned: HashMap<&str, usize> = assignments
        .iter()
        .map(|a| (a.driver.id.as_str(), a.order_count()))
        .collect();

    orders
        .iter()
        .filter(|o| !assignments.iter().any(|a| a.contains(&o.id)))
        .map(|order| {
            let reason = unallocation_reason(order, drivers, &assigned);
            let unallocated = UnallocatedOrder::new(order.clone(), reason);
            match context.last_rejection(&order.id) {
                Some(rejection) => unallocated.with_last_rejection(rejection.to_string()),
                None => unallocated,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{PartialAssignment, Stage};
    use crate::models::Timestamp;

    fn ts(t: &str) -> Timestamp {
        format!("2024-06-01T{t}:00").parse().unwrap()
    }

    fn order(id: &str, tags: &[&str]) -> Order {
        tags.iter().fold(
            Order::new(id, ts("09:00"), ts("09:30"), ts("10:00"), "East"),
            |o, t| o.with_tag(*t),
        )
    }

    #[test]
    fn test_merge_concatenates_and_sorts() {
        let d1 = Driver::new("D1", "East", 4);
        let d2 = Driver::new("D2", "East", 2);
        let orders = vec![order("A", &[]), order("B", &[]), order("C", &[]), order("E", &[])];
        let outcomes = vec![
            StageOutcome {
                stage: Stage::Wedding,
                partials: vec![PartialAssignment {
                    driver: &d1,
                    orders: vec![&orders[0]],
                    reasoning: "first".into(),
                }],
                proposer_error: None,
            },
            StageOutcome {
                stage: Stage::Regular,
                partials: vec![
                    PartialAssignment {
                        driver: &d2,
                        orders: vec![&orders[1], &orders[2]],
                        reasoning: "".into(),
                    },
                    PartialAssignment {
                        driver: &d1,
                        orders: vec![&orders[3]],
                        reasoning: "".into(),
                    },
                ],
                proposer_error: None,
            },
        ];
        let merged = merge_outcomes(&outcomes);
        assert_eq!(merged.len(), 2);
        // D2: 2/2 = 100%, D1: 2/4 = 50%
        assert_eq!(merged[0].driver.id, "D2");
        assert!((merged[0].utilization - 100.0).abs() < 1e-10);
        let d1_ids: Vec<&str> = merged[1].orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(d1_ids, vec!["A", "E"]);
        assert_eq!(merged[1].reasoning, "first");
    }

    #[test]
    fn test_merge_ties_keep_first_seen() {
        let d1 = Driver::new("D1", "East", 2);
        let d2 = Driver::new("D2", "East", 2);
        let orders = vec![order("A", &[]), order("B", &[])];
        let outcomes = vec![StageOutcome {
            stage: Stage::Regular,
            partials: vec![
                PartialAssignment {
                    driver: &d2,
                    orders: vec![&orders[0]],
                    reasoning: String::new(),
                },
                PartialAssignment {
                    driver: &d1,
                    orders: vec![&orders[1]],
                    reasoning: String::new(),
                },
            ],
            proposer_error: None,
        }];
        let merged = merge_outcomes(&outcomes);
        assert_eq!(merged[0].driver.id, "D2");
        assert_eq!(merged[1].driver.id, "D1");
    }

    #[test]
    fn test_reasons() {
        let general = Driver::new("G", "East", 1);
        let wedding = Driver::new("W", "East", 1).with_capability("wedding");
        let w_order = order("Q1", &["wedding"]);
        let plain = order("Q2", &[]);

        let none: HashMap<&str, usize> = HashMap::new();
        assert_eq!(
            unallocation_reason(&w_order, &[general.clone()], &none),
            UnallocationReason::NoCapableDrivers
        );

        let drivers = vec![general.clone(), wedding.clone()];
        let wedding_full: HashMap<&str, usize> = [("W", 1)].into_iter().collect();
        assert_eq!(
            unallocation_reason(&w_order, &drivers, &wedding_full),
            UnallocationReason::CapableDriversAtCapacity
        );
        assert_eq!(
            unallocation_reason(&plain, &drivers, &wedding_full),
            UnallocationReason::ConflictsOrRegion
        );

        let all_full: HashMap<&str, usize> = [("W", 1), ("G", 1)].into_iter().collect();
        assert_eq!(
            unallocation_reason(&plain, &drivers, &all_full),
            UnallocationReason::AllDriversAtCapacity
        );
        assert_eq!(
            unallocation_reason(&w_order, &drivers, &none),
            UnallocationReason::ConflictsOrRegion
        );
    }

    #[test]
    fn test_corporate_only_order_skips_capability_branch() {
        // corporate requirement alone does not use the capable-driver reasons
        let drivers = vec![Driver::new("G", "East", 1)];
        let corp = order("Q1", &["corporate"]);
        let none: HashMap<&str, usize> = HashMap::new();
        assert_eq!(
            unallocation_reason(&corp, &drivers, &none),
            UnallocationReason::ConflictsOrRegion
        );
    }

    #[test]
    fn test_capable_means_every_requirement() {
        // A vip-only driver does not count as capable for a vip wedding.
        let vip_only = Driver::new("V", "East", 2).with_capability("vip");
        let both = Driver::new("B", "East", 1)
            .with_capability("vip")
            .with_capability("wedding");
        let vip_wedding = order("Q1", &["vip", "wedding"]);
        let none: HashMap<&str, usize> = HashMap::new();

        assert_eq!(
            unallocation_reason(&vip_wedding, &[vip_only.clone()], &none),
            UnallocationReason::NoCapableDrivers
        );

        let both_full: HashMap<&str, usize> = [("B", 1)].into_iter().collect();
        assert_eq!(
            unallocation_reason(&vip_wedding, &[vip_only, both], &both_full),
            UnallocationReason::CapableDriversAtCapacity
        );
    }

    #[test]
    fn test_collect_unallocated_carries_last_rejection() {
        let drivers = vec![Driver::new("D1", "East", 1)];
        let orders = vec![order("A", &[]), order("B", &[])];
        let mut ctx = AllocationContext::new(&drivers);
        let checker = crate::feasibility::FeasibilityChecker::default();
        ctx.try_commit(&checker, &orders[0], &drivers[0]).unwrap();
        let _ = ctx.try_commit(&checker, &orders[1], &drivers[0]);

        let assignments = vec![Assignment::new(drivers[0].clone(), vec![orders[0].clone()], "")];
        let unallocated = collect_unallocated(&orders, &drivers, &assignments, &ctx);
        assert_eq!(unallocated.len(), 1);
        assert_eq!(unallocated[0].order.id, "B");
        assert_eq!(unallocated[0].reason, UnallocationReason::AllDriversAtCapacity);
        assert_eq!(unallocated[0].last_rejection.as_deref(), Some("at capacity (1/1)"));
    }
}
