//! Per-run allocation state.

use std::collections::HashMap;

use crate::feasibility::{FeasibilityChecker, Rejection};
use crate::models::{Driver, Order};

/// Mutable state of one allocation run.
///
/// Owns each driver's committed-order list. Lists are append-only and
/// only grow through [`try_commit`](Self::try_commit), which runs the
/// feasibility check first, so every list stays feasible for the
/// lifetime of the run.
#[derive(Debug, Clone)]
pub struct AllocationContext<'a> {
    drivers: &'a [Driver],
    driver_index: HashMap<&'a str, usize>,
    committed: Vec<Vec<&'a Order>>,
    /// Order id -> index of the driver holding it.
    allocated: HashMap<&'a str, usize>,
    last_rejection: HashMap<&'a str, Rejection>,
}

impl<'a> AllocationContext<'a> {
    /// Creates an empty context over `drivers`.
    ///
    /// Driver ids are expected to be unique; with duplicates the first
    /// occurrence wins.
    pub fn new(drivers: &'a [Driver]) -> Self {
        let mut driver_index = HashMap::with_capacity(drivers.len());
        for (i, d) in drivers.iter().enumerate() {
            driver_index.entry(d.id.as_str()).or_insert(i);
        }
        Self {
            drivers,
            driver_index,
            committed: vec![Vec::new(); drivers.len()],
            allocated: HashMap::new(),
            last_rejection: HashMap::new(),
        }
    }

    /// All drivers of the run, in input order.
    pub fn drivers(&self) -> &'a [Driver] {
        self.drivers
    }

    /// Looks up a driver by id.
    pub fn driver(&self, driver_id: &str) -> Option<&'a Driver> {
        self.driver_index.get(driver_id).map(|&i| &self.drivers[i])
    }

    /// Orders committed to `driver_id`, in commit order.
    pub fn committed(&self, driver_id: &str) -> &[&'a Order] {
        match self.driver_index.get(driver_id) {
            Some(&i) => &self.committed[i],
            None => &[],
        }
    }

    /// Number of orders committed to `driver_id`.
    pub fn assigned_count(&self, driver_id: &str) -> usize {
        self.committed(driver_id).len()
    }

    /// Remaining daily capacity of `driver`.
    pub fn remaining_capacity(&self, driver: &Driver) -> usize {
        driver.remaining_capacity(self.assigned_count(&driver.id))
    }

    /// Whether `order_id` has been committed to some driver.
    pub fn is_allocated(&self, order_id: &str) -> bool {
        self.allocated.contains_key(order_id)
    }

    /// Driver holding `order_id`, if any.
    pub fn allocated_to(&self, order_id: &str) -> Option<&'a Driver> {
        self.allocated.get(order_id).map(|&i| &self.drivers[i])
    }

    /// Total orders committed so far.
    pub fn allocated_count(&self) -> usize {
        self.allocated.len()
    }

    /// Most recent feasibility rejection recorded for `order_id`.
    pub fn last_rejection(&self, order_id: &str) -> Option<&Rejection> {
        self.last_rejection.get(order_id)
    }

    /// Checks `order` against `driver`'s committed list and appends it on
    /// success. On failure the rejection is recorded and returned.
    ///
    /// A driver outside the run is rejected with
    /// [`Rejection::UnknownDriver`].
    pub fn try_commit(
        &mut self,
        checker: &FeasibilityChecker,
        order: &'a Order,
        driver: &Driver,
    ) -> Result<(), Rejection> {
        let Some(&idx) = self.driver_index.get(driver.id.as_str()) else {
            let rejection = Rejection::UnknownDriver {
                driver_id: driver.id.clone(),
            };
            self.last_rejection.insert(&order.id, rejection.clone());
            return Err(rejection);
        };
        let driver = &self.drivers[idx];

        if let Err(rejection) = checker.check(order, driver, &self.committed[idx]) {
            self.last_rejection.insert(&order.id, rejection.clone());
            return Err(rejection);
        }

        self.committed[idx].push(order);
        self.allocated.insert(&order.id, idx);
        Ok(())
    }
}
