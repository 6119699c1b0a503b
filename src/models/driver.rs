//! Driver model.
//!
//! Drivers are the workers orders are allocated to. Each has a
//! preferred region, a capability set gating specially tagged orders,
//! and a daily order capacity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named skill or certification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Capability {
    Wedding,
    Vip,
    Corporate,
    Seminars,
    Other(String),
}

impl Capability {
    /// Wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Capability::Wedding => "wedding",
            Capability::Vip => "vip",
            Capability::Corporate => "corporate",
            Capability::Seminars => "seminars",
            Capability::Other(s) => s,
        }
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "wedding" => Capability::Wedding,
            "vip" => Capability::Vip,
            "corporate" => Capability::Corporate,
            "seminars" => Capability::Seminars,
            _ => Capability::Other(s.to_string()),
        }
    }
}

impl From<String> for Capability {
    fn from(s: String) -> Self {
        Capability::from(s.as_str())
    }
}

impl From<Capability> for String {
    fn from(cap: Capability) -> Self {
        cap.as_str().to_string()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivery driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    /// Unique driver identifier.
    #[serde(rename = "driver_id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Region the driver prefers to work in.
    pub preferred_region: String,
    /// Skills gating specially tagged orders.
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// Maximum orders the driver can take in one day.
    pub max_orders_per_day: u32,
}

impl Driver {
    /// Creates a driver with no capabilities, named after its id.
    pub fn new(
        id: impl Into<String>,
        preferred_region: impl Into<String>,
        max_orders_per_day: u32,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            preferred_region: preferred_region.into(),
            capabilities: Vec::new(),
            max_orders_per_day,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a capability (duplicates are ignored).
    pub fn with_capability(mut self, capability: impl Into<Capability>) -> Self {
        let capability = capability.into();
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    /// Whether the driver has `capability`.
    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Daily capacity as a count.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_orders_per_day as usize
    }

    /// Orders still available given `assigned` already committed.
    pub fn remaining_capacity(&self, assigned: usize) -> usize {
        self.capacity().saturating_sub(assigned)
    }
}
