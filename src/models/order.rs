//! Order (delivery job) model.
//!
//! An order is a single catering delivery: a time window, a region,
//! a tag set that drives priority and capability requirements, and
//! optional location metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ServiceWindow, Timestamp};

/// Postal code used by upstream systems for an unresolved address.
pub const TBD_POSTAL_CODE: &str = "000000";

/// An order tag.
///
/// Known tags get their own variant; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tag {
    Vip,
    Wedding,
    Corporate,
    EarlySetup,
    Other(String),
}

impl Tag {
    /// Wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Tag::Vip => "vip",
            Tag::Wedding => "wedding",
            Tag::Corporate => "corporate",
            Tag::EarlySetup => "early_setup",
            Tag::Other(s) => s,
        }
    }
}

impl From<&str> for Tag {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "vip" => Tag::Vip,
            "wedding" => Tag::Wedding,
            "corporate" => Tag::Corporate,
            "early_setup" => Tag::EarlySetup,
            _ => Tag::Other(s.to_string()),
        }
    }
}

impl From<String> for Tag {
    fn from(s: String) -> Self {
        Tag::from(s.as_str())
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.as_str().to_string()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// A delivery order to be allocated.
///
/// # Time Representation
/// Times are same-day [`Timestamp`]s with `pickup < setup < teardown`.
/// The driver is occupied from pickup to teardown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    #[serde(rename = "order_id")]
    pub id: String,
    /// Driver collects the order.
    pub pickup_time: Timestamp,
    /// Venue setup begins.
    pub setup_time: Timestamp,
    /// Teardown completes.
    pub teardown_time: Timestamp,
    /// Delivery region (free-form).
    pub region: String,
    /// Tags such as `vip`, `wedding`, `corporate`, `early_setup`.
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Number of guests.
    #[serde(default)]
    pub pax_count: u32,
    /// Venue coordinates, if geocoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    /// Venue postal code. `"000000"` marks an unresolved address.
    #[serde(default)]
    pub postal_code: String,
    /// Venue street address.
    #[serde(default)]
    pub address: String,
}

impl Order {
    /// Creates an order with the given id, times, and region.
    pub fn new(
        id: impl Into<String>,
        pickup_time: Timestamp,
        setup_time: Timestamp,
        teardown_time: Timestamp,
        region: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            pickup_time,
            setup_time,
            teardown_time,
            region: region.into(),
            tags: Vec::new(),
            pax_count: 0,
            location: None,
            postal_code: String::new(),
            address: String::new(),
        }
    }

    /// Adds a tag (duplicates are ignored).
    pub fn with_tag(mut self, tag: impl Into<Tag>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Sets the guest count.
    pub fn with_pax(mut self, pax_count: u32) -> Self {
        self.pax_count = pax_count;
        self
    }

    /// Sets the venue coordinates.
    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(GeoPoint { lat, lng });
        self
    }

    /// Sets the postal code.
    pub fn with_postal_code(mut self, postal_code: impl Into<String>) -> Self {
        self.postal_code = postal_code.into();
        self
    }

    /// Sets the street address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Whether the order carries `tag`.
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// The pickup/setup/teardown window.
    pub fn window(&self) -> ServiceWindow {
        ServiceWindow::new(self.pickup_time, self.setup_time, self.teardown_time)
    }

    /// Whether the address is still unresolved.
    pub fn has_tbd_address(&self) -> bool {
        self.postal_code == TBD_POSTAL_CODE
    }
}
