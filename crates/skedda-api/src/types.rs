//! Skedda response types.

use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::recurrence::{RuleSet, deserialize_rule_set};

/// A Skedda subdomain label (e.g. `acme` for `acme.skedda.com`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tenant(String);

impl Tenant {
    /// Creates a tenant from its subdomain label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Returns the subdomain label.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tenant {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

impl From<String> for Tenant {
    fn from(label: String) -> Self {
        Self(label)
    }
}

/// A venue (one per tenant).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Venue {
    /// Venue ID.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Tenant that owns the venue.
    #[serde(rename = "subdomain")]
    pub tenant: Tenant,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A bookable space inside a venue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Space {
    /// Space ID.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Owning venue ID.
    #[serde(rename = "venue")]
    pub venue_id: u64,
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A booking as returned by `bookingslists`.
///
/// Recurring series come back as a single canonical instance whose date is
/// arbitrary but whose time of day is representative.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking ID.
    pub id: u64,
    /// Title (hidden from anonymous sessions).
    #[serde(default)]
    pub title: Option<String>,
    /// Start of the (canonical) occurrence.
    pub start: NaiveDateTime,
    /// End of the (canonical) occurrence.
    pub end: NaiveDateTime,
    /// Recurrence rule set, if any.
    #[serde(default, deserialize_with = "deserialize_rule_set")]
    pub recurrence_rule: Option<RuleSet>,
    /// Occupied space IDs.
    #[serde(rename = "spaces", default)]
    pub space_ids: Vec<u64>,
    /// Owning venue ID.
    #[serde(rename = "venue")]
    pub venue_id: u64,
}

impl Booking {
    /// Returns `true` if the booking stands for a recurring series.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        self.recurrence_rule
            .as_ref()
            .is_some_and(RuleSet::is_recurring)
    }
}

impl fmt::Display for Booking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = self
            .title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("[Unknown]");

        if self.is_recurring() {
            write!(
                f,
                "{title} -- {} - {} (Recurring)",
                self.start.format("%I:%M%P"),
                self.end.format("%I:%M%P"),
            )
        } else {
            write!(
                f,
                "{title} -- {} - {}",
                self.start.format("%Y-%m-%d %I:%M%P"),
                self.end.format("%I:%M%P"),
            )
        }
    }
}

/// Venues and spaces gathered across tenants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    /// All venues.
    pub venues: Vec<Venue>,
    /// All spaces, each carrying its owning venue ID.
    pub spaces: Vec<Space>,
}

impl Catalog {
    /// Finds a venue by ID.
    #[must_use]
    pub fn venue(&self, id: u64) -> Option<&Venue> {
        self.venues.iter().find(|v| v.id == id)
    }

    /// Finds a space by ID.
    #[must_use]
    pub fn space(&self, id: u64) -> Option<&Space> {
        self.spaces.iter().find(|s| s.id == id)
    }

    /// Returns the spaces of one venue in catalog order.
    pub fn spaces_of(&self, venue_id: u64) -> impl Iterator<Item = &Space> {
        self.spaces.iter().filter(move |s| s.venue_id == venue_id)
    }
}

/// Display order of spaces: by owning venue, then by name.
#[must_use]
pub fn space_order(a: &Space, b: &Space) -> Ordering {
    a.venue_id
        .cmp(&b.venue_id)
        .then_with(|| a.name.cmp(&b.name))
}
