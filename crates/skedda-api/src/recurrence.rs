//! Recurrence rule sets and the time-of-day reconciler for recurring bookings.
//!
//! Skedda returns a single canonical instance per recurring series and does
//! not filter series by the requested window. Inclusion is decided locally by
//! comparing the time of day of the canonical occurrence with the time of day
//! of the query window, independent of the date.
//!
//! Windows that cross midnight reduce to a start after the end and are then
//! rejected by the overlap test. That is a known limitation of the time-of-day
//! comparison.

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use rrule::RRuleSet;
use serde::{Deserialize, Deserializer};

use super::error::{Result, SkeddaError};
use super::overlap::time_overlaps;
use super::params::TimeWindow;
use super::types::Booking;

/// iCalendar recurrence rule set attached to a booking.
#[derive(Debug, Clone)]
pub struct RuleSet(RRuleSet);

impl RuleSet {
    /// Parses the `recurrenceRule` text returned by Skedda.
    ///
    /// `DTEND` lines are dropped (the iCalendar rule grammar has no such
    /// property), carriage returns are removed and blank lines collapsed.
    /// Blank input yields `None`.
    ///
    /// # Errors
    ///
    /// Returns `SkeddaError::Recurrence` if the remaining text is not a valid
    /// rule set.
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        let cleaned = raw
            .replace('\r', "")
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("DTEND"))
            .collect::<Vec<_>>()
            .join("\n");

        if cleaned.is_empty() {
            return Ok(None);
        }

        let set: RRuleSet = cleaned
            .parse()
            .map_err(|e: rrule::RRuleError| SkeddaError::Recurrence(e.to_string()))?;
        Ok(Some(Self(set)))
    }

    /// Returns `true` if the set carries an `RRULE` or `RDATE`.
    ///
    /// Occurrences are not expanded: a set whose only occurrence is removed
    /// by `EXDATE` still counts as recurring.
    #[must_use]
    pub fn is_recurring(&self) -> bool {
        !self.0.get_rrule().is_empty() || !self.0.get_rdate().is_empty()
    }
}

/// Deserializes `recurrenceRule` (`null`, `""` or rule text).
pub(crate) fn deserialize_rule_set<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<RuleSet>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(text) => RuleSet::parse(&text).map_err(serde::de::Error::custom),
    }
}

/// Reduces a timestamp to its time of day (whole seconds).
fn time_of_day(dt: NaiveDateTime) -> NaiveTime {
    let t = dt.time();
    t.with_nanosecond(0).unwrap_or(t)
}

/// Returns `true` if an occurrence spanning `start..end` (any date) overlaps
/// the time of day of `window`.
#[must_use]
pub fn occupies(window: &TimeWindow, start: NaiveDateTime, end: NaiveDateTime) -> bool {
    time_overlaps(
        time_of_day(window.start),
        time_of_day(window.end),
        time_of_day(start),
        time_of_day(end),
    )
}

/// Decides whether a booking returned for `window` belongs in the result.
///
/// Non-recurring bookings are already filtered upstream and are always kept.
#[must_use]
pub fn reconcile(window: &TimeWindow, booking: &Booking) -> bool {
    if !booking.is_recurring() {
        return true;
    }
    occupies(window, booking.start, booking.end)
}
