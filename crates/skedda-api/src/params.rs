//! Request parameter types.

use chrono::{NaiveDateTime, Timelike};

use super::error::{Result, SkeddaError};

/// Timestamp format used by Skedda for query parameters and payloads.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A `[start, end]` query window in naive local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Start datetime.
    pub start: NaiveDateTime,
    /// End datetime.
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns `SkeddaError::InvalidWindow` if `start` is after `end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(SkeddaError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns the window with both ends truncated to whole minutes.
    #[must_use]
    pub fn truncated_to_minute(&self) -> Self {
        Self {
            start: truncate_to_minute(self.start),
            end: truncate_to_minute(self.end),
        }
    }

    /// Formats the start as a Skedda timestamp.
    #[must_use]
    pub fn start_param(&self) -> String {
        self.start.format(DATE_TIME_FORMAT).to_string()
    }

    /// Formats the end as a Skedda timestamp.
    #[must_use]
    pub fn end_param(&self) -> String {
        self.end.format(DATE_TIME_FORMAT).to_string()
    }
}

fn truncate_to_minute(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// Parameters for creating a booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    /// Venue the spaces belong to.
    pub venue_id: u64,
    /// Spaces to book (all in `venue_id`).
    pub space_ids: Vec<u64>,
    /// Booking title.
    pub title: String,
    /// Booked window.
    pub window: TimeWindow,
}
