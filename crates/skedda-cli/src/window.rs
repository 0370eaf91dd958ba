//! Resolution of `--on`, `--from` and `--till` into a query window.

use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use skedda_api::TimeWindow;

/// Length of a window given only `--from`.
const DEFAULT_SPAN: Duration = Duration::minutes(30);

/// Booking granularity in minutes.
const BOOKING_STEP_MINUTES: u32 = 15;

/// `3:04pm` or `3pm`.
#[allow(clippy::expect_used)]
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d{1,2})(?::(\d{2}))?\s*([ap])m\s*$")
        .expect("failed to compile clock regex")
});

/// Parses `--on`: `today` (default), `tomorrow` or `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns an error if the value is none of the accepted forms.
pub fn parse_day(on: Option<&str>, today: NaiveDate) -> Result<NaiveDate> {
    let on = on.map(str::trim).unwrap_or_default().to_lowercase();
    match on.as_str() {
        "" | "today" => Ok(today),
        "tomorrow" => today.succ_opt().context("date out of range"),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").with_context(|| {
            format!("invalid date {other:?} (expected today, tomorrow or YYYY-MM-DD)")
        }),
    }
}

/// Parses a 12-hour clock time such as `3:04pm` or `3pm`.
///
/// # Errors
///
/// Returns an error if the value does not match either layout.
pub fn parse_clock(value: &str) -> Result<NaiveTime> {
    let err = || anyhow::anyhow!("no time format matched {value}");
    let caps = CLOCK_RE.captures(value).ok_or_else(err)?;

    let hour: u32 = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .filter(|h| (1..=12).contains(h))
        .ok_or_else(err)?;
    let minute: u32 = match caps.get(2) {
        Some(m) => m.as_str().parse().map_err(|_| err())?,
        None => 0,
    };
    let pm = caps
        .get(3)
        .is_some_and(|m| m.as_str().eq_ignore_ascii_case("p"));

    let hour = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(err)
}

/// Last bookable start of `day` (23:45).
fn end_of_day(day: NaiveDate) -> NaiveDateTime {
    day.and_time(NaiveTime::MIN) + Duration::days(1)
        - Duration::minutes(i64::from(BOOKING_STEP_MINUTES))
}

/// Builds the query window for `day`.
///
/// - no times: the whole day
/// - `from` only: `from` plus 30 minutes
/// - `till` only: error
///
/// A `till` that lands on the next day is pulled back to 23:45 of `day`.
///
/// # Errors
///
/// Returns an error if `till` is given without `from`, or if `from` is not
/// strictly before `till`.
pub fn resolve_window(
    day: NaiveDate,
    from: Option<NaiveTime>,
    till: Option<NaiveTime>,
) -> Result<TimeWindow> {
    let (start, mut end) = match (from, till) {
        (None, None) => {
            let start = day.and_time(NaiveTime::MIN);
            (start, start + Duration::days(1))
        }
        (Some(from), Some(till)) => (day.and_time(from), day.and_time(till)),
        (Some(from), None) => {
            let start = day.and_time(from);
            (start, start + DEFAULT_SPAN)
        }
        (None, Some(_)) => bail!("--from is required when --till is provided"),
    };

    if end.date() != start.date() {
        end = end_of_day(start.date());
    }

    if start >= end {
        bail!("--from cannot be ahead of --till");
    }

    Ok(TimeWindow::new(start, end)?)
}

/// Checks that both ends fall on a quarter hour.
///
/// # Errors
///
/// Returns an error if either end is not a multiple of 15 minutes.
pub fn ensure_bookable(window: &TimeWindow) -> Result<()> {
    let on_step = |t: NaiveDateTime| {
        t.minute() % BOOKING_STEP_MINUTES == 0 && t.second() == 0 && t.nanosecond() == 0
    };
    if !on_step(window.start) || !on_step(window.end) {
        bail!("--from and --till has to be round to 15 minutes for booking");
    }
    Ok(())
}
