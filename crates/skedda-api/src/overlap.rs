//! Interval overlap test used for recurring bookings.

/// Returns `true` if `t1` overlaps or is overlapped by `t2`.
///
/// Decision table, evaluated in order:
///
/// 1. either interval has its start after its end: `false`
/// 2. either endpoint of `t2` lies strictly inside `t1`: `true`
/// 3. either endpoint of `t1` lies strictly inside `t2`: `true`
/// 4. both intervals are equal: `true`
///
/// Intervals that only share an endpoint (`[06:00, 08:00]` against
/// `[08:00, 12:00]`) do not overlap.
#[must_use]
pub fn time_overlaps<T: Ord>(t1_start: T, t1_end: T, t2_start: T, t2_end: T) -> bool {
    if t1_start > t1_end || t2_start > t2_end {
        return false;
    }

    // t2 starts or ends inside t1
    if (t2_start > t1_start && t2_start < t1_end) || (t2_end > t1_start && t2_end < t1_end) {
        return true;
    }

    // t2 wraps an endpoint of t1
    if (t2_start < t1_start && t2_end > t1_start) || (t2_start < t1_end && t2_end > t1_end) {
        return true;
    }

    t2_start == t1_start && t2_end == t1_end
}
