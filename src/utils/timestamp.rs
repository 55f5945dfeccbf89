//! Wall-clock timestamp utilities

use chrono::Utc;
use std::time::Duration;

/// Current time in seconds since the unix epoch
#[inline]
pub fn unix_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Unix seconds `horizon` from now
///
/// Saturates instead of overflowing for absurd horizons.
#[inline]
pub fn unix_seconds_after(horizon: Duration) -> i64 {
    let secs = i64::try_from(horizon.as_secs()).unwrap_or(i64::MAX);
    unix_seconds().saturating_add(secs)
}
