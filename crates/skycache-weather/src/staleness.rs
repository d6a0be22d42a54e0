//! Freshness policy for cached weather data.

use chrono::{DateTime, Duration, Utc};

/// Decide whether cached data needs a refresh.
///
/// Stale when no successful fetch has been recorded, or when the recorded
/// fetch is at least `threshold` old. Pure; callers inject `now`.
pub fn is_stale(last_fetch: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    match last_fetch {
        None => true,
        Some(fetched_at) => now - fetched_at >= threshold,
    }
}
