//! Timestamp utilities

use chrono::{DateTime, Duration, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// True when strictly more than `threshold` has passed between `since` and `now`
///
/// A clock that moved backwards yields a negative gap and is never stale.
pub fn is_stale(since: DateTime<Utc>, now: DateTime<Utc>, threshold: Duration) -> bool {
    now.signed_duration_since(since) > threshold
}
