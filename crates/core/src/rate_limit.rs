//! In-process per-key hourly rate limiting.
//!
//! Counters are keyed by `(api_key_id, hour_bucket)` where the hour bucket
//! is `floor(unix_seconds / 3600)`. Counters reset on process restart; this
//! is acceptable for a single-node deployment and documented behaviour.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::CoreError;
use crate::types::EntityId;

/// Seconds per hour bucket.
const BUCKET_SECS: i64 = 3600;

/// Compute the hour bucket for a unix timestamp.
pub fn hour_bucket(unix_secs: i64) -> i64 {
    unix_secs.div_euclid(BUCKET_SECS)
}

/// Unix timestamp at which the current hour bucket ends.
pub fn next_hour_start(unix_secs: i64) -> i64 {
    (hour_bucket(unix_secs) + 1) * BUCKET_SECS
}

/// A granted rate-limit check, carrying everything the HTTP layer needs
/// for the `X-RateLimit-*` response headers. Denials are reported as
/// [`CoreError::RateLimited`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// The effective hourly quota for the key.
    pub limit: u32,
    /// Requests left in the current hour after this one.
    pub remaining: u32,
    /// Unix timestamp at which the quota resets (start of the next hour).
    pub reset: i64,
}

/// Shared per-key hourly counters.
///
/// Increments are atomic with respect to concurrent callers: the check and
/// the increment happen under one lock acquisition.
#[derive(Debug, Default)]
pub struct HourlyCounters {
    counts: Mutex<HashMap<(EntityId, i64), u32>>,
}

impl HourlyCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the quota for `key_id` and consume one request if allowed.
    ///
    /// Returns [`CoreError::RateLimited`] once the hour's quota is spent.
    /// Stale buckets from previous hours are pruned on the way through, so
    /// the map stays bounded by the number of active keys.
    pub fn check_and_increment(
        &self,
        key_id: EntityId,
        limit: u32,
        now_unix: i64,
    ) -> Result<RateLimitDecision, CoreError> {
        let bucket = hour_bucket(now_unix);
        let reset = next_hour_start(now_unix);

        let mut counts = self.counts.lock().expect("rate-limit mutex poisoned");
        counts.retain(|(_, b), _| *b == bucket);

        let count = counts.entry((key_id, bucket)).or_insert(0);
        if *count >= limit {
            return Err(CoreError::RateLimited { limit, reset });
        }
        *count += 1;
        Ok(RateLimitDecision {
            limit,
            remaining: limit - *count,
            reset,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
