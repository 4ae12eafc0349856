//! Per-user sliding-window rate limiter.
//!
//! Hour and day submission counters with an atomic check-and-increment.
//! The single concurrency-critical invariant of the system lives here:
//! under concurrent submissions from one user, the number of successes
//! within a slot never exceeds the ceiling. That requires a true
//! read-modify-write, implemented as an optimistic-retry loop over the
//! versioned [`CounterStore`].
//!
//! Admin users never reach this component; the pipeline checks the
//! resolved authorization before invoking it.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::config::RateLimitConfig;
use crate::error::StoreError;
use crate::logging::LogContext;
use crate::storage::models::RateLimitCounter;
use crate::storage::CounterStore;

const HOUR_SECS: i64 = 3600;
const DAY_SECS: i64 = 86400;

/// Retries against CAS conflicts before giving up. Conflicts only occur
/// on concurrent submissions from the same user, so contention is shallow.
const MAX_CAS_RETRIES: usize = 8;

/// Which ceiling was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScope {
    Hourly,
    Daily,
}

impl LimitScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            LimitScope::Hourly => "hourly",
            LimitScope::Daily => "daily",
        }
    }
}

/// Outcome of a check-and-increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { hour_count: u32, day_count: u32 },
    Limited(LimitScope),
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Atomically consume one submission slot for a user.
    ///
    /// Reads the counter with its version, resets any counter whose slot
    /// index has advanced past the stored one, rejects at the ceiling,
    /// otherwise increments both counters and writes back conditioned on
    /// the version still matching. A conflict means another submission
    /// won the race; re-read and retry.
    pub fn check_and_increment(
        &self,
        ctx: &LogContext,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<RateLimitDecision, StoreError> {
        let hour_slot = now.timestamp().div_euclid(HOUR_SECS);
        let day_slot = now.timestamp().div_euclid(DAY_SECS);
        let expires_at = now + Duration::hours(self.config.retention_hours);

        for attempt in 0..MAX_CAS_RETRIES {
            let loaded = self.store.load(user_id)?;
            let (mut counter, version) = match loaded {
                Some(v) => (v.counter, v.version),
                None => (
                    RateLimitCounter::fresh(user_id, hour_slot, day_slot, expires_at),
                    0,
                ),
            };

            if counter.hour_slot != hour_slot {
                counter.hour_slot = hour_slot;
                counter.hour_count = 0;
            }
            if counter.day_slot != day_slot {
                counter.day_slot = day_slot;
                counter.day_count = 0;
            }

            if counter.hour_count >= self.config.hourly_limit {
                log::info!(
                    "{} RATE_LIMITED scope=hourly count={} limit={}",
                    ctx,
                    counter.hour_count,
                    self.config.hourly_limit
                );
                return Ok(RateLimitDecision::Limited(LimitScope::Hourly));
            }
            if counter.day_count >= self.config.daily_limit {
                log::info!(
                    "{} RATE_LIMITED scope=daily count={} limit={}",
                    ctx,
                    counter.day_count,
                    self.config.daily_limit
                );
                return Ok(RateLimitDecision::Limited(LimitScope::Daily));
            }

            counter.hour_count += 1;
            counter.day_count += 1;
            counter.expires_at = expires_at;

            let hour_count = counter.hour_count;
            let day_count = counter.day_count;

            if self.store.store(user_id, version, counter)? {
                log::debug!(
                    "{} RATE_SLOT_CONSUMED hour_count={} day_count={} attempt={}",
                    ctx,
                    hour_count,
                    day_count,
                    attempt
                );
                return Ok(RateLimitDecision::Allowed {
                    hour_count,
                    day_count,
                });
            }
            // Lost the race; loop re-reads the fresh version.
        }

        Err(StoreError::Contention(MAX_CAS_RETRIES))
    }
}
