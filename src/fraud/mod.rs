//! Duplicate and abuse detection.
//!
//! Three independent checks, each answering Allow/Deny with a
//! human-readable reason:
//! 1. Duplicate detection - same zone pair and date, start times within
//!    a fixed window
//! 2. Same-zone round-trip throttling - repeated from == to submissions
//! 3. Time feasibility - a trip cannot start before the user's previous
//!    trip ended (config-gated, off by default)
//!
//! Contract: a store failure inside any check maps to `Allow` at the
//! boundary and is logged. Abuse prevention trades correctness for
//! availability here; the mapping is the documented interface, not an
//! accident. Admin submissions skip all three (decided by the caller).

use chrono::Duration;

use crate::config::FraudConfig;
use crate::error::StoreError;
use crate::logging::LogContext;
use crate::storage::models::Trip;
use crate::storage::{EndTimeCache, TripStore};

/// Verdict of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Allow,
    Deny(String),
}

impl CheckOutcome {
    pub fn is_deny(&self) -> bool {
        matches!(self, CheckOutcome::Deny(_))
    }
}

pub struct FraudGuard<'a> {
    store: &'a dyn TripStore,
    config: &'a FraudConfig,
    end_cache: &'a EndTimeCache,
}

impl<'a> FraudGuard<'a> {
    pub fn new(
        store: &'a dyn TripStore,
        config: &'a FraudConfig,
        end_cache: &'a EndTimeCache,
    ) -> Self {
        Self {
            store,
            config,
            end_cache,
        }
    }

    /// Deny when the user already reported a trip on this zone pair and
    /// date with a start time inside the duplicate window.
    pub fn duplicate_check(&self, ctx: &LogContext, candidate: &Trip) -> CheckOutcome {
        self.fail_open(ctx, "duplicate", self.duplicate_inner(ctx, candidate))
    }

    fn duplicate_inner(
        &self,
        ctx: &LogContext,
        candidate: &Trip,
    ) -> Result<CheckOutcome, StoreError> {
        let (from_zone, to_zone) = match (&candidate.from_zone, &candidate.to_zone) {
            (Some(f), Some(t)) => (f, t),
            // Zoneless trips cannot collide on a zone-pair index.
            _ => return Ok(CheckOutcome::Allow),
        };

        let existing = self.store.find_by_user_and_window(
            &candidate.user_id,
            from_zone,
            to_zone,
            &candidate.date,
        )?;

        let window = Duration::minutes(self.config.duplicate_window_min);
        for trip in &existing {
            let gap = (candidate.start_time - trip.start_time).abs();
            if gap <= window {
                log::info!(
                    "{} DUPLICATE_TRIP existing_id={} gap_min={}",
                    ctx,
                    trip.id,
                    gap.num_minutes()
                );
                return Ok(CheckOutcome::Deny(
                    "duplicate trip: an identical route was already reported minutes ago"
                        .to_string(),
                ));
            }
        }
        Ok(CheckOutcome::Allow)
    }

    /// Deny a same-zone round trip when the user already reported one for
    /// this zone inside the throttle window.
    pub fn same_zone_check(&self, ctx: &LogContext, candidate: &Trip) -> CheckOutcome {
        self.fail_open(ctx, "same_zone", self.same_zone_inner(ctx, candidate))
    }

    fn same_zone_inner(
        &self,
        ctx: &LogContext,
        candidate: &Trip,
    ) -> Result<CheckOutcome, StoreError> {
        let (from_zone, to_zone) = match (&candidate.from_zone, &candidate.to_zone) {
            (Some(f), Some(t)) if f == t => (f, t),
            // Only applies when the rider returned to the same area.
            _ => return Ok(CheckOutcome::Allow),
        };

        let since = candidate.start_time - Duration::minutes(self.config.same_zone_window_min);
        let recent =
            self.store
                .find_recent_by_user_zones(&candidate.user_id, from_zone, to_zone, since)?;

        if recent.is_empty() {
            Ok(CheckOutcome::Allow)
        } else {
            log::info!(
                "{} SAME_ZONE_THROTTLED zone={} recent={}",
                ctx,
                from_zone,
                recent.len()
            );
            Ok(CheckOutcome::Deny(
                "too many trips within the same area in a short period".to_string(),
            ))
        }
    }

    /// Deny a trip that starts before the user's previous trip ended.
    ///
    /// Disabled unless `feasibility_check_enabled` is set; returns
    /// `Allow` without touching the store when off.
    pub fn feasibility_check(&self, ctx: &LogContext, candidate: &Trip) -> CheckOutcome {
        if !self.config.feasibility_check_enabled {
            return CheckOutcome::Allow;
        }
        self.fail_open(ctx, "feasibility", self.feasibility_inner(ctx, candidate))
    }

    fn feasibility_inner(
        &self,
        ctx: &LogContext,
        candidate: &Trip,
    ) -> Result<CheckOutcome, StoreError> {
        let latest_end = match self.end_cache.get(&candidate.user_id) {
            Some(cached) => {
                log::debug!(
                    "{} END_CACHE_HIT age_secs={:?}",
                    ctx,
                    self.end_cache.age_secs(&candidate.user_id)
                );
                cached
            }
            None => {
                let end = self
                    .store
                    .find_latest_by_user(&candidate.user_id)?
                    .map(|t| t.end_time());
                self.end_cache.put(&candidate.user_id, end);
                end
            }
        };

        match latest_end {
            Some(end) if candidate.start_time < end => {
                log::info!(
                    "{} INFEASIBLE_TRIP start={} previous_end={}",
                    ctx,
                    candidate.start_time,
                    end
                );
                Ok(CheckOutcome::Deny(
                    "trip starts before your previous trip ended".to_string(),
                ))
            }
            _ => Ok(CheckOutcome::Allow),
        }
    }

    /// The fail-open boundary: store errors become Allow, logged.
    fn fail_open(
        &self,
        ctx: &LogContext,
        check: &str,
        result: Result<CheckOutcome, StoreError>,
    ) -> CheckOutcome {
        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("{} FRAUD_CHECK_FAILED_OPEN check={} error={}", ctx, check, e);
                CheckOutcome::Allow
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::ZoneId;
    use crate::storage::models::test_trip;
    use crate::storage::{MemoryStore, SimilarQuery};
    use chrono::{DateTime, TimeZone, Utc};
    use std::time::Duration as StdDuration;

    fn at(hour: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, min, 0).unwrap()
    }

    fn zoned_trip(hour: u32, min: u32, from: &str, to: &str) -> Trip {
        let mut t = test_trip(at(hour, min));
        t.from_zone = Some(from.to_string());
        t.to_zone = Some(to.to_string());
        t
    }

    fn ctx() -> LogContext {
        LogContext::new("req-test")
    }

    struct Fixture {
        store: MemoryStore,
        config: FraudConfig,
        cache: EndTimeCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryStore::new(),
                config: FraudConfig::default(),
                cache: EndTimeCache::new(StdDuration::from_secs(60)),
            }
        }

        fn guard(&self) -> FraudGuard<'_> {
            FraudGuard::new(&self.store, &self.config, &self.cache)
        }
    }

    #[test]
    fn test_duplicate_within_window_denied() {
        let fx = Fixture::new();
        fx.store.insert(zoned_trip(9, 0, "a", "b")).unwrap();

        let candidate = zoned_trip(9, 20, "a", "b");
        assert!(fx.guard().duplicate_check(&ctx(), &candidate).is_deny());
    }

    #[test]
    fn test_duplicate_outside_window_allowed() {
        let fx = Fixture::new();
        fx.store.insert(zoned_trip(9, 0, "a", "b")).unwrap();

        // 31 minutes apart.
        let candidate = zoned_trip(9, 31, "a", "b");
        assert_eq!(
            fx.guard().duplicate_check(&ctx(), &candidate),
            CheckOutcome::Allow
        );
    }

    #[test]
    fn test_duplicate_different_zone_pair_allowed() {
        let fx = Fixture::new();
        fx.store.insert(zoned_trip(9, 0, "a", "b")).unwrap();

        let candidate = zoned_trip(9, 10, "a", "c");
        assert_eq!(
            fx.guard().duplicate_check(&ctx(), &candidate),
            CheckOutcome::Allow
        );
    }

    #[test]
    fn test_same_zone_throttle() {
        let fx = Fixture::new();
        fx.store.insert(zoned_trip(9, 0, "a", "a")).unwrap();

        let candidate = zoned_trip(9, 15, "a", "a");
        assert!(fx.guard().same_zone_check(&ctx(), &candidate).is_deny());

        // Distinct zones are out of scope for this check.
        let cross = zoned_trip(9, 15, "a", "b");
        assert_eq!(
            fx.guard().same_zone_check(&ctx(), &cross),
            CheckOutcome::Allow
        );
    }

    #[test]
    fn test_feasibility_disabled_by_default() {
        let fx = Fixture::new();
        let mut previous = test_trip(at(9, 0));
        previous.duration_min = Some(60.0);
        fx.store.insert(previous).unwrap();

        // Starts mid-ride, but the check is off.
        let candidate = test_trip(at(9, 30));
        assert_eq!(
            fx.guard().feasibility_check(&ctx(), &candidate),
            CheckOutcome::Allow
        );
    }

    #[test]
    fn test_feasibility_enabled_denies_overlap() {
        let mut fx = Fixture::new();
        fx.config.feasibility_check_enabled = true;

        let mut previous = test_trip(at(9, 0));
        previous.duration_min = Some(60.0);
        fx.store.insert(previous).unwrap();

        let candidate = test_trip(at(9, 30));
        assert!(fx.guard().feasibility_check(&ctx(), &candidate).is_deny());

        let later = test_trip(at(10, 30));
        assert_eq!(
            fx.guard().feasibility_check(&ctx(), &later),
            CheckOutcome::Allow
        );
    }

    #[test]
    fn test_feasibility_uses_cache() {
        let mut fx = Fixture::new();
        fx.config.feasibility_check_enabled = true;

        // Cache says the last trip ends at 10:00; the store is empty, so
        // a hit proves the cache was consulted.
        fx.cache.put("user-1", Some(at(10, 0)));
        let candidate = test_trip(at(9, 30));
        assert!(fx.guard().feasibility_check(&ctx(), &candidate).is_deny());
    }

    /// Store that fails every read, for the fail-open contract.
    struct BrokenStore;

    impl TripStore for BrokenStore {
        fn insert(&self, _trip: Trip) -> Result<String, StoreError> {
            Err(StoreError::unavailable("down"))
        }
        fn find_by_user_and_window(
            &self,
            _user_id: &str,
            _from_zone: &ZoneId,
            _to_zone: &ZoneId,
            _date: &str,
        ) -> Result<Vec<Trip>, StoreError> {
            Err(StoreError::unavailable("down"))
        }
        fn find_recent_by_user_zones(
            &self,
            _user_id: &str,
            _from_zone: &ZoneId,
            _to_zone: &ZoneId,
            _since: DateTime<Utc>,
        ) -> Result<Vec<Trip>, StoreError> {
            Err(StoreError::unavailable("down"))
        }
        fn find_latest_by_user(&self, _user_id: &str) -> Result<Option<Trip>, StoreError> {
            Err(StoreError::unavailable("down"))
        }
        fn find_similar(&self, _query: &SimilarQuery) -> Result<Vec<Trip>, StoreError> {
            Err(StoreError::unavailable("down"))
        }
    }

    #[test]
    fn test_store_failure_fails_open() {
        let store = BrokenStore;
        let config = FraudConfig {
            feasibility_check_enabled: true,
            ..FraudConfig::default()
        };
        let cache = EndTimeCache::new(StdDuration::from_secs(60));
        let guard = FraudGuard::new(&store, &config, &cache);

        let candidate = zoned_trip(9, 0, "a", "a");
        assert_eq!(guard.duplicate_check(&ctx(), &candidate), CheckOutcome::Allow);
        assert_eq!(guard.same_zone_check(&ctx(), &candidate), CheckOutcome::Allow);
        assert_eq!(
            guard.feasibility_check(&ctx(), &candidate),
            CheckOutcome::Allow
        );
    }
}
