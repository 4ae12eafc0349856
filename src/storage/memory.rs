//! In-memory reference backend.
//!
//! Implements every store trait behind `parking_lot` locks. Used by the
//! test suite and by embeddings that do not need durable storage; the
//! counter map keeps an explicit version per record so the limiter's
//! compare-and-swap semantics are exercised for real.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use crate::error::StoreError;
use crate::geo::ZoneId;
use crate::storage::models::{RateLimitCounter, Trip, UserRole};
use crate::storage::{CounterStore, RoleStore, SimilarQuery, TripStore, VersionedCounter};

#[derive(Default)]
pub struct MemoryStore {
    trips: RwLock<Vec<Trip>>,
    counters: Mutex<HashMap<String, (RateLimitCounter, u64)>>,
    roles: RwLock<HashMap<String, UserRole>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trip_count(&self) -> usize {
        self.trips.read().len()
    }

    /// Seed a role directly, bypassing the admin gate. Bootstrap only.
    pub fn seed_role(&self, user_id: &str, role: UserRole) {
        self.roles.write().insert(user_id.to_string(), role);
    }

    /// Drop counter records whose retention window has passed.
    pub fn purge_expired_counters(&self, now: DateTime<Utc>) -> usize {
        let mut counters = self.counters.lock();
        let before = counters.len();
        counters.retain(|_, (counter, _)| counter.expires_at > now);
        before - counters.len()
    }
}

impl TripStore for MemoryStore {
    fn insert(&self, mut trip: Trip) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        trip.id = id.clone();
        self.trips.write().push(trip);
        Ok(id)
    }

    fn find_by_user_and_window(
        &self,
        user_id: &str,
        from_zone: &ZoneId,
        to_zone: &ZoneId,
        date: &str,
    ) -> Result<Vec<Trip>, StoreError> {
        Ok(self
            .trips
            .read()
            .iter()
            .filter(|t| {
                t.user_id == user_id
                    && t.date == date
                    && t.from_zone.as_deref() == Some(from_zone.as_str())
                    && t.to_zone.as_deref() == Some(to_zone.as_str())
            })
            .cloned()
            .collect())
    }

    fn find_recent_by_user_zones(
        &self,
        user_id: &str,
        from_zone: &ZoneId,
        to_zone: &ZoneId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Trip>, StoreError> {
        Ok(self
            .trips
            .read()
            .iter()
            .filter(|t| {
                t.user_id == user_id
                    && t.start_time >= since
                    && t.from_zone.as_deref() == Some(from_zone.as_str())
                    && t.to_zone.as_deref() == Some(to_zone.as_str())
            })
            .cloned()
            .collect())
    }

    fn find_latest_by_user(&self, user_id: &str) -> Result<Option<Trip>, StoreError> {
        Ok(self
            .trips
            .read()
            .iter()
            .filter(|t| t.user_id == user_id)
            .max_by_key(|t| t.start_time)
            .cloned())
    }

    fn find_similar(&self, query: &SimilarQuery) -> Result<Vec<Trip>, StoreError> {
        let mut matches: Vec<Trip> = self
            .trips
            .read()
            .iter()
            .filter(|t| {
                t.fare > 0.0
                    && t.from_zone.as_deref() == Some(query.from_zone.as_str())
                    && t.to_zone.as_deref() == Some(query.to_zone.as_str())
                    && t.distance_km >= query.min_distance_km
                    && t.distance_km <= query.max_distance_km
                    && query
                        .governorate
                        .as_deref()
                        .map_or(true, |g| t.governorate.as_deref() == Some(g))
            })
            .cloned()
            .collect();

        // Newest first, then cap, matching an indexed scan order.
        matches.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        matches.truncate(query.limit);
        Ok(matches)
    }
}

impl CounterStore for MemoryStore {
    fn load(&self, user_id: &str) -> Result<Option<VersionedCounter>, StoreError> {
        Ok(self
            .counters
            .lock()
            .get(user_id)
            .map(|(counter, version)| VersionedCounter {
                counter: counter.clone(),
                version: *version,
            }))
    }

    fn store(
        &self,
        user_id: &str,
        expected_version: u64,
        counter: RateLimitCounter,
    ) -> Result<bool, StoreError> {
        let mut counters = self.counters.lock();
        let current_version = counters.get(user_id).map(|(_, v)| *v).unwrap_or(0);
        if current_version != expected_version {
            return Ok(false);
        }
        counters.insert(user_id.to_string(), (counter, current_version + 1));
        Ok(true)
    }
}

impl RoleStore for MemoryStore {
    fn role_of(&self, user_id: &str) -> Result<UserRole, StoreError> {
        Ok(self
            .roles
            .read()
            .get(user_id)
            .copied()
            .unwrap_or(UserRole::User))
    }

    fn set_role(&self, actor: &str, target: &str, role: UserRole) -> Result<bool, StoreError> {
        let mut roles = self.roles.write();
        if roles.get(actor).copied() != Some(UserRole::Admin) {
            return Ok(false);
        }
        roles.insert(target.to_string(), role);
        Ok(true)
    }
}
