//! Persistence seams.
//!
//! No component other than this module's traits talks to the underlying
//! database. The query shapes below are the complete set the core needs:
//! - `TripStore` - trip persistence and the zone/time/distance queries
//! - `CounterStore` - versioned rate-limit counters (CAS semantics)
//! - `RoleStore` - user role lookup and admin-gated mutation
//!
//! `MemoryStore` is the reference backend used by tests and embeddings;
//! production backends implement the same traits against a real database.

pub mod cache;
pub mod memory;
pub mod models;

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::geo::ZoneId;

pub use cache::EndTimeCache;
pub use memory::MemoryStore;
pub use models::{RateLimitCounter, Trip, UserRole, ValidationStatus};

/// Parameters for the similarity query shared by the IQR fallback and the
/// analysis operation. Zone comparison is exact equality; only trips with
/// `fare > 0` qualify.
#[derive(Debug, Clone)]
pub struct SimilarQuery {
    pub from_zone: ZoneId,
    pub to_zone: ZoneId,
    pub min_distance_km: f64,
    pub max_distance_km: f64,
    pub governorate: Option<String>,
    /// Hard cap on returned rows, bounding aggregation latency.
    pub limit: usize,
}

/// Trip persistence and the equality/range queries the core requires.
pub trait TripStore: Send + Sync {
    /// Persist a trip, assigning and returning its id.
    fn insert(&self, trip: Trip) -> Result<String, StoreError>;

    /// Trips by a user on one calendar date with an exact zone pair.
    fn find_by_user_and_window(
        &self,
        user_id: &str,
        from_zone: &ZoneId,
        to_zone: &ZoneId,
        date: &str,
    ) -> Result<Vec<Trip>, StoreError>;

    /// Trips by a user with an exact zone pair starting at or after
    /// `since`.
    fn find_recent_by_user_zones(
        &self,
        user_id: &str,
        from_zone: &ZoneId,
        to_zone: &ZoneId,
        since: DateTime<Utc>,
    ) -> Result<Vec<Trip>, StoreError>;

    /// The user's most recent trip by start time, if any.
    fn find_latest_by_user(&self, user_id: &str) -> Result<Option<Trip>, StoreError>;

    /// Zone-pair similarity query; see [`SimilarQuery`].
    fn find_similar(&self, query: &SimilarQuery) -> Result<Vec<Trip>, StoreError>;
}

/// A counter read together with the version token needed to write it back.
#[derive(Debug, Clone)]
pub struct VersionedCounter {
    pub counter: RateLimitCounter,
    pub version: u64,
}

/// Versioned storage for rate-limit counters.
///
/// The limiter's atomicity rests on these two methods: `load` returns the
/// current version, `store` writes only if the version still matches.
pub trait CounterStore: Send + Sync {
    fn load(&self, user_id: &str) -> Result<Option<VersionedCounter>, StoreError>;

    /// Compare-and-swap write. `expected_version` 0 means "create, the
    /// record must not exist yet". Returns `false` on a version conflict,
    /// in which case the caller re-reads and retries.
    fn store(
        &self,
        user_id: &str,
        expected_version: u64,
        counter: RateLimitCounter,
    ) -> Result<bool, StoreError>;
}

/// User role lookup and mutation.
pub trait RoleStore: Send + Sync {
    /// Role for a user; unknown users are plain users.
    fn role_of(&self, user_id: &str) -> Result<UserRole, StoreError>;

    /// Assign a role. Only an existing admin may mutate roles; returns
    /// `false` (and changes nothing) when `actor` is not one.
    fn set_role(&self, actor: &str, target: &str, role: UserRole) -> Result<bool, StoreError>;
}
