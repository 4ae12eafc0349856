//! farecheck-core - Trip submission validation and fare similarity engine
//!
//! This crate is the server-side core of a crowdsourced taxi-fare system:
//! it decides, for every submitted trip, whether the reported fare is
//! plausible, defends against abuse, and answers "what do similar trips
//! cost?". The implementation prioritizes:
//!
//! 1. **Abuse resistance** - atomic rate limiting, duplicate detection
//! 2. **Logging** - every decision point logged with request context
//! 3. **Availability** - fraud checks fail open; persistence never fails
//!    silently
//!
//! ## Architecture
//!
//! The crate is organized into modules:
//! - `pipeline` - the SubmitTrip / AnalyzeSimilarTrips orchestrators
//! - `validation` - payload field validation (all violations at once)
//! - `limiter` - per-user sliding-window rate limiting (atomic CAS)
//! - `fraud` - duplicate / same-zone / feasibility checks (fail open)
//! - `tariff` - official fare bounds
//! - `stats` - IQR fallback fences and grouped fare aggregation
//! - `geo` - hex-zone indexing and great-circle distance
//! - `storage` - store traits, models, memory backend, end-time cache
//! - `security` - salted IP hashing
//! - `logging` - structured logging with request context

use std::sync::Arc;
use std::time::Duration;

pub mod config;
pub mod error;
pub mod fraud;
pub mod geo;
pub mod limiter;
pub mod logging;
pub mod pipeline;
pub mod security;
pub mod stats;
pub mod storage;
pub mod tariff;
pub mod validation;

use config::EngineConfig;
use geo::ZoneIndexer;
use limiter::RateLimiter;
use pipeline::{AnalysisQuery, AnalysisResponse, CallerIdentity, SubmitResponse, TripPayload};
use storage::{CounterStore, EndTimeCache, MemoryStore, RoleStore, TripStore};

/// Initialize the crate-level logger. Safe to call more than once.
pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_millis()
        .try_init();
}

/// The engine behind the two operations.
///
/// Each invocation is an independent, request-scoped execution; the only
/// state shared between requests lives behind the store traits and the
/// end-time cache.
pub struct FareEngine {
    pub(crate) config: EngineConfig,
    pub(crate) zones: ZoneIndexer,
    pub(crate) trips: Arc<dyn TripStore>,
    pub(crate) limiter: RateLimiter,
    pub(crate) roles: Arc<dyn RoleStore>,
    pub(crate) end_cache: EndTimeCache,
    pub(crate) ip_salt: String,
}

impl FareEngine {
    /// Wire an engine from its collaborators. `ip_salt` comes from the
    /// host environment and must be stable across deployments for hash
    /// correlation to work.
    pub fn new(
        config: EngineConfig,
        trips: Arc<dyn TripStore>,
        counters: Arc<dyn CounterStore>,
        roles: Arc<dyn RoleStore>,
        ip_salt: impl Into<String>,
    ) -> Self {
        let zones = ZoneIndexer::new(config.zone.resolution, config.bounds.clone());
        let limiter = RateLimiter::new(counters, config.rate_limit.clone());
        let end_cache = EndTimeCache::new(Duration::from_secs(config.fraud.end_cache_ttl_secs));
        Self {
            config,
            zones,
            trips,
            limiter,
            roles,
            end_cache,
            ip_salt: ip_salt.into(),
        }
    }

    /// Engine backed entirely by one in-memory store. The store handle is
    /// returned as well so tests and embeddings can seed roles or inspect
    /// trips directly.
    pub fn in_memory(config: EngineConfig) -> (Self, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = Self::new(
            config,
            Arc::clone(&store) as Arc<dyn TripStore>,
            Arc::clone(&store) as Arc<dyn CounterStore>,
            Arc::clone(&store) as Arc<dyn RoleStore>,
            "memory-salt",
        );
        (engine, store)
    }

    /// Validate and persist a submitted trip. See
    /// [`pipeline::submission`] for the step ordering.
    pub fn submit_trip(&self, payload: TripPayload, identity: &CallerIdentity) -> SubmitResponse {
        pipeline::submission::run(self, payload, identity)
    }

    /// Aggregate statistics over trips similar to a candidate route. See
    /// [`pipeline::analysis`].
    pub fn analyze_similar_trips(
        &self,
        query: AnalysisQuery,
        identity: &CallerIdentity,
    ) -> AnalysisResponse {
        pipeline::analysis::run(self, query, identity)
    }
}
