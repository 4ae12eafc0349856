//! The AnalyzeSimilarTrips operation.
//!
//! Answers "what do similar trips cost?" for a candidate route:
//! 1. Parameter validation (cheap, before any store work)
//! 2. Zone computation and a clamped distance band
//! 3. Store query: exact zone-pair equality, distance band, fare > 0,
//!    optional governorate, bounded row count
//! 4. Geographic refinement - hex equality is coarse near cell borders,
//!    so both endpoints must also sit within the configured great-circle
//!    radius of the query's endpoints
//! 5. Optional time-of-day window when the query carries a start time
//! 6. Suspicious-trip exclusion (records without the flag count as not
//!    suspicious, for older data)
//! 7. Aggregation; zero matches is a valid, all-zero answer - never an
//!    error

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisRejection, FieldViolation};
use crate::geo::{distance_km, GeoPoint};
use crate::logging::LogContext;
use crate::stats::{aggregate_trips, circular_hour_diff, AggregateStatistics};
use crate::storage::models::Trip;
use crate::storage::SimilarQuery;
use crate::validation::schema::MAX_DISTANCE_KM;
use crate::FareEngine;

/// A candidate route to compare against recorded trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisQuery {
    pub from: GeoPoint,
    pub to: GeoPoint,
    pub distance_km: f64,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub governorate: Option<String>,

    // Per-request overrides of the configured defaults.
    #[serde(default)]
    pub max_distance_diff_km: Option<f64>,
    #[serde(default)]
    pub max_time_diff_hours: Option<f64>,
    #[serde(default)]
    pub max_distance_km: Option<f64>,
}

/// Structured result of an analysis.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AggregateStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    fn ok(data: AggregateStatistics) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn rejected(rejection: AnalysisRejection) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(rejection.to_string()),
        }
    }
}

/// Run the analysis workflow. Anonymous callers are welcome; the
/// identity only enriches the log context.
pub fn run(
    engine: &FareEngine,
    query: AnalysisQuery,
    identity: &crate::pipeline::context::CallerIdentity,
) -> AnalysisResponse {
    let request_id = format!("req-{}", &uuid::Uuid::new_v4().to_string()[..8]);
    let ctx = match &identity.user_id {
        Some(uid) => LogContext::new(&request_id).with_user(uid),
        None => LogContext::new(&request_id),
    };

    // [1] PARAMETER VALIDATION
    let violations = validate_query(engine, &query);
    if !violations.is_empty() {
        log::warn!("{} ANALYZE_INVALID violations={}", ctx, violations.len());
        return AnalysisResponse::rejected(AnalysisRejection::InvalidParameters(violations));
    }

    // [2] ZONES + DISTANCE BAND
    let from_zone = engine.zones.zone_of(query.from.lat, query.from.lng);
    let to_zone = engine.zones.zone_of(query.to.lat, query.to.lng);
    let (from_zone, to_zone) = match (from_zone, to_zone) {
        (Some(f), Some(t)) => (f, t),
        // In-bounds coordinates always index; treat a miss as "no data".
        _ => {
            log::warn!("{} ANALYZE_NO_ZONE", ctx);
            return AnalysisResponse::ok(AggregateStatistics::default());
        }
    };

    let cfg = &engine.config.analysis;
    let distance_diff = query.max_distance_diff_km.unwrap_or(cfg.max_distance_diff_km);
    let time_diff_hours = query.max_time_diff_hours.unwrap_or(cfg.max_time_diff_hours);
    let geo_radius = query.max_distance_km.unwrap_or(cfg.max_distance_km);

    let store_query = SimilarQuery {
        from_zone,
        to_zone,
        min_distance_km: (query.distance_km - distance_diff).max(0.0),
        max_distance_km: query.distance_km + distance_diff,
        governorate: query.governorate.clone(),
        limit: cfg.result_limit,
    };

    // [3] STORE QUERY
    let candidates = match engine.trips.find_similar(&store_query) {
        Ok(trips) => trips,
        Err(e) => {
            log::error!("{} ANALYZE_STORE_FAILED error={}", ctx, e);
            return AnalysisResponse::rejected(AnalysisRejection::Store(e));
        }
    };
    let fetched = candidates.len();

    // [4-6] REFINEMENT
    let query_hour = query.start_time.map(|t| t.hour());
    let matches: Vec<Trip> = candidates
        .into_iter()
        .filter(|t| within_radius(t, &query, geo_radius))
        .filter(|t| match query_hour {
            Some(hour) => circular_hour_diff(t.time_of_day, hour) as f64 <= time_diff_hours,
            None => true,
        })
        .filter(|t| !t.suspicious)
        .collect();

    // [7] AGGREGATION
    let stats = aggregate_trips(&matches, cfg.recent_limit);
    log::info!(
        "{} ANALYZE_COMPLETE fetched={} matched={} avg_fare={:.2}",
        ctx,
        fetched,
        stats.similar_trips_count,
        stats.average_fare
    );
    AnalysisResponse::ok(stats)
}

fn validate_query(engine: &FareEngine, query: &AnalysisQuery) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if !query.distance_km.is_finite() || query.distance_km <= 0.0 {
        violations.push(FieldViolation::new("distance", "must be greater than 0"));
    } else if query.distance_km > MAX_DISTANCE_KM {
        violations.push(FieldViolation::new(
            "distance",
            format!("must be at most {} km", MAX_DISTANCE_KM),
        ));
    }

    let bounds = &engine.config.bounds;
    if !bounds.contains(query.from.lat, query.from.lng) {
        violations.push(FieldViolation::new(
            "from",
            "coordinates are outside the service region",
        ));
    }
    if !bounds.contains(query.to.lat, query.to.lng) {
        violations.push(FieldViolation::new(
            "to",
            "coordinates are outside the service region",
        ));
    }

    violations
}

/// Both endpoints of a recorded trip must be within the radius of the
/// query's endpoints. Trips without stored coordinates cannot be
/// verified and are dropped.
fn within_radius(trip: &Trip, query: &AnalysisQuery, radius_km: f64) -> bool {
    let (Some(from), Some(to)) = (&trip.from, &trip.to) else {
        return false;
    };
    matches!(
        (distance_km(from, &query.from), distance_km(to, &query.to)),
        (Some(df), Some(dt)) if df <= radius_km && dt <= radius_km
    )
}
