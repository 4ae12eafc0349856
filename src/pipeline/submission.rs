//! The SubmitTrip operation.
//!
//! Orders the full validation workflow, each step short-circuiting with a
//! structured rejection:
//! 1. Require a caller identity
//! 2. Resolve authorization (admins bypass limiter and fraud checks)
//! 3. Schema validation - runs before the rate limiter so malformed
//!    payloads never consume quota; every later rejection still does
//! 4. Rate limiting (non-admin)
//! 5. Feature derivation (zones, calendar fields, speed, hashed IP)
//! 6. Fraud checks (non-admin)
//! 7. Tariff bounds, with the IQR similarity fallback for borderline
//!    fares - the fallback can only promote to accepted, never demote
//! 8. Persistence + latest-trip-end cache invalidation
//!
//! Nothing is persisted before every check passes; a store failure at the
//! final insert surfaces to the caller - a trip must never be silently
//! lost.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FieldViolation, SubmitRejection};
use crate::fraud::FraudGuard;
use crate::logging::LogContext;
use crate::pipeline::context::{Authorization, CallerIdentity, RequestContext};
use crate::security::hash_ip;
use crate::stats::circular_hour_diff;
use crate::stats::interquartile_range;
use crate::storage::models::{Trip, UserRole, ValidationStatus};
use crate::storage::SimilarQuery;
use crate::tariff::FareBounds;
use crate::validation::validate_payload;
use crate::FareEngine;

/// A candidate trip as reported by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripPayload {
    pub fare: f64,
    pub distance_km: f64,
    #[serde(default)]
    pub duration_min: Option<f64>,
    #[serde(default)]
    pub passenger_count: Option<u32>,
    #[serde(default)]
    pub from: Option<crate::geo::GeoPoint>,
    #[serde(default)]
    pub to: Option<crate::geo::GeoPoint>,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub governorate: Option<String>,
    /// Trusted-context override, honored only when the caller carries no
    /// authenticated identity.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Structured result of a submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ValidationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violations: Option<Vec<FieldViolation>>,
}

impl SubmitResponse {
    fn stored(status: ValidationStatus, trip_id: String) -> Self {
        let message = match status {
            ValidationStatus::Accepted => "trip recorded",
            ValidationStatus::BelowMinFare => {
                "fare is below the expected range; recorded for review"
            }
            ValidationStatus::AboveMaxFare => {
                "fare is above the expected range; recorded for review"
            }
        };
        Self {
            success: true,
            status: Some(status),
            trip_id: Some(trip_id),
            message: Some(message.to_string()),
            error: None,
            violations: None,
        }
    }

    fn rejected(rejection: SubmitRejection) -> Self {
        let violations = match &rejection {
            SubmitRejection::InvalidTripData(list) => Some(list.clone()),
            _ => None,
        };
        Self {
            success: false,
            status: None,
            trip_id: None,
            message: None,
            error: Some(rejection.to_string()),
            violations,
        }
    }
}

/// Run the full submission workflow.
pub fn run(engine: &FareEngine, payload: TripPayload, identity: &CallerIdentity) -> SubmitResponse {
    let now = Utc::now();

    // [1] CALLER IDENTITY - the authenticated id wins over the payload
    // override.
    let user_id = match identity.user_id.clone().or_else(|| payload.user_id.clone()) {
        Some(uid) => uid,
        None => {
            log::warn!("SUBMIT_UNAUTHENTICATED");
            return SubmitResponse::rejected(SubmitRejection::Unauthenticated);
        }
    };

    // [2] AUTHORIZATION - resolved once, threaded through every check.
    // A failed role lookup is a privilege question, not an availability
    // one: treated as non-admin, logged.
    let is_admin = match engine.roles.role_of(&user_id) {
        Ok(role) => role == UserRole::Admin,
        Err(e) => {
            log::warn!("ROLE_LOOKUP_FAILED user={} error={}", user_id, e);
            false
        }
    };
    let ctx = RequestContext::new(&user_id, Authorization { is_admin }, now);
    let log_ctx = ctx.log_context();

    log::info!(
        "{} SUBMIT_RECEIVED fare={} distance_km={} admin={}",
        log_ctx,
        payload.fare,
        payload.distance_km,
        is_admin
    );

    // [3] SCHEMA VALIDATION - before the limiter, so malformed payloads
    // do not consume quota.
    let violations = validate_payload(&payload, &engine.config.bounds);
    if !violations.is_empty() {
        log::warn!(
            "{} SCHEMA_INVALID violations={}",
            log_ctx,
            violations.len()
        );
        return SubmitResponse::rejected(SubmitRejection::InvalidTripData(violations));
    }

    // [4] RATE LIMITING - every rejection after this point still counts
    // against the quota.
    if !ctx.authorization.is_admin {
        use crate::limiter::RateLimitDecision;
        match engine.limiter.check_and_increment(&log_ctx, &user_id, now) {
            Ok(RateLimitDecision::Allowed { .. }) => {}
            Ok(RateLimitDecision::Limited(scope)) => {
                return SubmitResponse::rejected(SubmitRejection::RateLimitExceeded(format!(
                    "{} submission limit reached",
                    scope.as_str()
                )));
            }
            Err(e) => {
                log::error!("{} RATE_LIMIT_STORE_FAILED error={}", log_ctx, e);
                return SubmitResponse::rejected(SubmitRejection::Store(e));
            }
        }
    } else {
        log::debug!("{} ADMIN_BYPASS component=rate_limiter", log_ctx);
    }

    // [5] FEATURE DERIVATION
    let mut trip = build_trip(engine, &ctx, &payload, identity);

    // [6] FRAUD CHECKS
    if !ctx.authorization.is_admin {
        let guard = FraudGuard::new(
            engine.trips.as_ref(),
            &engine.config.fraud,
            &engine.end_cache,
        );
        let checks = [
            guard.duplicate_check(&log_ctx, &trip),
            guard.same_zone_check(&log_ctx, &trip),
            guard.feasibility_check(&log_ctx, &trip),
        ];
        for outcome in checks {
            if let crate::fraud::CheckOutcome::Deny(reason) = outcome {
                return SubmitResponse::rejected(SubmitRejection::DuplicateOrAbuseDetected(
                    reason,
                ));
            }
        }
    } else {
        log::debug!("{} ADMIN_BYPASS component=fraud_guard", log_ctx);
    }

    // [7] TARIFF BOUNDS + IQR FALLBACK
    let bounds = FareBounds::for_distance(&engine.config.tariff, trip.distance_km);
    let mut status = bounds.classify(trip.fare);
    if status != ValidationStatus::Accepted && fallback_accepts(engine, &log_ctx, &trip) {
        status = ValidationStatus::Accepted;
    }

    trip.official_fare = bounds.official;
    trip.min_allowed_fare = bounds.min_allowed;
    trip.max_allowed_fare = bounds.max_allowed;
    trip.validation_status = status;
    trip.suspicious = status != ValidationStatus::Accepted;

    // [8] PERSIST - a failure here surfaces; the trip must not be lost
    // silently.
    match engine.trips.insert(trip) {
        Ok(trip_id) => {
            engine.end_cache.invalidate(&user_id);
            log::info!(
                "{} TRIP_STORED trip_id={} status={}",
                log_ctx,
                trip_id,
                status.as_str()
            );
            SubmitResponse::stored(status, trip_id)
        }
        Err(e) => {
            log::error!("{} TRIP_PERSIST_FAILED error={}", log_ctx, e);
            SubmitResponse::rejected(SubmitRejection::Store(e))
        }
    }
}

/// Derive the index features and assemble the record. Verdict fields are
/// filled by the caller after the tariff step.
fn build_trip(
    engine: &FareEngine,
    ctx: &RequestContext,
    payload: &TripPayload,
    identity: &CallerIdentity,
) -> Trip {
    let from_zone = payload
        .from
        .as_ref()
        .and_then(|p| engine.zones.zone_of(p.lat, p.lng));
    let to_zone = payload
        .to
        .as_ref()
        .and_then(|p| engine.zones.zone_of(p.lat, p.lng));

    let speed_kmh = payload
        .duration_min
        .filter(|&m| m > 0.0)
        .map(|m| payload.distance_km / (m / 60.0));

    Trip {
        id: String::new(),
        fare: payload.fare,
        distance_km: payload.distance_km,
        duration_min: payload.duration_min,
        passenger_count: payload.passenger_count,
        from: payload.from.clone(),
        to: payload.to.clone(),
        start_time: payload.start_time,
        governorate: payload.governorate.clone(),
        user_id: ctx.user_id.clone(),
        submitted_at: ctx.now,
        ip_hash: identity
            .ip
            .as_deref()
            .map(|ip| hash_ip(ip, &engine.ip_salt)),
        user_agent: identity.user_agent.clone(),
        is_admin_submission: ctx.authorization.is_admin,
        suspicious: false,
        validation_status: ValidationStatus::Accepted,
        official_fare: 0.0,
        min_allowed_fare: 0.0,
        max_allowed_fare: 0.0,
        from_zone,
        to_zone,
        date: payload.start_time.format("%Y-%m-%d").to_string(),
        month: payload.start_time.month(),
        time_of_day: payload.start_time.hour(),
        day_of_week: payload.start_time.weekday().num_days_from_sunday(),
        speed_kmh,
    }
}

/// Secondary acceptance test for fares outside the tariff band.
///
/// Pulls comparable trips (same zone pair, +/- the configured relative
/// distance), narrows to the time-of-day window, excludes suspicious
/// records, and accepts the candidate if it sits inside the Tukey fences
/// of at least `min_samples` fares. A store failure just means "no
/// promotion" - the tentative verdict stands.
fn fallback_accepts(engine: &FareEngine, ctx: &LogContext, trip: &Trip) -> bool {
    let (from_zone, to_zone) = match (&trip.from_zone, &trip.to_zone) {
        (Some(f), Some(t)) => (f.clone(), t.clone()),
        _ => return false,
    };

    let fb = &engine.config.fallback;
    let query = SimilarQuery {
        from_zone,
        to_zone,
        min_distance_km: (trip.distance_km * (1.0 - fb.relative_distance)).max(0.0),
        max_distance_km: trip.distance_km * (1.0 + fb.relative_distance),
        governorate: None,
        limit: fb.sample_limit,
    };

    let similar = match engine.trips.find_similar(&query) {
        Ok(trips) => trips,
        Err(e) => {
            log::warn!("{} FALLBACK_UNAVAILABLE error={}", ctx, e);
            return false;
        }
    };

    let fares: Vec<f64> = similar
        .iter()
        .filter(|t| !t.suspicious)
        .filter(|t| circular_hour_diff(t.time_of_day, trip.time_of_day) <= fb.time_window_hours)
        .map(|t| t.fare)
        .collect();

    if fares.len() < fb.min_samples {
        log::debug!(
            "{} FALLBACK_INSUFFICIENT samples={} required={}",
            ctx,
            fares.len(),
            fb.min_samples
        );
        return false;
    }

    match interquartile_range(&fares) {
        Some(bounds) if bounds.contains(trip.fare) => {
            log::info!(
                "{} FALLBACK_PROMOTED fare={} q1={} q3={} samples={}",
                ctx,
                trip.fare,
                bounds.q1,
                bounds.q3,
                fares.len()
            );
            true
        }
        _ => false,
    }
}
