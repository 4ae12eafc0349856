//! Field-level validation of the trip payload.
//!
//! Every violated field is reported, not just the first - failing fast
//! would force the client into a fix-one-resubmit loop.

use crate::error::FieldViolation;
use crate::geo::{GeoBounds, GeoPoint};
use crate::pipeline::submission::TripPayload;

pub const MAX_DISTANCE_KM: f64 = 100.0;
pub const MAX_DURATION_MIN: f64 = 300.0;
pub const MIN_PASSENGERS: u32 = 1;
pub const MAX_PASSENGERS: u32 = 10;

/// Validate a payload against the schema ranges. Empty result = valid.
pub fn validate_payload(payload: &TripPayload, bounds: &GeoBounds) -> Vec<FieldViolation> {
    let mut violations = Vec::new();

    if !payload.fare.is_finite() || payload.fare <= 0.0 {
        violations.push(FieldViolation::new("fare", "must be greater than 0"));
    }

    if !payload.distance_km.is_finite() || payload.distance_km <= 0.0 {
        violations.push(FieldViolation::new("distance", "must be greater than 0"));
    } else if payload.distance_km > MAX_DISTANCE_KM {
        violations.push(FieldViolation::new(
            "distance",
            format!("must be at most {} km", MAX_DISTANCE_KM),
        ));
    }

    if let Some(duration) = payload.duration_min {
        if !duration.is_finite() || duration <= 0.0 {
            violations.push(FieldViolation::new("duration", "must be greater than 0"));
        } else if duration > MAX_DURATION_MIN {
            violations.push(FieldViolation::new(
                "duration",
                format!("must be at most {} minutes", MAX_DURATION_MIN),
            ));
        }
    }

    if let Some(count) = payload.passenger_count {
        if !(MIN_PASSENGERS..=MAX_PASSENGERS).contains(&count) {
            violations.push(FieldViolation::new(
                "passenger_count",
                format!("must be between {} and {}", MIN_PASSENGERS, MAX_PASSENGERS),
            ));
        }
    }

    check_point(&mut violations, "from", payload.from.as_ref(), bounds);
    check_point(&mut violations, "to", payload.to.as_ref(), bounds);

    violations
}

fn check_point(
    violations: &mut Vec<FieldViolation>,
    field: &str,
    point: Option<&GeoPoint>,
    bounds: &GeoBounds,
) {
    if let Some(p) = point {
        if !bounds.contains(p.lat, p.lng) {
            violations.push(FieldViolation::new(
                field,
                "coordinates are outside the service region",
            ));
        }
    }
}
