//! Persisted record models.
//!
//! These are the shapes handed across the store seam: the immutable trip
//! observation, the per-user rate-limit counters, and user roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, ZoneId};

/// Verdict of the tariff-bound check (possibly promoted by the IQR
/// fallback, which never demotes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Accepted,
    BelowMinFare,
    AboveMaxFare,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Accepted => "accepted",
            ValidationStatus::BelowMinFare => "below_min_fare",
            ValidationStatus::AboveMaxFare => "above_max_fare",
        }
    }
}

/// A persisted fare observation. Created once by the submission pipeline
/// and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    /// Store-assigned id; empty until `TripStore::insert` assigns one.
    #[serde(default)]
    pub id: String,

    pub fare: f64,
    pub distance_km: f64,
    pub duration_min: Option<f64>,
    pub passenger_count: Option<u32>,
    pub from: Option<GeoPoint>,
    pub to: Option<GeoPoint>,
    pub start_time: DateTime<Utc>,
    pub governorate: Option<String>,

    pub user_id: String,
    pub submitted_at: DateTime<Utc>,
    /// Salted hash of the caller IP; the raw IP is never stored.
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
    pub is_admin_submission: bool,

    // Verdict. `suspicious` is true iff the status is not `accepted`
    // after the fallback. Records written before the flag existed carry
    // no field at all and default to not suspicious.
    #[serde(default)]
    pub suspicious: bool,
    pub validation_status: ValidationStatus,
    pub official_fare: f64,
    pub min_allowed_fare: f64,
    pub max_allowed_fare: f64,

    // Derived index features.
    pub from_zone: Option<ZoneId>,
    pub to_zone: Option<ZoneId>,
    /// Calendar date of `start_time`, YYYY-MM-DD.
    pub date: String,
    pub month: u32,
    /// Hour of day, 0-23.
    pub time_of_day: u32,
    /// Day of week, 0-6 with Sunday = 0.
    pub day_of_week: u32,
    pub speed_kmh: Option<f64>,
}

impl Trip {
    /// End of the trip: start plus duration when one was reported.
    pub fn end_time(&self) -> DateTime<Utc> {
        match self.duration_min {
            Some(minutes) if minutes > 0.0 => {
                self.start_time + chrono::Duration::seconds((minutes * 60.0) as i64)
            }
            _ => self.start_time,
        }
    }
}

/// Per-user sliding hour/day counters.
///
/// Counts reset to zero whenever the slot index derived from the clock
/// advances past the stored slot; they are never decremented. Mutated
/// only through the limiter's atomic check-and-increment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitCounter {
    pub user_id: String,
    pub hour_slot: i64,
    pub hour_count: u32,
    pub day_slot: i64,
    pub day_count: u32,
    /// When the record becomes eligible for cleanup.
    pub expires_at: DateTime<Utc>,
}

impl RateLimitCounter {
    pub fn fresh(user_id: &str, hour_slot: i64, day_slot: i64, expires_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            hour_slot,
            hour_count: 0,
            day_slot,
            day_count: 0,
            expires_at,
        }
    }
}

/// Caller role. Admins bypass the rate limiter and fraud checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[cfg(test)]
pub(crate) fn test_trip(start: DateTime<Utc>) -> Trip {
    Trip {
        id: String::new(),
        fare: 40.0,
        distance_km: 10.0,
        duration_min: None,
        passenger_count: None,
        from: None,
        to: None,
        start_time: start,
        governorate: None,
        user_id: "user-1".to_string(),
        submitted_at: start,
        ip_hash: None,
        user_agent: None,
        is_admin_submission: false,
        suspicious: false,
        validation_status: ValidationStatus::Accepted,
        official_fare: 30.0,
        min_allowed_fare: 34.5,
        max_allowed_fare: 60.0,
        from_zone: None,
        to_zone: None,
        date: start.format("%Y-%m-%d").to_string(),
        month: chrono::Datelike::month(&start),
        time_of_day: chrono::Timelike::hour(&start),
        day_of_week: chrono::Datelike::weekday(&start).num_days_from_sunday(),
        speed_kmh: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ValidationStatus::BelowMinFare).unwrap();
        assert_eq!(json, r#""below_min_fare""#);
        assert_eq!(ValidationStatus::BelowMinFare.as_str(), "below_min_fare");
    }

    #[test]
    fn test_end_time_uses_duration() {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 14, 0, 0).unwrap();
        let trip = Trip {
            duration_min: Some(45.0),
            ..test_trip(start)
        };
        assert_eq!(trip.end_time(), start + chrono::Duration::minutes(45));

        let trip = Trip {
            duration_min: None,
            ..test_trip(start)
        };
        assert_eq!(trip.end_time(), start);
    }

    #[test]
    fn test_record_without_suspicious_flag_defaults_to_false() {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        let mut json = serde_json::to_value(test_trip(start)).unwrap();

        // Records written before the flag existed have no such field.
        json.as_object_mut().unwrap().remove("suspicious");

        let trip: Trip = serde_json::from_value(json).unwrap();
        assert!(!trip.suspicious);
    }
}
