//! Official tariff computation.
//!
//! The metered fare is `base_fare + per_km_rate * distance`; the accepted
//! band around it reflects real-world negotiated-fare variance and is the
//! primary plausibility test for every submission.

use serde::{Deserialize, Serialize};

use crate::config::TariffConfig;
use crate::storage::models::ValidationStatus;

/// Official fare plus the allowed band for a given distance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FareBounds {
    pub official: f64,
    pub min_allowed: f64,
    pub max_allowed: f64,
}

impl FareBounds {
    /// Compute the bounds for a trip distance. Pure and total over
    /// positive distances.
    pub fn for_distance(config: &TariffConfig, distance_km: f64) -> Self {
        let official = config.base_fare + config.per_km_rate * distance_km;
        Self {
            official,
            min_allowed: official * (1.0 + config.min_modifier),
            max_allowed: official * (1.0 + config.max_modifier),
        }
    }

    /// Classify a fare against the band.
    pub fn classify(&self, fare: f64) -> ValidationStatus {
        if fare < self.min_allowed {
            ValidationStatus::BelowMinFare
        } else if fare > self.max_allowed {
            ValidationStatus::AboveMaxFare
        } else {
            ValidationStatus::Accepted
        }
    }
}
