//! Engine configuration.
//!
//! Everything tunable lives here and is supplied by the host service at
//! engine construction - tariff constants, zone resolution, rate-limit
//! ceilings, the service bounding box, fraud windows, and the similarity
//! tuning knobs. Nothing in the pipeline logic hard-codes a threshold.

use anyhow::Context;
use serde::Deserialize;

use crate::geo::GeoBounds;

/// Official metered tariff and the allowed negotiation band around it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TariffConfig {
    /// Flag-fall in currency units.
    pub base_fare: f64,
    /// Metered rate per kilometre.
    pub per_km_rate: f64,
    /// Lower bound modifier: min allowed = official * (1 + min_modifier).
    pub min_modifier: f64,
    /// Upper bound modifier: max allowed = official * (1 + max_modifier).
    pub max_modifier: f64,
}

impl Default for TariffConfig {
    fn default() -> Self {
        // Defaults allow negotiated fares from +15% to +100% over the meter.
        Self {
            base_fare: 5.0,
            per_km_rate: 2.5,
            min_modifier: 0.15,
            max_modifier: 1.0,
        }
    }
}

/// Hex-zone indexing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// H3 resolution. Resolution 8 puts a cell at roughly street-block to
    /// small-neighborhood scale, which is the granularity the equality
    /// queries are designed around.
    pub resolution: u8,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self { resolution: 8 }
    }
}

/// Per-user submission ceilings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub hourly_limit: u32,
    pub daily_limit: u32,
    /// Counter retention before the record is eligible for cleanup.
    pub retention_hours: i64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            hourly_limit: 5,
            daily_limit: 20,
            retention_hours: 48,
        }
    }
}

/// Abuse-detection windows.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FraudConfig {
    /// Two trips on the same zone pair and date closer than this are
    /// treated as duplicates.
    pub duplicate_window_min: i64,
    /// Throttle window for same-zone round trips.
    pub same_zone_window_min: i64,
    /// Time-feasibility check. Present in the design but off by default;
    /// enable explicitly rather than assuming it should always run.
    pub feasibility_check_enabled: bool,
    /// TTL for the per-user latest-trip-end cache.
    pub end_cache_ttl_secs: u64,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            duplicate_window_min: 30,
            same_zone_window_min: 30,
            feasibility_check_enabled: false,
            end_cache_ttl_secs: 60,
        }
    }
}

/// Tuning for the IQR fallback acceptance test.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Minimum qualifying fares before quartiles are meaningful.
    pub min_samples: usize,
    /// Comparable trips must be within this relative distance of the
    /// candidate (0.2 = +/-20%).
    pub relative_distance: f64,
    /// Comparable trips must start within this many hours of the
    /// candidate's time of day (circular).
    pub time_window_hours: u32,
    /// Cap on the store query feeding the fallback.
    pub sample_limit: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_samples: 4,
            relative_distance: 0.2,
            time_window_hours: 2,
            sample_limit: 100,
        }
    }
}

/// Defaults for the similarity analysis operation. Each knob can be
/// overridden per request.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Half-width of the distance band, in km.
    pub max_distance_diff_km: f64,
    /// Time-of-day window applied when the query carries a start time.
    pub max_time_diff_hours: f64,
    /// Geographic radius for the endpoint refinement pass, in km.
    pub max_distance_km: f64,
    /// Cap on rows pulled from the store per analysis.
    pub result_limit: usize,
    /// How many anonymized recent trips to return.
    pub recent_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_distance_diff_km: 2.0,
            max_time_diff_hours: 2.0,
            max_distance_km: 1.0,
            result_limit: 100,
            recent_limit: 10,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tariff: TariffConfig,
    pub zone: ZoneConfig,
    /// Service region; coordinates outside it are rejected or degrade to
    /// "no zone" depending on the operation.
    pub bounds: GeoBounds,
    pub rate_limit: RateLimitConfig,
    pub fraud: FraudConfig,
    pub fallback: FallbackConfig,
    pub analysis: AnalysisConfig,
}

impl EngineConfig {
    /// Parse a configuration document. Absent fields keep their defaults,
    /// so `{}` is a valid document.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("invalid engine configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.rate_limit.hourly_limit, 5);
        assert_eq!(cfg.rate_limit.daily_limit, 20);
        assert_eq!(cfg.zone.resolution, 8);
        assert_eq!(cfg.fallback.min_samples, 4);
        assert!(!cfg.fraud.feasibility_check_enabled);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"rate_limit": {"hourly_limit": 10}}"#).unwrap();
        assert_eq!(cfg.rate_limit.hourly_limit, 10);
        assert_eq!(cfg.rate_limit.daily_limit, 20);
        assert_eq!(cfg.tariff.base_fare, 5.0);
    }

    #[test]
    fn test_from_json() {
        let cfg = EngineConfig::from_json("{}").unwrap();
        assert_eq!(cfg.analysis.result_limit, 100);

        let err = EngineConfig::from_json("not json").unwrap_err();
        assert!(err.to_string().contains("invalid engine configuration"));
    }
}
