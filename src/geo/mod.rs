//! Geospatial primitives.
//!
//! Provides the coarse hex-zone indexing used for equality-based
//! proximity queries, plus the great-circle distance used by the
//! analysis refinement pass:
//! - `GeoPoint` / `GeoBounds` - coordinates and the service region
//! - `ZoneIndexer` - deterministic (lat, lng) -> hex cell id mapping

pub mod zone;

use h3o::LatLng;
use serde::{Deserialize, Serialize};

pub use zone::{ZoneId, ZoneIndexer};

/// A coordinate reported by the client, with an optional display name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            name: None,
        }
    }
}

/// Bounding box for the service region.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoBounds {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl Default for GeoBounds {
    fn default() -> Self {
        // Egypt service region.
        Self {
            lat_min: 22.0,
            lat_max: 32.0,
            lng_min: 25.0,
            lng_max: 37.0,
        }
    }
}

impl GeoBounds {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat.is_finite()
            && lng.is_finite()
            && lat >= self.lat_min
            && lat <= self.lat_max
            && lng >= self.lng_min
            && lng <= self.lng_max
    }
}

/// Great-circle distance between two points, in km.
///
/// Returns `None` for non-finite coordinates so callers can drop the
/// record instead of propagating an error.
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> Option<f64> {
    let from = LatLng::new(a.lat, a.lng).ok()?;
    let to = LatLng::new(b.lat, b.lng).ok()?;
    Some(from.distance_km(to))
}
