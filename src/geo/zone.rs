//! Deterministic hex-zone indexing.
//!
//! Maps a coordinate to a fixed-resolution H3 cell id. Two points in the
//! same cell are "the same place" for every zone-equality comparison in
//! the system; the coarse-graining is what lets the store run exact-match
//! queries instead of radius scans.

use h3o::{LatLng, Resolution};

use crate::geo::GeoBounds;

/// A hex cell id, stored and compared as its canonical string form.
pub type ZoneId = String;

/// Stateless (lat, lng) -> zone mapping at a process-wide resolution.
#[derive(Debug, Clone)]
pub struct ZoneIndexer {
    resolution: Resolution,
    bounds: GeoBounds,
}

impl ZoneIndexer {
    /// Build an indexer for the given H3 resolution and service region.
    ///
    /// An out-of-range resolution falls back to resolution 8 (the
    /// street-block default) with a warning rather than failing engine
    /// construction.
    pub fn new(resolution: u8, bounds: GeoBounds) -> Self {
        let resolution = Resolution::try_from(resolution).unwrap_or_else(|_| {
            log::warn!(
                "ZONE_RESOLUTION_INVALID requested={} fallback=8",
                resolution
            );
            Resolution::Eight
        });
        Self { resolution, bounds }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Map a coordinate to its hex cell id.
    ///
    /// Returns `None` for coordinates outside the service region or
    /// non-finite input, so downstream zone-equality filters degrade to
    /// "no match" instead of crashing.
    pub fn zone_of(&self, lat: f64, lng: f64) -> Option<ZoneId> {
        if !self.bounds.contains(lat, lng) {
            return None;
        }
        let point = LatLng::new(lat, lng).ok()?;
        Some(point.to_cell(self.resolution).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexer() -> ZoneIndexer {
        ZoneIndexer::new(8, GeoBounds::default())
    }

    #[test]
    fn test_deterministic() {
        let idx = indexer();
        let a = idx.zone_of(30.0444, 31.2357);
        let b = idx.zone_of(30.0444, 31.2357);
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_nearby_points_share_a_zone() {
        let idx = indexer();
        // ~10 cm apart.
        let a = idx.zone_of(30.044400, 31.235700).unwrap();
        let b = idx.zone_of(30.044401, 31.235700).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distant_points_differ() {
        let idx = indexer();
        // Tahrir Square vs. the Giza pyramids, ~13 km apart.
        let a = idx.zone_of(30.0444, 31.2357).unwrap();
        let b = idx.zone_of(29.9792, 31.1342).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_out_of_region_is_none() {
        let idx = indexer();
        assert!(idx.zone_of(48.8566, 2.3522).is_none());
        assert!(idx.zone_of(f64::NAN, 31.0).is_none());
    }

    #[test]
    fn test_invalid_resolution_falls_back() {
        let idx = ZoneIndexer::new(99, GeoBounds::default());
        assert_eq!(idx.resolution(), Resolution::Eight);
        assert!(idx.zone_of(30.0444, 31.2357).is_some());
    }
}
