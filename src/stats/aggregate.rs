//! Grouped fare statistics for the similarity analysis.
//!
//! Aggregates a filtered set of comparable trips into:
//! - overall average / min / max fare
//! - per time-of-day, day-of-week, and distance-band bucket means
//! - an 8-bucket fare histogram spanning observed min -> max
//! - the most recent trips, anonymized

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::models::Trip;

pub const HISTOGRAM_BUCKETS: usize = 8;

/// Count and mean fare for one bucket.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct BucketStats {
    pub count: usize,
    pub average_fare: f64,
}

impl BucketStats {
    fn from_fares(fares: &[f64]) -> Self {
        if fares.is_empty() {
            return Self::default();
        }
        Self {
            count: fares.len(),
            average_fare: fares.iter().sum::<f64>() / fares.len() as f64,
        }
    }
}

/// Fares grouped by time of day.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct TimeOfDayStats {
    /// 06:00-11:59
    pub morning: BucketStats,
    /// 12:00-17:59
    pub afternoon: BucketStats,
    /// 18:00-23:59
    pub evening: BucketStats,
    /// 00:00-05:59
    pub night: BucketStats,
}

/// Fares grouped by trip length.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct DistanceBandStats {
    /// <= 5 km
    pub short: BucketStats,
    /// <= 15 km
    pub medium: BucketStats,
    /// > 15 km
    pub long: BucketStats,
}

/// One histogram bucket over the observed fare span.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct HistogramBucket {
    pub range_start: f64,
    pub range_end: f64,
    pub count: usize,
}

/// A recent comparable trip, anonymized: no identities, no exact
/// coordinates.
#[derive(Debug, Clone, Serialize)]
pub struct RecentTrip {
    pub fare: f64,
    pub distance_km: f64,
    pub duration_min: Option<f64>,
    pub start_time: DateTime<Utc>,
    pub governorate: Option<String>,
}

/// The full aggregate returned by the analysis operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateStatistics {
    pub similar_trips_count: usize,
    pub average_fare: f64,
    pub min_fare: f64,
    pub max_fare: f64,
    pub by_time_of_day: TimeOfDayStats,
    /// Indexed by day of week, Sunday = 0.
    pub by_day_of_week: [BucketStats; 7],
    pub by_distance: DistanceBandStats,
    pub fare_histogram: Vec<HistogramBucket>,
    pub recent_trips: Vec<RecentTrip>,
}

/// Aggregate a filtered set of comparable trips.
///
/// An empty slice yields the all-zero aggregate - "no data" is a valid
/// answer, never an error.
pub fn aggregate_trips(trips: &[Trip], recent_limit: usize) -> AggregateStatistics {
    if trips.is_empty() {
        return AggregateStatistics::default();
    }

    let fares: Vec<f64> = trips.iter().map(|t| t.fare).collect();
    let min_fare = fares.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_fare = fares.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let average_fare = fares.iter().sum::<f64>() / fares.len() as f64;

    let bucket = |pred: &dyn Fn(&Trip) -> bool| -> BucketStats {
        let selected: Vec<f64> = trips.iter().filter(|t| pred(t)).map(|t| t.fare).collect();
        BucketStats::from_fares(&selected)
    };

    let by_time_of_day = TimeOfDayStats {
        morning: bucket(&|t| (6..12).contains(&t.time_of_day)),
        afternoon: bucket(&|t| (12..18).contains(&t.time_of_day)),
        evening: bucket(&|t| (18..24).contains(&t.time_of_day)),
        night: bucket(&|t| t.time_of_day < 6),
    };

    let mut by_day_of_week = [BucketStats::default(); 7];
    for (day, slot) in by_day_of_week.iter_mut().enumerate() {
        *slot = bucket(&|t| t.day_of_week as usize == day);
    }

    let by_distance = DistanceBandStats {
        short: bucket(&|t| t.distance_km <= 5.0),
        medium: bucket(&|t| t.distance_km > 5.0 && t.distance_km <= 15.0),
        long: bucket(&|t| t.distance_km > 15.0),
    };

    let mut recent: Vec<&Trip> = trips.iter().collect();
    recent.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    let recent_trips = recent
        .into_iter()
        .take(recent_limit)
        .map(|t| RecentTrip {
            fare: t.fare,
            distance_km: t.distance_km,
            duration_min: t.duration_min,
            start_time: t.start_time,
            governorate: t.governorate.clone(),
        })
        .collect();

    AggregateStatistics {
        similar_trips_count: trips.len(),
        average_fare,
        min_fare,
        max_fare,
        by_time_of_day,
        by_day_of_week,
        by_distance,
        fare_histogram: fare_histogram(&fares, min_fare, max_fare),
        recent_trips,
    }
}

/// 8-bucket histogram over [min, max]. Bucket counts always sum to the
/// number of fares; a degenerate span (all fares equal) lands everything
/// in the first bucket.
fn fare_histogram(fares: &[f64], min_fare: f64, max_fare: f64) -> Vec<HistogramBucket> {
    let span = max_fare - min_fare;
    let width = span / HISTOGRAM_BUCKETS as f64;

    let mut buckets: Vec<HistogramBucket> = (0..HISTOGRAM_BUCKETS)
        .map(|i| HistogramBucket {
            range_start: min_fare + width * i as f64,
            range_end: if i == HISTOGRAM_BUCKETS - 1 {
                max_fare
            } else {
                min_fare + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for &fare in fares {
        let index = if width > 0.0 {
            (((fare - min_fare) / width) as usize).min(HISTOGRAM_BUCKETS - 1)
        } else {
            0
        };
        buckets[index].count += 1;
    }

    buckets
}

/// Shortest distance between two hours on the 24-hour clock.
pub fn circular_hour_diff(a: u32, b: u32) -> u32 {
    let diff = a.abs_diff(b) % 24;
    diff.min(24 - diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::models::test_trip;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn trip(hour: u32, fare: f64, distance: f64) -> Trip {
        let start = Utc.with_ymd_and_hms(2026, 3, 10, hour, 0, 0).unwrap();
        Trip {
            fare,
            distance_km: distance,
            ..test_trip(start)
        }
    }

    #[test]
    fn test_empty_set_aggregates_to_zeros() {
        let agg = aggregate_trips(&[], 10);
        assert_eq!(agg.similar_trips_count, 0);
        assert_eq!(agg.average_fare, 0.0);
        assert!(agg.fare_histogram.is_empty());
        assert!(agg.recent_trips.is_empty());
        assert_eq!(agg.by_time_of_day.morning.count, 0);
    }

    #[test]
    fn test_time_of_day_buckets() {
        let trips = vec![
            trip(7, 10.0, 3.0),  // morning
            trip(13, 20.0, 3.0), // afternoon
            trip(19, 30.0, 3.0), // evening
            trip(2, 40.0, 3.0),  // night
            trip(8, 14.0, 3.0),  // morning
        ];
        let agg = aggregate_trips(&trips, 10);
        assert_eq!(agg.by_time_of_day.morning.count, 2);
        assert!((agg.by_time_of_day.morning.average_fare - 12.0).abs() < 1e-9);
        assert_eq!(agg.by_time_of_day.afternoon.count, 1);
        assert_eq!(agg.by_time_of_day.evening.count, 1);
        assert_eq!(agg.by_time_of_day.night.count, 1);
    }

    #[test]
    fn test_distance_bands() {
        let trips = vec![
            trip(9, 10.0, 4.0),
            trip(9, 20.0, 5.0),
            trip(9, 30.0, 12.0),
            trip(9, 40.0, 30.0),
        ];
        let agg = aggregate_trips(&trips, 10);
        assert_eq!(agg.by_distance.short.count, 2);
        assert_eq!(agg.by_distance.medium.count, 1);
        assert_eq!(agg.by_distance.long.count, 1);
    }

    #[test]
    fn test_day_of_week_indexing() {
        // 2026-03-10 is a Tuesday -> index 2 with Sunday = 0.
        let trips = vec![trip(9, 10.0, 3.0)];
        let agg = aggregate_trips(&trips, 10);
        assert_eq!(agg.by_day_of_week[2].count, 1);
        assert_eq!(agg.by_day_of_week[0].count, 0);
    }

    #[test]
    fn test_histogram_counts_sum() {
        let trips: Vec<Trip> = (0..20).map(|i| trip(9, 10.0 + i as f64, 3.0)).collect();
        let agg = aggregate_trips(&trips, 10);
        assert_eq!(agg.fare_histogram.len(), HISTOGRAM_BUCKETS);
        let total: usize = agg.fare_histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 20);
        assert_eq!(agg.fare_histogram[0].range_start, 10.0);
        assert_eq!(agg.fare_histogram[7].range_end, 29.0);
    }

    #[test]
    fn test_histogram_degenerate_span() {
        let trips: Vec<Trip> = (0..5).map(|_| trip(9, 25.0, 3.0)).collect();
        let agg = aggregate_trips(&trips, 10);
        assert_eq!(agg.fare_histogram[0].count, 5);
        let total: usize = agg.fare_histogram.iter().map(|b| b.count).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn test_recent_trips_capped_and_anonymized() {
        let mut trips = Vec::new();
        for i in 0..15 {
            let mut t = trip(9, 10.0 + i as f64, 3.0);
            t.submitted_at = Utc.with_ymd_and_hms(2026, 3, 10, 9, i, 0).unwrap();
            trips.push(t);
        }
        let agg = aggregate_trips(&trips, 10);
        assert_eq!(agg.recent_trips.len(), 10);
        // Newest submission first.
        assert!((agg.recent_trips[0].fare - 24.0).abs() < 1e-9);
        // Anonymized shape carries no identity or coordinates.
        let json = serde_json::to_value(&agg.recent_trips[0]).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(json.get("from").is_none());
    }

    #[test]
    fn test_circular_hour_diff() {
        assert_eq!(circular_hour_diff(23, 1), 2);
        assert_eq!(circular_hour_diff(1, 23), 2);
        assert_eq!(circular_hour_diff(12, 12), 0);
        assert_eq!(circular_hour_diff(0, 12), 12);
    }

    proptest! {
        #[test]
        fn prop_histogram_sums_to_input(fares in prop::collection::vec(1.0f64..500.0, 1..80)) {
            let trips: Vec<Trip> = fares.iter().map(|&f| trip(9, f, 3.0)).collect();
            let agg = aggregate_trips(&trips, 10);
            let total: usize = agg.fare_histogram.iter().map(|b| b.count).sum();
            prop_assert_eq!(total, trips.len());
        }
    }
}
