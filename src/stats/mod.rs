//! Fare statistics.
//!
//! - `iqr` - interquartile-range outlier fences (the fallback acceptance
//!   test for fares outside the tariff band)
//! - `aggregate` - grouped statistics and the fare histogram returned by
//!   the similarity analysis

pub mod aggregate;
pub mod iqr;

pub use aggregate::{aggregate_trips, circular_hour_diff, AggregateStatistics};
pub use iqr::{interquartile_range, IqrBounds};
