//! Interquartile-range outlier fences.
//!
//! Standard Tukey fences over a numeric sample, used only as a fallback
//! acceptance test when a fare falls outside the official tariff band -
//! never as the primary rule.

use serde::Serialize;

/// Quartiles and the Tukey fences derived from them.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl IqrBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound && value <= self.upper_bound
    }
}

/// Compute IQR bounds over a sample.
///
/// Requires at least 4 samples; fewer is not statistically meaningful and
/// yields `None`. Uses the exclusive median split: for odd-length input
/// the middle element belongs to neither half.
pub fn interquartile_range(samples: &[f64]) -> Option<IqrBounds> {
    if samples.len() < 4 {
        return None;
    }

    let mut sorted: Vec<f64> = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    let lower = &sorted[..mid];
    let upper = if sorted.len() % 2 == 0 {
        &sorted[mid..]
    } else {
        &sorted[mid + 1..]
    };

    let q1 = median(lower);
    let q3 = median(upper);
    let iqr = q3 - q1;

    Some(IqrBounds {
        q1,
        q3,
        iqr,
        lower_bound: q1 - 1.5 * iqr,
        upper_bound: q3 + 1.5 * iqr,
    })
}

/// Median of a non-empty, pre-sorted slice.
fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_too_few_samples() {
        assert!(interquartile_range(&[]).is_none());
        assert!(interquartile_range(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_even_sample() {
        let bounds = interquartile_range(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((bounds.q1 - 1.5).abs() < 1e-9);
        assert!((bounds.q3 - 3.5).abs() < 1e-9);
        assert!((bounds.iqr - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_odd_sample_excludes_median() {
        // Sorted: [10, 11, 12, 13, 50]; 12 belongs to neither half.
        let bounds = interquartile_range(&[10.0, 12.0, 11.0, 13.0, 50.0]).unwrap();
        assert!((bounds.q1 - 10.5).abs() < 1e-9);
        assert!((bounds.q3 - 31.5).abs() < 1e-9);
        assert!((bounds.iqr - 21.0).abs() < 1e-9);
        // A mildly off fare sits inside the fences; a wild one does not.
        assert!(bounds.contains(14.0));
        assert!(!bounds.contains(200.0));
    }

    #[test]
    fn test_unsorted_input() {
        let a = interquartile_range(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        let b = interquartile_range(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_fences_bracket_quartiles(samples in prop::collection::vec(0.0f64..1000.0, 4..64)) {
            let bounds = interquartile_range(&samples).unwrap();
            prop_assert!(bounds.q1 <= bounds.q3);
            prop_assert!(bounds.lower_bound <= bounds.q1);
            prop_assert!(bounds.upper_bound >= bounds.q3);
        }

        #[test]
        fn prop_quartiles_within_sample_range(samples in prop::collection::vec(-500.0f64..500.0, 4..64)) {
            let bounds = interquartile_range(&samples).unwrap();
            let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(bounds.q1 >= min && bounds.q1 <= max);
            prop_assert!(bounds.q3 >= min && bounds.q3 <= max);
        }
    }
}
