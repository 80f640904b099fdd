//! Lag detection between R_t estimate series.
//!
//! Deaths and hospitalizations trail the case curve by a data-dependent
//! number of days. The lag is recovered by shifting the trailing series and
//! scoring each candidate shift with the mean cross-correlation of the first
//! differences of both series, over the indices where both are present.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Configuration for the lag search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Most negative candidate shift (series b pulled earlier).
    #[serde(default = "default_min_shift")]
    pub min_shift: i64,

    /// Most positive candidate shift (series b pushed later).
    #[serde(default = "default_max_shift")]
    pub max_shift: i64,

    /// Trailing window (days) over which the lag is estimated.
    #[serde(default = "default_window_days")]
    pub window_days: usize,
}

fn default_min_shift() -> i64 {
    -21
}

fn default_max_shift() -> i64 {
    4
}

fn default_window_days() -> usize {
    21
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            min_shift: default_min_shift(),
            max_shift: default_max_shift(),
            window_days: default_window_days(),
        }
    }
}

/// Errors from alignment configuration.
#[derive(Debug, Error)]
pub enum AlignmentError {
    #[error("invalid shift range: {min_shift}..={max_shift}")]
    InvalidShiftRange { min_shift: i64, max_shift: i64 },

    #[error("invalid window: {0} (must be > 1)")]
    InvalidWindow(usize),
}

impl AlignmentConfig {
    pub fn validate(&self) -> Result<(), AlignmentError> {
        if self.min_shift > self.max_shift {
            return Err(AlignmentError::InvalidShiftRange {
                min_shift: self.min_shift,
                max_shift: self.max_shift,
            });
        }
        if self.window_days < 2 {
            return Err(AlignmentError::InvalidWindow(self.window_days));
        }
        Ok(())
    }
}

/// Find the day shift of `series_b` that best aligns it to `series_a`.
///
/// Both series may have missing entries (outer-join columns). Returns 0
/// when no candidate shift yields any overlapping first-difference points.
/// Ties go to the earliest candidate shift.
pub fn align_series(
    series_a: &[Option<f64>],
    series_b: &[Option<f64>],
    config: &AlignmentConfig,
) -> i64 {
    let a_diff = first_differences(series_a);

    let mut best: Option<(i64, f64)> = None;
    for shift in config.min_shift..=config.max_shift {
        let shifted = shift_values(series_b, shift);
        let b_diff = first_differences(&shifted);

        let mut a_valid = Vec::new();
        let mut b_valid = Vec::new();
        for (a, b) in a_diff.iter().zip(&b_diff) {
            if let (Some(a), Some(b)) = (a, b) {
                a_valid.push(*a);
                b_valid.push(*b);
            }
        }
        if a_valid.is_empty() {
            continue;
        }

        let score = mean_cross_correlation(&a_valid, &b_valid);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((shift, score)),
        }
    }

    let shift = best.map(|(shift, _)| shift).unwrap_or(0);
    debug!(shift, "selected alignment shift");
    shift
}

/// Shift values by `shift` days: positive pushes values later.
pub fn shift_values(values: &[Option<f64>], shift: i64) -> Vec<Option<f64>> {
    let len = values.len() as i64;
    (0..len)
        .map(|k| {
            let src = k - shift;
            if src < 0 || src >= len {
                None
            } else {
                values[src as usize]
            }
        })
        .collect()
}

/// First differences; a difference exists only where both endpoints do.
fn first_differences(values: &[Option<f64>]) -> Vec<Option<f64>> {
    values
        .windows(2)
        .map(|pair| match (pair[0], pair[1]) {
            (Some(prev), Some(next)) => Some(next - prev),
            _ => None,
        })
        .collect()
}

/// Mean of the full (dense) cross-correlation of two equal-length signals.
fn mean_cross_correlation(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let out_len = a.len() + b.len() - 1;
    let mut total = 0.0;
    for lag in 0..out_len {
        // Correlation at this lag: sum over overlapping samples.
        let mut acc = 0.0;
        for (i, &ai) in a.iter().enumerate() {
            let j = (i + b.len()) as i64 - 1 - lag as i64;
            if j >= 0 && (j as usize) < b.len() {
                acc += ai * b[j as usize];
            }
        }
        total += acc;
    }
    total / out_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|v| Some(*v)).collect()
    }

    #[test]
    fn identical_series_align_at_zero() {
        // For a steady trend the unshifted overlap scores highest, so two
        // copies of the same series land on shift 0.
        let series: Vec<f64> = (0..21).map(|i| i as f64).collect();
        let shift = align_series(
            &present(&series),
            &present(&series),
            &AlignmentConfig::default(),
        );
        assert_eq!(shift, 0);
    }

    #[test]
    fn only_shift_with_overlap_wins() {
        // a is defined on days 0-1 and b on days 6-7; the single candidate
        // shift that overlays the defined stretches is -6.
        let mut a = vec![None; 10];
        a[0] = Some(1.0);
        a[1] = Some(2.0);
        let mut b = vec![None; 10];
        b[6] = Some(3.0);
        b[7] = Some(5.0);
        let shift = align_series(&a, &b, &AlignmentConfig::default());
        assert_eq!(shift, -6);
    }

    #[test]
    fn no_overlap_defaults_to_zero() {
        let a = vec![None, None, Some(1.0)];
        let b = vec![Some(1.0), None, None];
        let shift = align_series(&a, &b, &AlignmentConfig::default());
        assert_eq!(shift, 0);
    }

    #[test]
    fn empty_series_default_to_zero() {
        let shift = align_series(&[], &[], &AlignmentConfig::default());
        assert_eq!(shift, 0);
    }

    #[test]
    fn shift_moves_values_later() {
        let values = present(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(
            shift_values(&values, 1),
            vec![None, Some(1.0), Some(2.0), Some(3.0)]
        );
        assert_eq!(
            shift_values(&values, -2),
            vec![Some(3.0), Some(4.0), None, None]
        );
    }

    #[test]
    fn differences_skip_missing_points() {
        let values = vec![Some(1.0), Some(3.0), None, Some(7.0)];
        assert_eq!(first_differences(&values), vec![Some(2.0), None, None]);
    }

    #[test]
    fn cross_correlation_mean_matches_closed_form() {
        // The dense cross-correlation sums to sum(a)*sum(b).
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        let expected = (1.0 + 2.0 + 3.0) * (4.0 + 5.0 + 6.0) / 5.0;
        assert!((mean_cross_correlation(&a, &b) - expected).abs() < 1e-12);
    }

    #[test]
    fn config_validation() {
        assert!(AlignmentConfig::default().validate().is_ok());
        assert!(AlignmentConfig {
            min_shift: 5,
            max_shift: -5,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(AlignmentConfig {
            window_days: 1,
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
