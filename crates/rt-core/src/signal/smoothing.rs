//! Centered Gaussian-weighted rolling mean with leading truncation.
//!
//! Denoises a daily count series after outlier replacement, then drops the
//! leading stretch before the signal first comes up off zero. Series whose
//! smoothed peak never clears `smoothed_max_threshold` are treated as having
//! no usable data at all; a flat trickle of near-zero counts otherwise gets
//! a disproportionate say in the combined R_t estimate.

use crate::series::{ObservationSeries, SmoothedSeries};
use rt_math::gaussian_window;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Configuration for Gaussian smoothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Rolling window length (centered).
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Standard deviation of the Gaussian kernel weights, in days.
    #[serde(default = "default_kernel_std")]
    pub kernel_std: f64,

    /// Minimum in-range points required to emit a smoothed value.
    #[serde(default = "default_min_periods")]
    pub min_periods: usize,

    /// A series whose smoothed maximum stays below this is dropped entirely.
    #[serde(default = "default_smoothed_max_threshold")]
    pub smoothed_max_threshold: f64,
}

fn default_window_size() -> usize {
    14
}

fn default_kernel_std() -> f64 {
    5.0
}

fn default_min_periods() -> usize {
    5
}

fn default_smoothed_max_threshold() -> f64 {
    5.0
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            kernel_std: default_kernel_std(),
            min_periods: default_min_periods(),
            smoothed_max_threshold: default_smoothed_max_threshold(),
        }
    }
}

/// Errors from smoothing configuration.
#[derive(Debug, Error)]
pub enum SmoothingError {
    #[error("invalid window size: {0} (must be > 0)")]
    InvalidWindowSize(usize),

    #[error("invalid kernel std: {0} (must be > 0)")]
    InvalidKernelStd(f64),

    #[error("invalid min periods: {min_periods} (must be in 1..={window_size})")]
    InvalidMinPeriods { min_periods: usize, window_size: usize },
}

impl SmoothingConfig {
    pub fn validate(&self) -> Result<(), SmoothingError> {
        if self.window_size == 0 {
            return Err(SmoothingError::InvalidWindowSize(self.window_size));
        }
        if !(self.kernel_std > 0.0) {
            return Err(SmoothingError::InvalidKernelStd(self.kernel_std));
        }
        if self.min_periods == 0 || self.min_periods > self.window_size {
            return Err(SmoothingError::InvalidMinPeriods {
                min_periods: self.min_periods,
                window_size: self.window_size,
            });
        }
        Ok(())
    }
}

/// Smooth a series and truncate its unusable head.
///
/// Returns an empty series when the input is empty or the smoothed maximum
/// never reaches `smoothed_max_threshold`.
pub fn smooth_series(series: &ObservationSeries, config: &SmoothingConfig) -> SmoothedSeries {
    let smoothed = rolling_gaussian_mean(&series.values, config);

    let max = smoothed
        .iter()
        .flatten()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);

    if smoothed.is_empty() || !max.is_finite() {
        return SmoothedSeries::default();
    }
    if max < config.smoothed_max_threshold {
        debug!(
            max,
            threshold = config.smoothed_max_threshold,
            "smoothed series below activity threshold, dropping"
        );
        return SmoothedSeries::default();
    }

    let Some(idx_start) = smoothed
        .iter()
        .position(|v| matches!(v, Some(value) if *value != 0.0))
    else {
        return SmoothedSeries::default();
    };

    // Contiguous run of defined values from the first non-zero one. With a
    // centered window, undefined values can only sit at the extreme edges.
    let mut dates = Vec::new();
    let mut values = Vec::new();
    for (date, value) in series.dates[idx_start..]
        .iter()
        .zip(&smoothed[idx_start..])
    {
        match value {
            Some(v) => {
                dates.push(*date);
                values.push(*v);
            }
            None => break,
        }
    }

    SmoothedSeries { dates, values }
}

/// Centered Gaussian-weighted rolling mean, rounded to whole counts.
///
/// For window length N the window at index i spans offsets
/// `[-(N-1-(N-1)/2), +(N-1)/2]`; out-of-range slots are simply absent and
/// the weights of the present slots renormalize. Fewer than `min_periods`
/// present points yields `None`.
fn rolling_gaussian_mean(values: &[f64], config: &SmoothingConfig) -> Vec<Option<f64>> {
    let n = config.window_size;
    let weights = gaussian_window(n, config.kernel_std);
    let shift = (n - 1) / 2;
    let lead = n - 1 - shift;

    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            let mut present = 0usize;
            for (k, weight) in weights.iter().enumerate() {
                let offset = k as isize - lead as isize;
                let j = i as isize + offset;
                if j < 0 || j >= values.len() as isize {
                    continue;
                }
                weighted_sum += weight * values[j as usize];
                weight_total += weight;
                present += 1;
            }
            if present < config.min_periods || weight_total <= 0.0 {
                None
            } else {
                Some((weighted_sum / weight_total).round())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: Vec<f64>) -> ObservationSeries {
        let start = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| start + chrono::Days::new(i as u64))
            .collect();
        ObservationSeries { dates, values }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out = smooth_series(&series(vec![]), &SmoothingConfig::default());
        assert!(out.is_empty());
    }

    #[test]
    fn constant_series_smooths_to_itself() {
        let out = smooth_series(&series(vec![100.0; 30]), &SmoothingConfig::default());
        assert_eq!(out.len(), 30);
        assert!(out.values.iter().all(|&v| v == 100.0));
    }

    #[test]
    fn low_activity_series_is_dropped() {
        // Peak smoothed value stays below the default threshold of 5.
        let out = smooth_series(&series(vec![2.0; 40]), &SmoothingConfig::default());
        assert!(out.is_empty());
    }

    #[test]
    fn leading_zeros_are_truncated() {
        let mut values = vec![0.0; 30];
        values.extend(vec![100.0; 30]);
        let input = series(values);
        let out = smooth_series(&input, &SmoothingConfig::default());
        assert!(!out.is_empty());
        assert!(out.len() < input.len());
        // Dates are a contiguous suffix of the input dates.
        let offset = input.len() - out.len();
        assert_eq!(out.dates.as_slice(), &input.dates[offset..]);
        assert!(out.values[0] != 0.0);
    }

    #[test]
    fn values_are_rounded_to_whole_counts() {
        let values: Vec<f64> = (0..30).map(|i| 40.0 + (i % 7) as f64).collect();
        let out = smooth_series(&series(values), &SmoothingConfig::default());
        for v in &out.values {
            assert_eq!(*v, v.round());
        }
    }

    #[test]
    fn smoothing_flattens_a_step() {
        let mut values = vec![10.0; 20];
        values.extend(vec![100.0; 20]);
        let out = smooth_series(&series(values), &SmoothingConfig::default());
        // Ramp through the step instead of a cliff: strictly between the
        // plateaus near the boundary.
        let mid = out.len() / 2;
        assert!(out.values[mid] > 10.0);
        assert!(out.values[mid] < 100.0);
    }

    #[test]
    fn too_short_series_has_no_defined_values() {
        let out = smooth_series(&series(vec![100.0; 3]), &SmoothingConfig::default());
        assert!(out.is_empty());
    }

    #[test]
    fn config_validation() {
        assert!(SmoothingConfig::default().validate().is_ok());
        assert!(SmoothingConfig {
            window_size: 0,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(SmoothingConfig {
            kernel_std: 0.0,
            ..Default::default()
        }
        .validate()
        .is_err());
        assert!(SmoothingConfig {
            min_periods: 15,
            ..Default::default()
        }
        .validate()
        .is_err());
    }
}
