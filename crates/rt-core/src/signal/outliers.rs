//! Trailing-window z-score outlier replacement.
//!
//! Looks at each point's z score against the mean and population std of the
//! previous `lookback_window` samples. Points that exceed the z threshold on
//! a sufficiently active baseline are replaced with the average of their
//! immediate neighbors. Reporting spikes (batch corrections, dumps of
//! backlogged counts) otherwise dominate the smoothed curve.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Guards the z-score denominator when the trailing window is constant.
const EPSILON: f64 = 1e-8;

/// Configuration for outlier replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierConfig {
    /// Trailing window length; the window must be full before any point is
    /// evaluated.
    #[serde(default = "default_lookback_window")]
    pub lookback_window: usize,

    /// Minimum z score that triggers a replacement.
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,

    /// Trailing mean must exceed this (strictly) for a replacement to fire.
    /// Skips the degenerate case where a long run of zeros meets a one.
    #[serde(default = "default_min_mean_to_consider")]
    pub min_mean_to_consider: f64,
}

fn default_lookback_window() -> usize {
    14
}

fn default_z_threshold() -> f64 {
    10.0
}

fn default_min_mean_to_consider() -> f64 {
    5.0
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            lookback_window: default_lookback_window(),
            z_threshold: default_z_threshold(),
            min_mean_to_consider: default_min_mean_to_consider(),
        }
    }
}

/// Errors from outlier configuration.
#[derive(Debug, Error)]
pub enum OutlierError {
    #[error("invalid lookback window: {0} (must be > 0)")]
    InvalidLookbackWindow(usize),

    #[error("invalid z threshold: {0} (must be > 0)")]
    InvalidZThreshold(f64),
}

impl OutlierConfig {
    pub fn validate(&self) -> Result<(), OutlierError> {
        if self.lookback_window == 0 {
            return Err(OutlierError::InvalidLookbackWindow(self.lookback_window));
        }
        if !(self.z_threshold > 0.0) {
            return Err(OutlierError::InvalidZThreshold(self.z_threshold));
        }
        Ok(())
    }
}

/// One replaced point, kept for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct OutlierReplacement {
    pub index: usize,
    pub original: f64,
    pub replacement: f64,
    pub z_score: f64,
}

/// Replace locally anomalous points in `values`.
///
/// The trailing mean/std baselines come from the input as given; the
/// replacements themselves land in a working copy, so an already-replaced
/// left neighbor feeds the interpolation of the next flagged point. Points
/// before the first full window pass through unmodified.
pub fn replace_outliers(
    values: &[f64],
    config: &OutlierConfig,
) -> (Vec<f64>, Vec<OutlierReplacement>) {
    let window = config.lookback_window;
    let mut out = values.to_vec();
    let mut replacements = Vec::new();

    if values.len() <= window {
        return (out, replacements);
    }

    for idx in window..values.len() {
        let baseline = &values[idx - window..idx];
        let mean = baseline.iter().sum::<f64>() / window as f64;
        let var = baseline.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / window as f64;
        let std = var.sqrt();
        let z_score = (values[idx] - mean) / (std + EPSILON);

        if z_score > config.z_threshold && mean > config.min_mean_to_consider {
            let replacement = if idx + 1 < out.len() {
                (out[idx - 1] + out[idx + 1]) / 2.0
            } else {
                // Newest point has no right neighbor.
                out[idx - 1]
            };
            let snippet_end = (idx + window).min(out.len());
            info!(
                index = idx,
                original = values[idx],
                replacement,
                z_score,
                snippet = ?&out[idx - window..snippet_end],
                "replacing outlier"
            );
            replacements.push(OutlierReplacement {
                index: idx,
                original: values[idx],
                replacement,
                z_score,
            });
            out[idx] = replacement;
        }
    }

    (out, replacements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_clean_series_through() {
        let values: Vec<f64> = (0..30).map(|i| 50.0 + (i % 3) as f64).collect();
        let (out, replacements) = replace_outliers(&values, &OutlierConfig::default());
        assert_eq!(out, values);
        assert!(replacements.is_empty());
    }

    #[test]
    fn replaces_spike_with_neighbor_mean() {
        let mut values = vec![50.0; 30];
        values[20] = 5000.0;
        values[21] = 52.0;
        let (out, replacements) = replace_outliers(&values, &OutlierConfig::default());
        assert_eq!(replacements.len(), 1);
        assert_eq!(replacements[0].index, 20);
        assert_eq!(out[20], (50.0 + 52.0) / 2.0);
    }

    #[test]
    fn spike_at_series_end_uses_left_neighbor() {
        let mut values = vec![50.0; 20];
        values[19] = 5000.0;
        let (out, replacements) = replace_outliers(&values, &OutlierConfig::default());
        assert_eq!(replacements.len(), 1);
        assert_eq!(out[19], 50.0);
    }

    #[test]
    fn min_mean_guard_is_strictly_greater() {
        // Baseline exactly at the guard: trailing mean is 5, `5 > 5` is
        // false, so the spike survives.
        let mut at_guard = vec![5.0; 20];
        at_guard[14] = 500.0;
        at_guard[15] = 6.0;
        let (out, replacements) = replace_outliers(&at_guard, &OutlierConfig::default());
        assert!(replacements.is_empty());
        assert_eq!(out[14], 500.0);

        // Baseline above the guard: the same spike is replaced with the
        // neighbor average.
        let mut above_guard = vec![6.0; 20];
        above_guard[14] = 500.0;
        above_guard[15] = 7.0;
        let (out, replacements) = replace_outliers(&above_guard, &OutlierConfig::default());
        assert_eq!(replacements.len(), 1);
        assert_eq!(out[14], (6.0 + 7.0) / 2.0);
    }

    #[test]
    fn window_must_fill_before_evaluation() {
        // Spike inside the first window is never evaluated.
        let mut values = vec![50.0; 20];
        values[5] = 5000.0;
        let config = OutlierConfig::default();
        let (out, replacements) = replace_outliers(&values, &config);
        assert!(replacements.is_empty());
        assert_eq!(out[5], 5000.0);
    }

    #[test]
    fn second_pass_is_idempotent() {
        // Spikes more than a full window apart, so each sees a clean baseline.
        let mut values = vec![50.0; 52];
        values[20] = 5000.0;
        values[36] = 4000.0;
        let config = OutlierConfig::default();
        let (once, first) = replace_outliers(&values, &config);
        assert_eq!(first.len(), 2);
        let (twice, second) = replace_outliers(&once, &config);
        assert!(second.is_empty());
        assert_eq!(twice, once);
    }

    #[test]
    fn short_series_untouched() {
        let values = vec![1.0, 2.0, 3.0];
        let (out, replacements) = replace_outliers(&values, &OutlierConfig::default());
        assert_eq!(out, values);
        assert!(replacements.is_empty());
    }

    #[test]
    fn config_validation() {
        assert!(OutlierConfig::default().validate().is_ok());
        let bad_window = OutlierConfig {
            lookback_window: 0,
            ..Default::default()
        };
        assert!(bad_window.validate().is_err());
        let bad_z = OutlierConfig {
            z_threshold: 0.0,
            ..Default::default()
        };
        assert!(bad_z.validate().is_err());
    }
}
