//! Credible intervals from posterior mass functions.
//!
//! Bounds are read off the posterior CDF per day: the lower bound is the
//! grid value whose cumulative mass is closest to (1 − ci), the upper the
//! one closest to ci. Each requested level is computed independently.

use crate::inference::grid::RGrid;
use thiserror::Error;

/// Errors from credible-interval computation.
#[derive(Debug, Error)]
pub enum CredibleError {
    #[error("invalid confidence level: {0} (must be in (0, 1))")]
    InvalidLevel(f64),

    #[error("distribution length {found} does not match grid length {expected}")]
    GridMismatch { found: usize, expected: usize },
}

/// Per-day (low, high) bounds for one confidence level.
pub fn credible_bounds(
    distributions: &[Vec<f64>],
    grid: &RGrid,
    ci: f64,
) -> Result<Vec<(f64, f64)>, CredibleError> {
    if !(ci > 0.0 && ci < 1.0) {
        return Err(CredibleError::InvalidLevel(ci));
    }

    let mut bounds = Vec::with_capacity(distributions.len());
    for dist in distributions {
        if dist.len() != grid.len() {
            return Err(CredibleError::GridMismatch {
                found: dist.len(),
                expected: grid.len(),
            });
        }

        let mut low_idx = 0usize;
        let mut high_idx = 0usize;
        let mut low_gap = f64::INFINITY;
        let mut high_gap = f64::INFINITY;
        let mut cumulative = 0.0;
        for (i, &mass) in dist.iter().enumerate() {
            cumulative += mass;
            let to_low = (cumulative - (1.0 - ci)).abs();
            if to_low < low_gap {
                low_gap = to_low;
                low_idx = i;
            }
            let to_high = (cumulative - ci).abs();
            if to_high < high_gap {
                high_gap = to_high;
                high_idx = i;
            }
        }
        bounds.push((grid.value_at(low_idx), grid.value_at(high_idx)));
    }
    Ok(bounds)
}
