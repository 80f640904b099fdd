//! Sequential Bayesian filter over the R grid.
//!
//! # Model
//!
//! **Observation**: with yesterday's smoothed count k_{t-1} and serial
//! period τ, a candidate R implies today's expected count
//!
//! ```text
//! λ(R) = k_{t-1} · exp((R − 1) / τ)
//! ```
//!
//! and today's count k_t is scored with a Poisson(λ(R)) likelihood at every
//! grid point.
//!
//! **Process**: R_t follows a random walk; the day-to-day transition kernel
//! is a Gaussian of width `process_sigma` centered at each grid value,
//! discretized over the grid and column-normalized.
//!
//! **Recurrence**: yesterday's posterior propagates through the kernel to
//! form today's prior, which is multiplied elementwise by today's likelihood
//! and renormalized. A normalizing constant of exactly zero means every
//! candidate R is inconsistent with the observed jump (the smoothed series
//! passed through zero); the filter restarts from a fresh Gamma prior for
//! that day instead of letting NaN propagate through the rest of the series.
//! The restart carries a one-time bias while the posterior restabilizes.

use crate::inference::grid::RGrid;
use crate::series::SmoothedSeries;
use chrono::NaiveDate;
use rt_math::{gamma_pdf, normal_pdf, normalize_in_place, poisson_pmf};
use thiserror::Error;
use tracing::debug;

/// Shape of the initial Gamma prior (mode at shape − 1).
const INITIAL_PRIOR_SHAPE: f64 = 2.5;

/// Shape of the prior used to restart after a degenerate day.
const REINIT_PRIOR_SHAPE: f64 = 2.0;

/// Errors from posterior computation.
#[derive(Debug, Error)]
pub enum PosteriorError {
    #[error("invalid serial period: {0} (must be > 0)")]
    InvalidSerialPeriod(f64),

    #[error("invalid process sigma: {0} (must be > 0)")]
    InvalidProcessSigma(f64),

    #[error("prior has no mass on the grid")]
    DegeneratePrior,
}

/// Posterior distributions over the R grid, one per date after the first.
///
/// The first smoothed date only seeds the prior and has no posterior.
#[derive(Debug, Clone)]
pub struct PosteriorSet {
    pub dates: Vec<NaiveDate>,
    pub distributions: Vec<Vec<f64>>,
    /// Accumulated log of the per-day normalizing constants; degenerate
    /// days contribute nothing.
    pub log_likelihood: f64,
    /// Indices (into `dates`) where the filter restarted.
    pub reinitialized_days: Vec<usize>,
}

impl PosteriorSet {
    pub fn len(&self) -> usize {
        self.distributions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distributions.is_empty()
    }

    /// MAP estimate per day: the grid value with the most posterior mass.
    /// Ties resolve to the lowest grid value.
    pub fn map_estimates(&self, grid: &RGrid) -> Vec<f64> {
        self.distributions
            .iter()
            .map(|dist| {
                let mut best = 0usize;
                for (i, &mass) in dist.iter().enumerate() {
                    if mass > dist[best] {
                        best = i;
                    }
                }
                grid.value_at(best)
            })
            .collect()
    }
}

/// Run the filter over a smoothed series.
///
/// Returns `Ok(None)` for a series with fewer than two points: that
/// observation kind is unavailable, not an error.
pub fn compute_posteriors(
    series: &SmoothedSeries,
    grid: &RGrid,
    serial_period: f64,
    process_sigma: f64,
) -> Result<Option<PosteriorSet>, PosteriorError> {
    if !(serial_period > 0.0) || !serial_period.is_finite() {
        return Err(PosteriorError::InvalidSerialPeriod(serial_period));
    }
    if !(process_sigma > 0.0) || !process_sigma.is_finite() {
        return Err(PosteriorError::InvalidProcessSigma(process_sigma));
    }
    if series.len() < 2 {
        return Ok(None);
    }

    let r = grid.values();
    let transition = transition_matrix(r, process_sigma);
    let initial_prior = gamma_prior(r, INITIAL_PRIOR_SHAPE)?;
    let reinit_prior = gamma_prior(r, REINIT_PRIOR_SHAPE)?;

    let mut current = initial_prior;
    let mut dates = Vec::with_capacity(series.len() - 1);
    let mut distributions = Vec::with_capacity(series.len() - 1);
    let mut log_likelihood = 0.0;
    let mut reinitialized_days = Vec::new();

    for t in 1..series.len() {
        let prev_count = series.values[t - 1];
        let count = series.values[t];

        // Propagate yesterday's posterior through the random-walk kernel.
        let mut posterior: Vec<f64> = (0..r.len())
            .map(|i| {
                let mut mass = 0.0;
                for (j, &p) in current.iter().enumerate() {
                    mass += transition[i][j] * p;
                }
                mass
            })
            .collect();

        // Multiply in today's Poisson likelihood.
        for (i, &r_value) in r.iter().enumerate() {
            let lambda = prev_count * ((r_value - 1.0) / serial_period).exp();
            posterior[i] *= poisson_pmf(count, lambda);
        }

        let z = normalize_in_place(&mut posterior);
        if z == 0.0 {
            // Every candidate R is inconsistent with the observed jump.
            // Restart rather than poisoning the rest of the series with NaN.
            debug!(day = t, count, prev_count, "degenerate posterior, reinitializing");
            posterior.copy_from_slice(&reinit_prior);
            reinitialized_days.push(distributions.len());
        } else {
            log_likelihood += z.ln();
        }

        dates.push(series.dates[t]);
        current.copy_from_slice(&posterior);
        distributions.push(posterior);
    }

    Ok(Some(PosteriorSet {
        dates,
        distributions,
        log_likelihood,
        reinitialized_days,
    }))
}

/// Gamma(shape, 1) prior discretized over the grid and normalized.
fn gamma_prior(r: &[f64], shape: f64) -> Result<Vec<f64>, PosteriorError> {
    let mut prior: Vec<f64> = r.iter().map(|&v| gamma_pdf(v, shape, 1.0)).collect();
    let total = normalize_in_place(&mut prior);
    if total > 0.0 && total.is_finite() {
        Ok(prior)
    } else {
        Err(PosteriorError::DegeneratePrior)
    }
}

/// Gaussian transition kernel discretized over the grid.
///
/// Entry [i][j] is the probability of moving from grid value j to grid
/// value i; each "from" column sums to 1.
fn transition_matrix(r: &[f64], sigma: f64) -> Vec<Vec<f64>> {
    let n = r.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for j in 0..n {
        let mut column_total = 0.0;
        for (i, row) in matrix.iter_mut().enumerate() {
            let density = normal_pdf(r[i], r[j], sigma);
            row[j] = density;
            column_total += density;
        }
        if column_total > 0.0 {
            for row in matrix.iter_mut() {
                row[j] /= column_total;
            }
        }
    }
    matrix
}
