//! Normal density and discrete Gaussian window weights.
//!
//! The process model discretizes a Gaussian transition kernel over the R
//! grid, and the smoother weights a centered rolling window with a sampled
//! Gaussian bell.

use std::f64::consts::PI;

/// Normal PDF at x for mean μ and standard deviation σ (> 0).
pub fn normal_pdf(x: f64, mu: f64, sigma: f64) -> f64 {
    if x.is_nan() || mu.is_nan() || sigma.is_nan() {
        return f64::NAN;
    }
    if sigma <= 0.0 {
        return f64::NAN;
    }
    let z = (x - mu) / sigma;
    (-0.5 * z * z).exp() / (sigma * (2.0 * PI).sqrt())
}

/// Symmetric Gaussian window of `len` points with standard deviation `std`,
/// centered at (len - 1) / 2.
///
/// Matches the usual signal-processing definition: w[k] =
/// exp(-((k - c)/std)^2 / 2). Weights are unnormalized; callers divide by the
/// sum over whatever subset of the window is in range.
pub fn gaussian_window(len: usize, std: f64) -> Vec<f64> {
    if len == 0 || std <= 0.0 {
        return Vec::new();
    }
    let center = (len as f64 - 1.0) / 2.0;
    (0..len)
        .map(|k| {
            let z = (k as f64 - center) / std;
            (-0.5 * z * z).exp()
        })
        .collect()
}
