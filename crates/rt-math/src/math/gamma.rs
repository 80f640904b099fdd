//! Gamma distribution density, used for the R_t priors.
//!
//! # Parameterization
//!
//! Uses **rate parameterization**: `Gamma(α, β)` where:
//! - `α` = shape parameter (α > 0)
//! - `β` = rate parameter (β > 0)
//!
//! The density is: `f(t) = β^α / Γ(α) * t^(α-1) * e^(-βt)`
//!
//! This is equivalent to scale parameterization with `θ = 1/β`.

use super::stable::log_gamma;

/// Log of the Gamma distribution PDF at t.
///
/// # Arguments
/// * `t` - The value at which to evaluate (t >= 0)
/// * `alpha` - Shape parameter (α > 0)
/// * `beta` - Rate parameter (β > 0)
pub fn gamma_log_pdf(t: f64, alpha: f64, beta: f64) -> f64 {
    if t.is_nan() || alpha.is_nan() || beta.is_nan() {
        return f64::NAN;
    }
    if alpha <= 0.0 || beta <= 0.0 {
        return f64::NAN;
    }
    if t < 0.0 {
        return f64::NEG_INFINITY;
    }
    if t == 0.0 {
        if alpha < 1.0 {
            // Density diverges to +∞
            return f64::INFINITY;
        } else if alpha == 1.0 {
            // Exponential case: f(0) = β
            return beta.ln();
        } else {
            return f64::NEG_INFINITY;
        }
    }

    // log f(t) = α*log(β) - log(Γ(α)) + (α-1)*log(t) - β*t
    alpha * beta.ln() - log_gamma(alpha) + (alpha - 1.0) * t.ln() - beta * t
}

/// Gamma distribution PDF at t.
///
/// Returns `exp(gamma_log_pdf(t, alpha, beta))` with proper handling of
/// boundary cases.
pub fn gamma_pdf(t: f64, alpha: f64, beta: f64) -> f64 {
    let log_pdf = gamma_log_pdf(t, alpha, beta);
    if log_pdf.is_nan() {
        return f64::NAN;
    }
    if log_pdf == f64::INFINITY {
        return f64::INFINITY;
    }
    if log_pdf == f64::NEG_INFINITY {
        return 0.0;
    }
    log_pdf.exp()
}

/// Mode of Gamma(α, β): (α - 1) / β for α >= 1.
pub fn gamma_mode(alpha: f64, beta: f64) -> Option<f64> {
    if alpha < 1.0 || beta <= 0.0 {
        return None;
    }
    Some((alpha - 1.0) / beta)
}
