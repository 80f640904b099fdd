//! Property-based tests for rt-math numerical functions.
//!
//! Uses proptest to verify mathematical properties hold across many random inputs.

use proptest::prelude::*;
use rt_math::{
    gamma_log_pdf, gamma_pdf, gaussian_window, log_gamma, log_sum_exp, normal_pdf,
    normalize_in_place, poisson_log_pmf, poisson_pmf,
};

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-10;

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    if a.is_nan() && b.is_nan() {
        return true;
    }
    if a.is_nan() || b.is_nan() {
        return false;
    }
    if a.is_infinite() && b.is_infinite() {
        return a.signum() == b.signum();
    }
    if a.is_infinite() || b.is_infinite() {
        return false;
    }
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// log_sum_exp is commutative: order doesn't matter.
    #[test]
    fn log_sum_exp_commutative(a in -100.0..100.0f64, b in -100.0..100.0f64) {
        let ab = log_sum_exp(&[a, b]);
        let ba = log_sum_exp(&[b, a]);
        prop_assert!(approx_eq(ab, ba, TOL));
    }

    /// log_sum_exp result is never below the max input.
    #[test]
    fn log_sum_exp_bounded_below(values in prop::collection::vec(-200.0..200.0f64, 1..20)) {
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let result = log_sum_exp(&values);
        prop_assert!(result >= max - TOL);
        prop_assert!(result <= max + (values.len() as f64).ln() + TOL);
    }

    /// log_gamma satisfies the recurrence Γ(z+1) = z·Γ(z).
    #[test]
    fn log_gamma_recurrence(z in 0.5..50.0f64) {
        let lhs = log_gamma(z + 1.0);
        let rhs = z.ln() + log_gamma(z);
        prop_assert!(approx_eq(lhs, rhs, 1e-8));
    }

    /// Poisson pmf is a valid probability for any positive rate.
    #[test]
    fn poisson_pmf_in_unit_interval(k in 0u64..500, mu in 1e-6..500.0f64) {
        let p = poisson_pmf(k as f64, mu);
        prop_assert!(p >= 0.0);
        prop_assert!(p <= 1.0 + TOL);
    }

    /// Poisson log pmf peaks near k = μ.
    #[test]
    fn poisson_log_pmf_peaks_near_rate(mu in 5.0..200.0f64) {
        let at_rate = poisson_log_pmf(mu.round(), mu);
        let far = poisson_log_pmf(mu.round() + 10.0 * mu.sqrt(), mu);
        prop_assert!(at_rate > far);
    }

    /// Gamma density is non-negative on its domain.
    #[test]
    fn gamma_pdf_non_negative(t in 0.0..100.0f64, alpha in 0.1..20.0f64, beta in 0.1..10.0f64) {
        let p = gamma_pdf(t, alpha, beta);
        prop_assert!(p.is_nan() || p >= 0.0);
    }

    /// Gamma log pdf agrees with pdf through exp on interior points.
    #[test]
    fn gamma_log_pdf_consistent(t in 0.01..100.0f64, alpha in 0.5..20.0f64, beta in 0.1..10.0f64) {
        let log_p = gamma_log_pdf(t, alpha, beta);
        let p = gamma_pdf(t, alpha, beta);
        prop_assert!(approx_eq(log_p.exp(), p, 1e-9));
    }

    /// Normal pdf integrates to ~1 over a wide grid (trapezoid check).
    #[test]
    fn normal_pdf_mass(mu in -5.0..5.0f64, sigma in 0.1..3.0f64) {
        let lo = mu - 8.0 * sigma;
        let hi = mu + 8.0 * sigma;
        let n = 2000;
        let dx = (hi - lo) / n as f64;
        let mass: f64 = (0..=n)
            .map(|i| normal_pdf(lo + i as f64 * dx, mu, sigma) * dx)
            .sum();
        prop_assert!(approx_eq(mass, 1.0, 1e-3));
    }

    /// Normalization produces a unit-sum distribution for positive masses.
    #[test]
    fn normalize_unit_sum(values in prop::collection::vec(1e-6..1e6f64, 1..50)) {
        let mut masses = values.clone();
        let total = normalize_in_place(&mut masses);
        prop_assert!(total > 0.0);
        let sum: f64 = masses.iter().sum();
        prop_assert!(approx_eq(sum, 1.0, 1e-9));
    }

    /// Gaussian window weights are in (0, 1] and symmetric.
    #[test]
    fn gaussian_window_valid(len in 1usize..64, std in 0.5..20.0f64) {
        let w = gaussian_window(len, std);
        prop_assert_eq!(w.len(), len);
        for (k, weight) in w.iter().enumerate() {
            prop_assert!(*weight > 0.0 && *weight <= 1.0);
            prop_assert!(approx_eq(*weight, w[len - 1 - k], TOL));
        }
    }
}
