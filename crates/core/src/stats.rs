//! Summary statistics and normal-approximation helpers.
//!
//! Provides the sample moments and standard normal tail probabilities used by
//! the split estimator.

use serde::{Deserialize, Serialize};

/// Standard normal 97.5th percentile, used for two-sided 95% intervals.
pub const Z_975: f64 = 1.959_964;

/// Denominator used when estimating a variance from a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceEstimator {
    /// Divide by `n` (maximum-likelihood estimate).
    #[default]
    Population,
    /// Divide by `n - 1` (Bessel-corrected).
    Unbiased,
}

/// Arithmetic mean, or `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance around `mean` using the given estimator.
///
/// Returns `None` when the estimator's denominator would be zero.
#[must_use]
pub fn variance(values: &[f64], mean: f64, estimator: VarianceEstimator) -> Option<f64> {
    let n = values.len();
    let denominator = match estimator {
        VarianceEstimator::Population => n,
        VarianceEstimator::Unbiased => n.checked_sub(1)?,
    };
    if denominator == 0 {
        return None;
    }

    let sum_sq: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    Some(sum_sq / denominator as f64)
}

/// Approximation of the standard normal CDF using the Abramowitz and Stegun
/// formula 26.2.17. Accurate to about 7.5e-8.
#[must_use]
pub fn standard_normal_cdf(x: f64) -> f64 {
    if x < 0.0 {
        return 1.0 - standard_normal_cdf(-x);
    }

    let b1 = 0.319_381_530;
    let b2 = -0.356_563_782;
    let b3 = 1.781_477_937;
    let b4 = -1.821_255_978;
    let b5 = 1.330_274_429;
    let p = 0.231_641_9;

    let t = 1.0 / (1.0 + p * x);
    let poly = t * (b1 + t * (b2 + t * (b3 + t * (b4 + t * b5))));

    let pdf = (-x * x / 2.0).exp() / (2.0 * std::f64::consts::PI).sqrt();
    1.0 - pdf * poly
}

/// Two-sided p-value `2 * (1 - Phi(|z|))`, clamped to `[0, 1]`.
#[must_use]
pub fn two_sided_p_value(z: f64) -> f64 {
    let p = 2.0 * (1.0 - standard_normal_cdf(z.abs()));
    p.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // Moments
    // ============================================

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn mean_of_values() {
        let m = mean(&[1.0, 2.0, 3.0, 6.0]).unwrap();
        assert!((m - 3.0).abs() < 1e-12, "mean was {m}");
    }

    #[test]
    fn population_variance_divides_by_n() {
        let values = [1.0, 2.0, 3.0, 6.0];
        let v = variance(&values, 3.0, VarianceEstimator::Population).unwrap();
        // (4 + 1 + 0 + 9) / 4
        assert!((v - 3.5).abs() < 1e-12, "variance was {v}");
    }

    #[test]
    fn unbiased_variance_divides_by_n_minus_one() {
        let values = [1.0, 2.0, 3.0, 6.0];
        let v = variance(&values, 3.0, VarianceEstimator::Unbiased).unwrap();
        assert!((v - 14.0 / 3.0).abs() < 1e-12, "variance was {v}");
    }

    #[test]
    fn variance_undefined_without_enough_values() {
        assert_eq!(variance(&[], 0.0, VarianceEstimator::Population), None);
        assert_eq!(variance(&[1.0], 1.0, VarianceEstimator::Unbiased), None);
        assert_eq!(
            variance(&[1.0], 1.0, VarianceEstimator::Population),
            Some(0.0)
        );
    }

    // ============================================
    // Normal CDF
    // ============================================

    #[test]
    fn normal_cdf_at_zero_is_half() {
        assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
    }

    #[test]
    fn normal_cdf_at_critical_value_is_975() {
        let cdf = standard_normal_cdf(Z_975);
        assert!((cdf - 0.975).abs() < 1e-6, "cdf was {cdf}");
    }

    #[test]
    fn normal_cdf_symmetry() {
        let pos = standard_normal_cdf(1.3);
        let neg = standard_normal_cdf(-1.3);
        assert!((pos + neg - 1.0).abs() < 1e-12);
    }

    #[test]
    fn normal_cdf_tails() {
        assert!(standard_normal_cdf(6.0) > 0.999_999);
        assert!(standard_normal_cdf(-6.0) < 1e-6);
    }

    #[test]
    fn two_sided_p_value_bounds() {
        assert!((two_sided_p_value(0.0) - 1.0).abs() < 1e-7);
        assert!((two_sided_p_value(Z_975) - 0.05).abs() < 1e-5);
        assert!((two_sided_p_value(-Z_975) - 0.05).abs() < 1e-5);
        let far = two_sided_p_value(40.0);
        assert!((0.0..1e-12).contains(&far), "p was {far}");
    }
}
