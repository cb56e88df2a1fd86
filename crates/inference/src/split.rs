//! Sample-splitting estimator for the selected arm.
//!
//! Units are partitioned into a selection set (supplied by the caller) and
//! its complement. The best arm is chosen on the selection set and its mean
//! is estimated, with a normal-approximation test against zero, on the
//! estimation set only.

use best_arm_core::stats::{self, two_sided_p_value, VarianceEstimator, Z_975};
use best_arm_core::{InferenceError, Result};
use serde::{Deserialize, Serialize};

use crate::selector::ArmSelector;

/// Estimate of the selected arm's mean on the estimation set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitEstimate {
    /// Arm chosen on the selection set.
    pub best_arm: usize,
    /// Estimation-set observations of `best_arm`.
    pub estimation_count: usize,
    /// Sample mean of those observations.
    pub mean: f64,
    /// Standard error of `mean`.
    pub standard_error: f64,
    /// `mean / standard_error`.
    pub t_statistic: f64,
    /// Two-sided 95% normal interval.
    pub confidence_interval: (f64, f64),
    /// Two-sided normal p-value for H0: mean = 0.
    pub p_value: f64,
}

impl SplitEstimate {
    /// Returns true if the interval excludes zero.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        self.confidence_interval.0 > 0.0 || self.confidence_interval.1 < 0.0
    }
}

/// Boolean membership mask of `selection` over `0..n`.
///
/// # Errors
/// Returns [`InferenceError::InvalidSelection`] for out-of-range or duplicate
/// indices, an empty selection, or a selection that leaves no estimation
/// units.
pub fn selection_mask(n: usize, selection: &[usize]) -> Result<Vec<bool>> {
    if selection.is_empty() {
        return Err(InferenceError::InvalidSelection {
            reason: "selection set is empty".to_string(),
        });
    }
    if selection.len() >= n {
        return Err(InferenceError::InvalidSelection {
            reason: format!(
                "selection of {} units leaves no estimation units out of {n}",
                selection.len()
            ),
        });
    }

    let mut mask = vec![false; n];
    for &i in selection {
        match mask.get_mut(i) {
            Some(slot) if *slot => {
                return Err(InferenceError::InvalidSelection {
                    reason: format!("index {i} appears more than once"),
                })
            }
            Some(slot) => *slot = true,
            None => {
                return Err(InferenceError::InvalidSelection {
                    reason: format!("index {i} is out of range for {n} units"),
                })
            }
        }
    }
    Ok(mask)
}

/// Indices not in the selection mask, in increasing order.
#[must_use]
pub fn estimation_indices(mask: &[bool]) -> Vec<usize> {
    mask.iter()
        .enumerate()
        .filter(|&(_, &selected)| !selected)
        .map(|(i, _)| i)
        .collect()
}

/// Selects on one part of the sample and estimates on the other.
#[derive(Debug, Clone, Copy)]
pub struct SplitEstimator {
    selector: ArmSelector,
    variance_estimator: VarianceEstimator,
}

impl SplitEstimator {
    /// Creates an estimator over arms `0..n_arms`.
    #[must_use]
    pub fn new(n_arms: usize) -> Self {
        Self {
            selector: ArmSelector::new(n_arms),
            variance_estimator: VarianceEstimator::default(),
        }
    }

    /// Sets the variance estimator used for the standard error.
    #[must_use]
    pub fn with_variance_estimator(mut self, estimator: VarianceEstimator) -> Self {
        self.variance_estimator = estimator;
        self
    }

    #[must_use]
    pub fn variance_estimator(&self) -> VarianceEstimator {
        self.variance_estimator
    }

    /// Runs one split.
    ///
    /// # Errors
    /// - [`InferenceError::LengthMismatch`] if `outcomes` and `arms` differ
    ///   in length.
    /// - [`InferenceError::InvalidSelection`] if `selection` is malformed.
    /// - [`InferenceError::InsufficientEstimationData`] if the selected arm
    ///   has fewer than two estimation observations.
    /// - [`InferenceError::ZeroStandardError`] if those observations are all
    ///   equal.
    pub fn estimate(
        &self,
        outcomes: &[f64],
        arms: &[usize],
        selection: &[usize],
    ) -> Result<SplitEstimate> {
        let n = outcomes.len();
        if arms.len() != n {
            return Err(InferenceError::LengthMismatch {
                outcomes: n,
                arms: arms.len(),
            });
        }

        let mask = selection_mask(n, selection)?;
        let best_arm = self
            .selector
            .select_from(outcomes, arms, selection.iter().copied())?;

        let values: Vec<f64> = estimation_indices(&mask)
            .into_iter()
            .filter(|&i| arms[i] == best_arm)
            .map(|i| outcomes[i])
            .collect();
        let count = values.len();
        if count < 2 {
            return Err(InferenceError::InsufficientEstimationData {
                arm: best_arm,
                count,
            });
        }

        let mean = stats::mean(&values).ok_or(InferenceError::InsufficientEstimationData {
            arm: best_arm,
            count,
        })?;
        let variance = stats::variance(&values, mean, self.variance_estimator).ok_or(
            InferenceError::InsufficientEstimationData {
                arm: best_arm,
                count,
            },
        )?;

        let standard_error = (variance / count as f64).sqrt();
        if !(standard_error > 0.0 && standard_error.is_finite()) {
            return Err(InferenceError::ZeroStandardError {
                arm: best_arm,
                count,
            });
        }

        let t_statistic = mean / standard_error;
        let half_width = Z_975 * standard_error;

        Ok(SplitEstimate {
            best_arm,
            estimation_count: count,
            mean,
            standard_error,
            t_statistic,
            confidence_interval: (mean - half_width, mean + half_width),
            p_value: two_sided_p_value(t_statistic),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // Partitioning
    // ============================================

    #[test]
    fn mask_marks_selected_units() {
        let mask = selection_mask(5, &[3, 0]).unwrap();
        assert_eq!(mask, vec![true, false, false, true, false]);
        assert_eq!(estimation_indices(&mask), vec![1, 2, 4]);
    }

    #[test]
    fn complement_order_is_independent_of_selection_order() {
        let a = estimation_indices(&selection_mask(8, &[6, 1, 4]).unwrap());
        let b = estimation_indices(&selection_mask(8, &[4, 6, 1]).unwrap());
        assert_eq!(a, b);
        assert_eq!(a, vec![0, 2, 3, 5, 7]);
    }

    #[test]
    fn mask_rejects_malformed_selections() {
        assert!(selection_mask(4, &[]).is_err());
        assert!(selection_mask(4, &[0, 1, 2, 3]).is_err());
        assert!(selection_mask(4, &[1, 1]).is_err());
        assert!(selection_mask(4, &[4]).is_err());
    }

    // ============================================
    // Estimation
    // ============================================

    fn two_arm_fixture() -> (Vec<f64>, Vec<usize>) {
        // Units 0..4 form the selection set; arm 1 clearly wins there.
        let outcomes = vec![0.0, 0.1, 2.0, 2.2, 0.5, 1.0, 2.0, 3.0, 0.3, 0.7];
        let arms = vec![0, 0, 1, 1, 0, 1, 1, 1, 0, 0];
        (outcomes, arms)
    }

    #[test]
    fn estimates_selected_arm_on_estimation_set() {
        let (outcomes, arms) = two_arm_fixture();
        let estimate = SplitEstimator::new(2)
            .estimate(&outcomes, &arms, &[0, 1, 2, 3])
            .unwrap();

        assert_eq!(estimate.best_arm, 1);
        assert_eq!(estimate.estimation_count, 3);
        // Estimation outcomes for arm 1: 1.0, 2.0, 3.0
        assert!((estimate.mean - 2.0).abs() < 1e-12);

        // Population variance 2/3, se = sqrt(2/9)
        let expected_se = (2.0_f64 / 9.0).sqrt();
        assert!((estimate.standard_error - expected_se).abs() < 1e-12);
        assert!((estimate.t_statistic - 2.0 / expected_se).abs() < 1e-9);

        let (lower, upper) = estimate.confidence_interval;
        assert!((lower - (2.0 - 1.959_964 * expected_se)).abs() < 1e-12);
        assert!((upper - (2.0 + 1.959_964 * expected_se)).abs() < 1e-12);
        assert!(estimate.is_significant());
        assert!(estimate.p_value < 0.001, "p was {}", estimate.p_value);
    }

    #[test]
    fn unbiased_variance_widens_standard_error() {
        let (outcomes, arms) = two_arm_fixture();
        let estimate = SplitEstimator::new(2)
            .with_variance_estimator(VarianceEstimator::Unbiased)
            .estimate(&outcomes, &arms, &[0, 1, 2, 3])
            .unwrap();

        // Unbiased variance 1.0, se = sqrt(1/3)
        assert!((estimate.standard_error - (1.0_f64 / 3.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn p_value_is_large_for_centered_arm() {
        let outcomes = vec![5.0, 4.0, -1.0, 1.0, 0.0, 2.0, 0.0, 0.0];
        let arms = vec![0, 1, 0, 0, 0, 1, 1, 1];
        let estimate = SplitEstimator::new(2)
            .estimate(&outcomes, &arms, &[0, 1])
            .unwrap();

        assert_eq!(estimate.best_arm, 0);
        assert!(estimate.mean.abs() < 1e-12);
        assert!((estimate.p_value - 1.0).abs() < 1e-6);
        assert!(!estimate.is_significant());
    }

    #[test]
    fn single_estimation_observation_is_degenerate() {
        // Arm 0 wins the selection set {0, 1, 3, 4} but has only unit 2 left.
        let outcomes = vec![10.0, 10.0, 7.0, 0.0, 0.0, 5.0];
        let arms = vec![0, 0, 0, 1, 1, 1];
        let err = SplitEstimator::new(2)
            .estimate(&outcomes, &arms, &[0, 1, 3, 4])
            .unwrap_err();

        assert_eq!(
            err,
            InferenceError::InsufficientEstimationData { arm: 0, count: 1 }
        );
        assert!(err.is_degenerate_trial());
    }

    #[test]
    fn no_estimation_observation_is_degenerate() {
        let outcomes = vec![10.0, 10.0, 0.0, 0.0, 0.0];
        let arms = vec![0, 0, 1, 1, 1];
        let err = SplitEstimator::new(2)
            .estimate(&outcomes, &arms, &[0, 1, 2])
            .unwrap_err();

        assert_eq!(
            err,
            InferenceError::InsufficientEstimationData { arm: 0, count: 0 }
        );
    }

    #[test]
    fn constant_estimation_outcomes_are_degenerate() {
        let outcomes = vec![3.0, 0.0, 1.0, 1.0, 0.0, 0.0];
        let arms = vec![0, 1, 0, 0, 1, 1];
        let err = SplitEstimator::new(2)
            .estimate(&outcomes, &arms, &[0, 1])
            .unwrap_err();

        assert_eq!(err, InferenceError::ZeroStandardError { arm: 0, count: 2 });
    }

    #[test]
    fn phantom_arm_in_selection_is_skipped() {
        // Selection set only contains arm 1, so arm 1 is selected even
        // though arm 0 has the larger overall mean.
        let outcomes = vec![-1.0, -2.0, 9.0, 8.0, -1.5, -0.5];
        let arms = vec![1, 1, 0, 0, 1, 1];
        let estimate = SplitEstimator::new(2)
            .estimate(&outcomes, &arms, &[0, 1])
            .unwrap();
        assert_eq!(estimate.best_arm, 1);
        assert_eq!(estimate.estimation_count, 2);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = SplitEstimator::new(2)
            .estimate(&[1.0, 2.0, 3.0], &[0, 1], &[0])
            .unwrap_err();
        assert!(matches!(err, InferenceError::LengthMismatch { .. }));
    }
}
