//! Residual decomposition under the sharp null.
//!
//! Under H0 the empirically best arm's true mean equals the null value and
//! every other arm's mean equals its observed mean. The decomposition keeps
//! those null-implied means and the residuals needed to rebuild synthetic
//! outcomes consistent with H0.

use best_arm_core::{InferenceError, Observations, ResidualBasis, Result};
use serde::{Deserialize, Serialize};

use crate::selector::{arm_means, argmax_lowest};

/// Null-implied means and residuals, computed once per dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualDecomposition {
    /// Per-arm means with the winning arm replaced by the null value.
    pub arm_means: Vec<f64>,
    /// Per-arm observed means.
    pub observed_means: Vec<f64>,
    /// Arm whose mean was replaced.
    pub nulled_arm: usize,
    /// Per-unit residuals against the means named by `basis`.
    pub residuals: Vec<f64>,
    /// Means the residuals were taken against.
    pub basis: ResidualBasis,
}

impl ResidualDecomposition {
    /// The per-arm means that `residuals` are relative to.
    #[must_use]
    pub fn basis_means(&self) -> &[f64] {
        match self.basis {
            ResidualBasis::Nulled => &self.arm_means,
            ResidualBasis::Observed => &self.observed_means,
        }
    }

    /// Rebuilds `basis_means[arms[i]] + residuals[i]` for every unit.
    ///
    /// # Panics
    /// Panics if a label in `arms` has no entry in [`Self::basis_means`].
    #[must_use]
    pub fn reconstruct(&self, arms: &[usize]) -> Vec<f64> {
        let means = self.basis_means();
        arms.iter()
            .zip(&self.residuals)
            .map(|(&arm, &eps)| means[arm] + eps)
            .collect()
    }
}

/// Computes [`ResidualDecomposition`]s for a fixed null value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualModel {
    null_value: f64,
    basis: ResidualBasis,
}

impl ResidualModel {
    #[must_use]
    pub fn new(null_value: f64) -> Self {
        Self {
            null_value,
            basis: ResidualBasis::default(),
        }
    }

    #[must_use]
    pub fn with_basis(mut self, basis: ResidualBasis) -> Self {
        self.basis = basis;
        self
    }

    /// Decomposes the observed outcomes.
    ///
    /// # Errors
    /// Returns [`InferenceError::NonFiniteParameter`] for a non-finite null
    /// value. Arm-support failures cannot occur for a validated
    /// [`Observations`] but are still reported rather than assumed away.
    pub fn decompose(&self, observations: &Observations) -> Result<ResidualDecomposition> {
        if !self.null_value.is_finite() {
            return Err(InferenceError::NonFiniteParameter {
                name: "null_value",
                value: self.null_value,
            });
        }

        let outcomes = observations.outcomes();
        let arms = observations.arms();
        let n_arms = observations.n_arms();

        let means = arm_means(outcomes, arms, n_arms, 0..outcomes.len());
        let nulled_arm = argmax_lowest(&means).ok_or(InferenceError::EmptyObservations)?;

        let observed_means = means
            .iter()
            .enumerate()
            .map(|(arm, mean)| {
                mean.ok_or_else(|| InferenceError::InvalidArmSupport {
                    n_arms,
                    missing: vec![arm],
                    unexpected: Vec::new(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut arm_means = observed_means.clone();
        arm_means[nulled_arm] = self.null_value;

        let basis_means = match self.basis {
            ResidualBasis::Nulled => &arm_means,
            ResidualBasis::Observed => &observed_means,
        };
        let residuals = outcomes
            .iter()
            .zip(arms)
            .map(|(&y, &arm)| y - basis_means[arm])
            .collect();

        Ok(ResidualDecomposition {
            arm_means,
            observed_means,
            nulled_arm,
            residuals,
            basis: self.basis,
        })
    }
}
