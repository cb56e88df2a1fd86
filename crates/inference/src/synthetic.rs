//! Synthetic balanced designs with normal potential outcomes.
//!
//! Every unit has one potential outcome per arm, drawn from that arm's normal
//! distribution. Arms are assigned by shuffling an equal number of labels per
//! arm, and only the outcome under the assigned arm is revealed.
//!
//! # Example
//!
//! ```
//! use best_arm_inference::SyntheticDesign;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let design = SyntheticDesign::new(100, vec![0.0, 0.5], vec![1.0, 1.0]).unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//! let observations = design.generate(&mut rng).unwrap();
//! assert_eq!(observations.arm_counts(), vec![50, 50]);
//! ```

use best_arm_core::{DesignSettings, InferenceError, Observations, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// A balanced k-arm design with normal outcomes.
///
/// Deserialization is validated by [`SyntheticDesign::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDesign")]
pub struct SyntheticDesign {
    n_samples: usize,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl SyntheticDesign {
    /// Creates a design; the arm count is `means.len()`.
    ///
    /// # Errors
    /// Returns [`InferenceError::InvalidDesign`] if there are no arms, the
    /// variance count differs from the mean count, `n_samples` is zero or not
    /// divisible by the arm count, or a mean or variance is not a finite
    /// number (variances must also be non-negative).
    pub fn new(n_samples: usize, means: Vec<f64>, variances: Vec<f64>) -> Result<Self> {
        let n_arms = means.len();
        if n_arms == 0 {
            return Err(invalid("at least one arm is required"));
        }
        if variances.len() != n_arms {
            return Err(invalid(format!(
                "{} variances given for {n_arms} arms",
                variances.len()
            )));
        }
        if n_samples == 0 || n_samples % n_arms != 0 {
            return Err(invalid(format!(
                "{n_samples} samples cannot be split evenly across {n_arms} arms"
            )));
        }
        if let Some(mean) = means.iter().find(|m| !m.is_finite()) {
            return Err(invalid(format!("mean {mean} is not finite")));
        }
        if let Some(variance) = variances.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
            return Err(invalid(format!(
                "variance {variance} must be finite and non-negative"
            )));
        }

        Ok(Self {
            n_samples,
            means,
            variances,
        })
    }

    /// Builds a design from configuration.
    ///
    /// # Errors
    /// Same conditions as [`SyntheticDesign::new`].
    pub fn from_settings(settings: &DesignSettings) -> Result<Self> {
        Self::new(
            settings.samples,
            settings.means.clone(),
            settings.variances.clone(),
        )
    }

    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    #[must_use]
    pub fn n_arms(&self) -> usize {
        self.means.len()
    }

    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    #[must_use]
    pub fn variances(&self) -> &[f64] {
        &self.variances
    }

    /// Balanced arm labels in random order.
    pub fn assign_arms<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        let per_arm = self.n_samples / self.n_arms();
        let mut arms: Vec<usize> = (0..self.n_arms())
            .flat_map(|arm| std::iter::repeat(arm).take(per_arm))
            .collect();
        arms.shuffle(rng);
        arms
    }

    /// Potential outcomes, one column per arm: `potentials[arm][unit]`.
    ///
    /// # Errors
    /// Returns [`InferenceError::InvalidDesign`] if a normal distribution
    /// cannot be built.
    pub fn potential_outcomes<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Vec<f64>>> {
        self.means
            .iter()
            .zip(&self.variances)
            .map(|(&mean, &variance)| {
                let normal = Normal::new(mean, variance.sqrt())
                    .map_err(|e| invalid(format!("normal({mean}, {variance}): {e}")))?;
                let column: Vec<f64> = (0..self.n_samples).map(|_| normal.sample(rng)).collect();
                Ok(column)
            })
            .collect()
    }

    /// Draws one observed dataset.
    ///
    /// # Errors
    /// Returns [`InferenceError::InvalidDesign`] if a distribution cannot be
    /// built; the resulting observations always satisfy their invariants.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Observations> {
        let potentials = self.potential_outcomes(rng)?;
        let arms = self.assign_arms(rng);
        let outcomes = arms
            .iter()
            .enumerate()
            .map(|(unit, &arm)| potentials[arm][unit])
            .collect();
        Observations::with_arm_count(outcomes, arms, self.n_arms())
    }
}

#[derive(Deserialize)]
struct RawDesign {
    n_samples: usize,
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl TryFrom<RawDesign> for SyntheticDesign {
    type Error = InferenceError;

    fn try_from(raw: RawDesign) -> Result<Self> {
        Self::new(raw.n_samples, raw.means, raw.variances)
    }
}

fn invalid(reason: impl Into<String>) -> InferenceError {
    InferenceError::InvalidDesign {
        reason: reason.into(),
    }
}
