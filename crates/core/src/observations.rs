//! Validated outcome / arm-label pairs.

use serde::{Deserialize, Serialize};

use crate::error::{InferenceError, Result};

/// Outcomes and arm assignments of a randomized experiment.
///
/// Invariants, checked on construction:
/// - `outcomes` and `arms` have equal, non-zero length;
/// - every outcome is finite;
/// - the distinct arm labels are exactly `{0, ..., n_arms - 1}`.
///
/// Deserialization goes through [`Observations::with_arm_count`], so a
/// decoded value satisfies the same invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservations")]
pub struct Observations {
    outcomes: Vec<f64>,
    arms: Vec<usize>,
    n_arms: usize,
}

impl Observations {
    /// Builds an observation set, implying the arm count from the number of
    /// distinct labels.
    ///
    /// # Errors
    /// Returns an error if the lengths differ, the input is empty, an outcome
    /// is not finite, or the labels are not exactly `{0, ..., k - 1}`.
    pub fn new(outcomes: Vec<f64>, arms: Vec<usize>) -> Result<Self> {
        let mut labels = arms.clone();
        labels.sort_unstable();
        labels.dedup();
        let n_arms = labels.len();
        Self::with_arm_count(outcomes, arms, n_arms)
    }

    /// Builds an observation set with a declared arm count.
    ///
    /// # Errors
    /// Same conditions as [`Observations::new`], checked against `n_arms`.
    pub fn with_arm_count(outcomes: Vec<f64>, arms: Vec<usize>, n_arms: usize) -> Result<Self> {
        if outcomes.len() != arms.len() {
            return Err(InferenceError::LengthMismatch {
                outcomes: outcomes.len(),
                arms: arms.len(),
            });
        }
        if outcomes.is_empty() {
            return Err(InferenceError::EmptyObservations);
        }
        if let Some((index, &value)) = outcomes.iter().enumerate().find(|(_, y)| !y.is_finite()) {
            return Err(InferenceError::NonFiniteOutcome { index, value });
        }

        validate_arm_support(&arms, n_arms)?;

        Ok(Self {
            outcomes,
            arms,
            n_arms,
        })
    }

    /// Outcome vector Y.
    #[must_use]
    pub fn outcomes(&self) -> &[f64] {
        &self.outcomes
    }

    /// Arm-label vector Z.
    #[must_use]
    pub fn arms(&self) -> &[usize] {
        &self.arms
    }

    /// Number of arms k.
    #[must_use]
    pub fn n_arms(&self) -> usize {
        self.n_arms
    }

    /// Number of units n.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Always false for a constructed set; provided for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Units per arm, indexed by arm label.
    #[must_use]
    pub fn arm_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_arms];
        for &arm in &self.arms {
            counts[arm] += 1;
        }
        counts
    }
}

/// Unvalidated wire form of [`Observations`].
#[derive(Deserialize)]
struct RawObservations {
    outcomes: Vec<f64>,
    arms: Vec<usize>,
    n_arms: usize,
}

impl TryFrom<RawObservations> for Observations {
    type Error = InferenceError;

    fn try_from(raw: RawObservations) -> Result<Self> {
        Self::with_arm_count(raw.outcomes, raw.arms, raw.n_arms)
    }
}

/// Checks that `arms` uses exactly the labels `{0, ..., n_arms - 1}`.
///
/// # Errors
/// Returns [`InferenceError::InvalidArmSupport`] listing missing and
/// out-of-range labels.
pub fn validate_arm_support(arms: &[usize], n_arms: usize) -> Result<()> {
    let mut seen = vec![false; n_arms];
    let mut unexpected: Vec<usize> = Vec::new();

    for &arm in arms {
        match seen.get_mut(arm) {
            Some(flag) => *flag = true,
            None => unexpected.push(arm),
        }
    }
    unexpected.sort_unstable();
    unexpected.dedup();

    let missing: Vec<usize> = seen
        .iter()
        .enumerate()
        .filter(|&(_, &present)| !present)
        .map(|(arm, _)| arm)
        .collect();

    if n_arms == 0 || !missing.is_empty() || !unexpected.is_empty() {
        return Err(InferenceError::InvalidArmSupport {
            n_arms,
            missing,
            unexpected,
        });
    }
    Ok(())
}
