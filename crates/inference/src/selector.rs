//! Empirical best-arm selection.
//!
//! The selected arm is the one with the strictly largest mean among the arms
//! present in the subset. Arms are scanned in increasing label order and a
//! later arm only replaces the incumbent when its mean is strictly greater, so
//! ties go to the lowest label. Arms with no units in the subset have no mean
//! and can never be selected.

use best_arm_core::{InferenceError, Result};

/// Per-arm sample means over the units yielded by `indices`.
///
/// Entry `a` is `None` when no yielded unit belongs to arm `a`. Labels at or
/// above `n_arms` are ignored.
///
/// # Panics
/// Panics if a yielded index is out of bounds for `arms` or `outcomes`.
#[must_use]
pub fn arm_means<I>(outcomes: &[f64], arms: &[usize], n_arms: usize, indices: I) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = usize>,
{
    let mut sums = vec![0.0_f64; n_arms];
    let mut counts = vec![0_usize; n_arms];

    for i in indices {
        let arm = arms[i];
        if arm < n_arms {
            sums[arm] += outcomes[i];
            counts[arm] += 1;
        }
    }

    sums.iter()
        .zip(&counts)
        .map(|(&sum, &count)| (count > 0).then(|| sum / count as f64))
        .collect()
}

/// Index of the largest defined mean, lowest index on ties.
#[must_use]
pub fn argmax_lowest(means: &[Option<f64>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (arm, mean) in means.iter().enumerate() {
        let Some(mean) = *mean else { continue };
        match best {
            Some((_, best_mean)) if mean > best_mean => best = Some((arm, mean)),
            None => best = Some((arm, mean)),
            _ => {}
        }
    }
    best.map(|(arm, _)| arm)
}

/// Picks the empirically best arm of a subset of units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmSelector {
    n_arms: usize,
}

impl ArmSelector {
    /// Creates a selector over arms `0..n_arms`.
    #[must_use]
    pub fn new(n_arms: usize) -> Self {
        Self { n_arms }
    }

    /// Number of arms considered.
    #[must_use]
    pub fn n_arms(&self) -> usize {
        self.n_arms
    }

    /// Selects the best arm of an already-extracted subset.
    ///
    /// # Errors
    /// Returns [`InferenceError::EmptySelection`] if the subset holds no
    /// unit of any known arm.
    pub fn select(&self, outcomes: &[f64], arms: &[usize]) -> Result<usize> {
        let len = outcomes.len().min(arms.len());
        self.select_from(outcomes, arms, 0..len)
    }

    /// Selects the best arm among the units yielded by `indices`, without
    /// materialising the subset.
    ///
    /// # Errors
    /// Returns [`InferenceError::EmptySelection`] if no yielded unit belongs
    /// to a known arm.
    ///
    /// # Panics
    /// Panics if a yielded index is out of bounds for `arms` or `outcomes`.
    pub fn select_from<I>(&self, outcomes: &[f64], arms: &[usize], indices: I) -> Result<usize>
    where
        I: IntoIterator<Item = usize>,
    {
        let means = arm_means(outcomes, arms, self.n_arms, indices);
        argmax_lowest(&means).ok_or(InferenceError::EmptySelection)
    }
}
