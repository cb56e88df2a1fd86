//! Multi-split randomization test for the best arm's mean.
//!
//! The observed statistic is the average split p-value over `num_splits`
//! random selection sets. Its reference distribution is built by permuting
//! arm labels and rebuilding outcomes from the null-implied means plus
//! randomly gated residuals, then re-running the same selection sets. The
//! final p-value is the share of replicates whose statistic falls strictly
//! below the observed one.
//!
//! # Example
//!
//! ```
//! use best_arm_inference::{RandomizationTest, SyntheticDesign};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let design = SyntheticDesign::new(100, vec![0.0, 0.0], vec![1.0, 1.0]).unwrap();
//! let mut rng = ChaCha8Rng::seed_from_u64(1);
//! let test = RandomizationTest::new(design.generate(&mut rng).unwrap(), 50, 0.0).unwrap();
//!
//! let p_single = test.single_test(&mut rng).unwrap();
//! let p_multi = test.multiple_test(5, 100, 2024).unwrap();
//! assert!((0.0..=1.0).contains(&p_single));
//! assert!((0.0..=1.0).contains(&p_multi));
//! ```

use best_arm_core::{
    EngineSettings, InferenceError, Observations, ResidualBasis, Result, Trial, VarianceEstimator,
};
use rand::seq::{index, SliceRandom};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::residual::{ResidualDecomposition, ResidualModel};
use crate::split::{SplitEstimate, SplitEstimator};
use crate::streams::{RngStreams, StreamDomain};
use crate::workers;

/// Full outcome of a multi-split randomization test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleTestReport {
    /// Randomization p-value.
    pub p_value: f64,
    /// Average split p-value on the real data.
    pub observed_statistic: f64,
    /// Average split p-value of each permutation replicate, in replicate order.
    pub replicate_statistics: Vec<f64>,
    /// Replicates with a statistic strictly below the observed one.
    pub extreme_count: usize,
    pub num_splits: usize,
    pub num_permutations: usize,
    /// Root seed all trial streams were derived from.
    pub seed: u64,
}

/// Randomization-test engine bound to one dataset.
///
/// The residual decomposition is computed once on construction and shared
/// read-only by every trial.
#[derive(Debug, Clone)]
pub struct RandomizationTest {
    observations: Observations,
    split_size: usize,
    null_value: f64,
    decomposition: ResidualDecomposition,
    estimator: SplitEstimator,
    num_threads: usize,
}

impl RandomizationTest {
    /// Creates an engine with default estimator settings.
    ///
    /// # Errors
    /// Returns an error if `split_size` is not in `0 < b < n` or the null
    /// value is not finite.
    pub fn new(observations: Observations, split_size: usize, null_value: f64) -> Result<Self> {
        let settings = EngineSettings {
            split_size,
            null_value,
            ..EngineSettings::default()
        };
        Self::with_settings(observations, &settings)
    }

    /// Validates raw vectors and creates an engine.
    ///
    /// # Errors
    /// Returns an error if the vectors fail [`Observations::new`] or the
    /// parameters are invalid.
    pub fn from_vectors(
        outcomes: Vec<f64>,
        arms: Vec<usize>,
        split_size: usize,
        null_value: f64,
    ) -> Result<Self> {
        Self::new(Observations::new(outcomes, arms)?, split_size, null_value)
    }

    /// Creates an engine from configuration. Trial counts and seed in
    /// `settings` are ignored here; they are passed per call.
    ///
    /// # Errors
    /// Returns an error if `split_size` is not in `0 < b < n` or the null
    /// value is not finite.
    pub fn with_settings(observations: Observations, settings: &EngineSettings) -> Result<Self> {
        let n = observations.len();
        if settings.split_size == 0 || settings.split_size >= n {
            return Err(InferenceError::InvalidSplitSize {
                split_size: settings.split_size,
                n_samples: n,
            });
        }

        let decomposition = ResidualModel::new(settings.null_value)
            .with_basis(settings.residual_basis)
            .decompose(&observations)?;
        let estimator = SplitEstimator::new(observations.n_arms())
            .with_variance_estimator(settings.variance_estimator);

        debug!(
            n_samples = n,
            n_arms = observations.n_arms(),
            split_size = settings.split_size,
            null_value = settings.null_value,
            nulled_arm = decomposition.nulled_arm,
            "randomization test ready"
        );

        Ok(Self {
            observations,
            split_size: settings.split_size,
            null_value: settings.null_value,
            decomposition,
            estimator,
            num_threads: settings.num_threads,
        })
    }

    /// Runs trial loops on a dedicated pool of `num_threads` workers; 0 uses
    /// the global rayon pool.
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    #[must_use]
    pub fn observations(&self) -> &Observations {
        &self.observations
    }

    #[must_use]
    pub fn decomposition(&self) -> &ResidualDecomposition {
        &self.decomposition
    }

    #[must_use]
    pub fn split_size(&self) -> usize {
        self.split_size
    }

    #[must_use]
    pub fn null_value(&self) -> f64 {
        self.null_value
    }

    #[must_use]
    pub fn variance_estimator(&self) -> VarianceEstimator {
        self.estimator.variance_estimator()
    }

    #[must_use]
    pub fn residual_basis(&self) -> ResidualBasis {
        self.decomposition.basis
    }

    /// Draws a selection set of `split_size` distinct unit indices.
    pub fn draw_selection<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        index::sample(rng, self.observations.len(), self.split_size).into_vec()
    }

    /// Estimates on the real data using the given selection set.
    ///
    /// # Errors
    /// Propagates [`SplitEstimator::estimate`] failures.
    pub fn estimate(&self, selection: &[usize]) -> Result<SplitEstimate> {
        self.estimator.estimate(
            self.observations.outcomes(),
            self.observations.arms(),
            selection,
        )
    }

    /// One random split on the real data, returning the full estimate.
    ///
    /// # Errors
    /// Returns a degenerate-trial error if the split leaves the selected arm
    /// with fewer than two estimation observations or zero spread.
    pub fn single_estimate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SplitEstimate> {
        let selection = self.draw_selection(rng);
        self.estimate(&selection)
    }

    /// One random split on the real data, returning its p-value.
    ///
    /// # Errors
    /// Same as [`RandomizationTest::single_estimate`].
    pub fn single_test<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        self.single_estimate(rng).map(|estimate| estimate.p_value)
    }

    /// Multi-split randomization p-value.
    ///
    /// # Errors
    /// Same as [`RandomizationTest::multiple_test_report`].
    pub fn multiple_test(
        &self,
        num_splits: usize,
        num_permutations: usize,
        seed: u64,
    ) -> Result<f64> {
        self.multiple_test_report(num_splits, num_permutations, seed)
            .map(|report| report.p_value)
    }

    /// Multi-split randomization test with the full reference distribution.
    ///
    /// All randomness is derived from `seed`: split `s` uses stream
    /// `(Split, s)` and replicate `i` uses stream `(Permutation, i)`, so the
    /// result does not depend on the number of worker threads.
    ///
    /// # Errors
    /// - [`InferenceError::ZeroTrialCount`] if either count is zero.
    /// - [`InferenceError::TrialFailed`] wrapping the failure of the
    ///   lowest-indexed failing trial (observed splits first).
    /// - [`InferenceError::ThreadPool`] if a dedicated pool cannot be built.
    pub fn multiple_test_report(
        &self,
        num_splits: usize,
        num_permutations: usize,
        seed: u64,
    ) -> Result<MultipleTestReport> {
        if num_splits == 0 {
            return Err(InferenceError::ZeroTrialCount { name: "num_splits" });
        }
        if num_permutations == 0 {
            return Err(InferenceError::ZeroTrialCount {
                name: "num_permutations",
            });
        }

        info!(
            num_splits,
            num_permutations, seed, "starting multi-split randomization test"
        );

        let streams = RngStreams::new(seed);
        let splits: Vec<Vec<usize>> = (0..num_splits)
            .map(|s| self.draw_selection(&mut streams.stream(StreamDomain::Split, s as u64)))
            .collect();

        let (observed_statistic, replicate_statistics) = workers::install(self.num_threads, || {
            let observed = self.observed_statistic(&splits)?;
            let replicates = (0..num_permutations)
                .into_par_iter()
                .map(|replicate| self.permutation_replicate(replicate, &splits, &streams))
                .collect::<Vec<Result<f64>>>()
                .into_iter()
                .collect::<Result<Vec<f64>>>()?;
            Ok((observed, replicates))
        })?;

        let extreme_count = replicate_statistics
            .iter()
            .filter(|&&p| p < observed_statistic)
            .count();
        let p_value = extreme_count as f64 / num_permutations as f64;

        info!(
            p_value,
            observed_statistic, extreme_count, "randomization test complete"
        );

        Ok(MultipleTestReport {
            p_value,
            observed_statistic,
            replicate_statistics,
            extreme_count,
            num_splits,
            num_permutations,
            seed,
        })
    }

    /// Average real-data p-value over the selection sets.
    fn observed_statistic(&self, splits: &[Vec<usize>]) -> Result<f64> {
        let p_values = splits
            .par_iter()
            .enumerate()
            .map(|(split, selection)| {
                self.estimate(selection)
                    .map(|estimate| estimate.p_value)
                    .map_err(|e| e.in_trial(Trial::ObservedSplit { split }))
            })
            .collect::<Vec<Result<f64>>>()
            .into_iter()
            .collect::<Result<Vec<f64>>>()?;

        Ok(average(&p_values))
    }

    /// Synthetic outcomes `mu[Z'] + g * eps` for a permuted label vector.
    fn null_outcomes<R: Rng + ?Sized>(&self, permuted_arms: &[usize], rng: &mut R) -> Vec<f64> {
        let means = &self.decomposition.arm_means;
        permuted_arms
            .iter()
            .zip(&self.decomposition.residuals)
            .map(|(&arm, &eps)| {
                let gate = rng.gen_bool(0.5);
                if gate {
                    means[arm] + eps
                } else {
                    means[arm]
                }
            })
            .collect()
    }

    /// Average split p-value on one permuted, residual-randomized dataset.
    fn permutation_replicate(
        &self,
        replicate: usize,
        splits: &[Vec<usize>],
        streams: &RngStreams,
    ) -> Result<f64> {
        let mut rng = streams.stream(StreamDomain::Permutation, replicate as u64);

        let mut arms = self.observations.arms().to_vec();
        arms.shuffle(&mut rng);
        let outcomes = self.null_outcomes(&arms, &mut rng);

        let mut total = 0.0;
        for (split, selection) in splits.iter().enumerate() {
            let estimate = self
                .estimator
                .estimate(&outcomes, &arms, selection)
                .map_err(|e| e.in_trial(Trial::Permutation { replicate, split }))?;
            total += estimate.p_value;
        }
        Ok(total / splits.len() as f64)
    }
}

fn average(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticDesign;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn null_data(n: usize, seed: u64) -> Observations {
        SyntheticDesign::new(n, vec![0.0, 0.0], vec![1.0, 1.0])
            .unwrap()
            .generate(&mut ChaCha8Rng::seed_from_u64(seed))
            .unwrap()
    }

    fn shifted_data(n: usize, seed: u64) -> Observations {
        SyntheticDesign::new(n, vec![0.0, 1.5], vec![1.0, 1.0])
            .unwrap()
            .generate(&mut ChaCha8Rng::seed_from_u64(seed))
            .unwrap()
    }

    // ============================================================
    // Construction
    // ============================================================

    #[test]
    fn rejects_split_size_out_of_range() {
        for b in [0, 100, 150] {
            let err = RandomizationTest::new(null_data(100, 1), b, 0.0).unwrap_err();
            assert_eq!(
                err,
                InferenceError::InvalidSplitSize {
                    split_size: b,
                    n_samples: 100
                }
            );
        }
    }

    #[test]
    fn rejects_invalid_arm_support() {
        let err =
            RandomizationTest::from_vectors(vec![0.1, 0.2, 0.3, 0.4], vec![0, 2, 0, 2], 2, 0.0)
                .unwrap_err();
        assert!(matches!(err, InferenceError::InvalidArmSupport { .. }));
    }

    #[test]
    fn rejects_non_finite_null() {
        let err = RandomizationTest::new(null_data(40, 1), 20, f64::NAN).unwrap_err();
        assert!(matches!(err, InferenceError::NonFiniteParameter { .. }));
    }

    #[test]
    fn settings_flow_into_engine() {
        let settings = EngineSettings {
            split_size: 30,
            null_value: 0.25,
            variance_estimator: VarianceEstimator::Unbiased,
            residual_basis: ResidualBasis::Observed,
            num_threads: 2,
            ..EngineSettings::default()
        };
        let test = RandomizationTest::with_settings(null_data(60, 2), &settings).unwrap();
        assert_eq!(test.split_size(), 30);
        assert!((test.null_value() - 0.25).abs() < f64::EPSILON);
        assert_eq!(test.variance_estimator(), VarianceEstimator::Unbiased);
        assert_eq!(test.residual_basis(), ResidualBasis::Observed);
        assert_eq!(
            test.decomposition().arm_means[test.decomposition().nulled_arm],
            0.25
        );
    }

    // ============================================================
    // Single test
    // ============================================================

    #[test]
    fn draw_selection_has_distinct_indices() {
        let test = RandomizationTest::new(null_data(100, 3), 50, 0.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut selection = test.draw_selection(&mut rng);
        assert_eq!(selection.len(), 50);
        selection.sort_unstable();
        selection.dedup();
        assert_eq!(selection.len(), 50);
        assert!(selection.iter().all(|&i| i < 100));
    }

    #[test]
    fn single_test_returns_probability() {
        let test = RandomizationTest::new(null_data(100, 4), 50, 0.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(6);
        for _ in 0..50 {
            let p = test.single_test(&mut rng).unwrap();
            assert!((0.0..=1.0).contains(&p), "p was {p}");
        }
    }

    #[test]
    fn single_test_is_reproducible_with_seed() {
        let test = RandomizationTest::new(null_data(100, 4), 50, 0.0).unwrap();
        let a = test.single_test(&mut ChaCha8Rng::seed_from_u64(8)).unwrap();
        let b = test.single_test(&mut ChaCha8Rng::seed_from_u64(8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_test_detects_large_effect() {
        let test = RandomizationTest::new(shifted_data(200, 5), 100, 0.0).unwrap();
        let estimate = test
            .single_estimate(&mut ChaCha8Rng::seed_from_u64(9))
            .unwrap();
        assert_eq!(estimate.best_arm, 1);
        assert!(estimate.p_value < 1e-6, "p was {}", estimate.p_value);
    }

    // ============================================================
    // Multiple test
    // ============================================================

    #[test]
    fn multiple_test_returns_probability() {
        let test = RandomizationTest::new(null_data(100, 10), 50, 0.0).unwrap();
        let report = test.multiple_test_report(4, 60, 77).unwrap();

        assert!((0.0..=1.0).contains(&report.p_value));
        assert!((0.0..=1.0).contains(&report.observed_statistic));
        assert_eq!(report.replicate_statistics.len(), 60);
        assert!(report
            .replicate_statistics
            .iter()
            .all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(
            report.extreme_count,
            report
                .replicate_statistics
                .iter()
                .filter(|&&p| p < report.observed_statistic)
                .count()
        );
        assert!((report.p_value - report.extreme_count as f64 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn observed_statistic_averages_split_p_values() {
        let test = RandomizationTest::new(null_data(100, 11), 50, 0.0).unwrap();
        let seed = 31;
        let report = test.multiple_test_report(3, 5, seed).unwrap();

        let streams = RngStreams::new(seed);
        let expected = (0..3)
            .map(|s| {
                let selection =
                    test.draw_selection(&mut streams.stream(StreamDomain::Split, s as u64));
                test.estimate(&selection).unwrap().p_value
            })
            .sum::<f64>()
            / 3.0;
        assert!((report.observed_statistic - expected).abs() < 1e-12);
    }

    #[test]
    fn multiple_test_is_reproducible_with_seed() {
        let test = RandomizationTest::new(null_data(100, 12), 50, 0.0).unwrap();
        let a = test.multiple_test_report(3, 40, 5).unwrap();
        let b = test.multiple_test_report(3, 40, 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn multiple_test_does_not_depend_on_worker_count() {
        let data = null_data(100, 13);
        let serial = RandomizationTest::new(data.clone(), 50, 0.0)
            .unwrap()
            .with_num_threads(1)
            .multiple_test_report(4, 50, 99)
            .unwrap();
        let parallel = RandomizationTest::new(data, 50, 0.0)
            .unwrap()
            .with_num_threads(4)
            .multiple_test_report(4, 50, 99)
            .unwrap();
        assert_eq!(serial, parallel);
    }

    #[test]
    fn zero_trial_counts_are_rejected() {
        let test = RandomizationTest::new(null_data(40, 14), 20, 0.0).unwrap();
        assert_eq!(
            test.multiple_test(0, 10, 1).unwrap_err(),
            InferenceError::ZeroTrialCount { name: "num_splits" }
        );
        assert_eq!(
            test.multiple_test(10, 0, 1).unwrap_err(),
            InferenceError::ZeroTrialCount {
                name: "num_permutations"
            }
        );
    }

    #[test]
    fn degenerate_observed_split_is_reported_with_index() {
        // Two units per arm: any split of size 2 either leaves the winner
        // with at most one estimation unit or selects from a single arm
        // whose remaining unit is alone.
        let test =
            RandomizationTest::from_vectors(vec![0.0, 1.0, 2.0, 3.0], vec![0, 0, 1, 1], 2, 0.0)
                .unwrap();
        let err = test.multiple_test(3, 10, 4).unwrap_err();

        assert!(err.is_degenerate_trial());
        assert_eq!(err.trial(), Some(Trial::ObservedSplit { split: 0 }));
    }

    #[test]
    fn degenerate_permutation_is_reported_with_replicate() {
        // Real data: whichever arm a one-unit selection picks keeps three
        // spread-out estimation units. Permuted data: when the winner's
        // three estimation gates all close, its outcomes collapse to the
        // null-implied mean and the standard error is zero.
        let outcomes = vec![0.0, 1.0, 2.0, 3.0, 5.0, 6.0, 7.0, 8.0];
        let arms = vec![0, 0, 0, 0, 1, 1, 1, 1];
        let test = RandomizationTest::from_vectors(outcomes, arms, 1, 0.0).unwrap();

        let err = test.multiple_test(1, 200, 3).unwrap_err();
        assert!(err.is_degenerate_trial(), "{err}");
        assert!(
            matches!(err.trial(), Some(Trial::Permutation { split: 0, .. })),
            "{err}"
        );
    }
}
