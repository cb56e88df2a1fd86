//! Repeated-sampling calibration of the single-split test.
//!
//! Draws many independent datasets from a synthetic design, runs one random
//! split on each and records how often the test rejects and which arm the
//! selection step picked. Under a design whose arms all share the null mean,
//! the rejection rate should sit near the nominal level.

use best_arm_core::{EngineSettings, InferenceError, Result, Trial};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::permutation::RandomizationTest;
use crate::streams::{RngStreams, StreamDomain};
use crate::synthetic::SyntheticDesign;
use crate::workers;

/// Aggregate result of a calibration study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub replications: usize,
    /// Nominal level; a replication rejects when its p-value is below it.
    pub alpha: f64,
    pub rejections: usize,
    pub rejection_rate: f64,
    /// How often each arm was selected, indexed by arm.
    pub selected_arm_counts: Vec<usize>,
    /// Mean of the split p-values.
    pub mean_p_value: f64,
    pub seed: u64,
}

impl CalibrationSummary {
    /// Share of replications that selected `arm`.
    #[must_use]
    pub fn selection_share(&self, arm: usize) -> f64 {
        self.selected_arm_counts
            .get(arm)
            .map_or(0.0, |&count| count as f64 / self.replications as f64)
    }
}

/// Runs `replications` independent single-split tests on fresh datasets.
///
/// Replication `r` draws its dataset and its split from stream
/// `(Replication, r)` of `seed`. Replications run on a dedicated pool of
/// `settings.num_threads` workers when that is non-zero.
///
/// # Errors
/// - [`InferenceError::ZeroTrialCount`] if `replications` is zero.
/// - [`InferenceError::InvalidProbability`] if `alpha` is not in `(0, 1)`.
/// - [`InferenceError::TrialFailed`] for the lowest-indexed failing
///   replication.
/// - [`InferenceError::ThreadPool`] if a dedicated pool cannot be built.
pub fn calibrate(
    design: &SyntheticDesign,
    settings: &EngineSettings,
    replications: usize,
    alpha: f64,
    seed: u64,
) -> Result<CalibrationSummary> {
    if replications == 0 {
        return Err(InferenceError::ZeroTrialCount {
            name: "replications",
        });
    }
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(InferenceError::InvalidProbability {
            name: "alpha",
            value: alpha,
        });
    }

    info!(
        replications,
        alpha,
        seed,
        n_samples = design.n_samples(),
        n_arms = design.n_arms(),
        "starting calibration study"
    );

    let streams = RngStreams::new(seed);
    let outcomes = workers::install(settings.num_threads, || {
        (0..replications)
            .into_par_iter()
            .map(|index| {
                let mut rng = streams.stream(StreamDomain::Replication, index as u64);
                run_replication(design, settings, &mut rng)
                    .map_err(|e| e.in_trial(Trial::Replication { index }))
            })
            .collect::<Vec<Result<(usize, f64)>>>()
            .into_iter()
            .collect::<Result<Vec<(usize, f64)>>>()
    })?;

    let mut selected_arm_counts = vec![0; design.n_arms()];
    let mut rejections = 0;
    let mut p_sum = 0.0;
    for &(arm, p_value) in &outcomes {
        selected_arm_counts[arm] += 1;
        if p_value < alpha {
            rejections += 1;
        }
        p_sum += p_value;
    }

    let summary = CalibrationSummary {
        replications,
        alpha,
        rejections,
        rejection_rate: rejections as f64 / replications as f64,
        selected_arm_counts,
        mean_p_value: p_sum / replications as f64,
        seed,
    };
    info!(
        rejection_rate = summary.rejection_rate,
        "calibration study complete"
    );
    Ok(summary)
}

/// Selected arm and p-value of one fresh dataset.
fn run_replication<R: Rng + ?Sized>(
    design: &SyntheticDesign,
    settings: &EngineSettings,
    rng: &mut R,
) -> Result<(usize, f64)> {
    let observations = design.generate(rng)?;
    let test = RandomizationTest::with_settings(observations, settings)?;
    let estimate = test.single_estimate(rng)?;
    Ok((estimate.best_arm, estimate.p_value))
}
