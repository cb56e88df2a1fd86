//! Multi-split randomization test on one synthetic dataset.

use anyhow::{Context, Result};
use best_arm_inference::{MultipleTestReport, RandomizationTest};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::common::{boxed, build_design, emit, format_list, resolve_seed, CommonArgs};

/// Arguments for the multiple command.
#[derive(Args, Debug, Clone)]
pub struct MultipleArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Random splits averaged into the statistic
    #[arg(long)]
    pub splits: Option<usize>,

    /// Permutation replicates in the reference distribution
    #[arg(long)]
    pub permutations: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MultipleOutput {
    pub n_samples: usize,
    pub means: Vec<f64>,
    pub split_size: usize,
    pub null_value: f64,
    pub report: MultipleTestReport,
}

impl MultipleOutput {
    pub fn to_text(&self) -> String {
        let report = &self.report;
        boxed(
            "RANDOMIZATION TEST",
            &[
                ("Seed:", report.seed.to_string()),
                ("Samples:", self.n_samples.to_string()),
                ("Design means:", format_list(&self.means)),
                ("Split size:", self.split_size.to_string()),
                ("Null value:", self.null_value.to_string()),
                ("Splits:", report.num_splits.to_string()),
                ("Permutations:", report.num_permutations.to_string()),
                (
                    "Observed statistic:",
                    format!("{:.4}", report.observed_statistic),
                ),
                ("More extreme replicates:", report.extreme_count.to_string()),
                ("p-value:", format!("{:.4}", report.p_value)),
            ],
        )
    }
}

/// Runs the multiple command.
///
/// Stream 0 of the root seed generates the dataset; the test's per-trial
/// streams never use it.
pub fn run_multiple(args: MultipleArgs) -> Result<()> {
    let format = args.common.output_format()?;
    let config = args.common.load_config()?;
    let seed = resolve_seed(&config);
    let design = build_design(&config)?;
    let num_splits = args.splits.unwrap_or(config.engine.num_splits);
    let num_permutations = args.permutations.unwrap_or(config.engine.num_permutations);

    let observations = design
        .generate(&mut ChaCha8Rng::seed_from_u64(seed))
        .context("failed to generate synthetic data")?;
    let test = RandomizationTest::with_settings(observations, &config.engine)
        .context("failed to set up test")?;
    let report = test
        .multiple_test_report(num_splits, num_permutations, seed)
        .context("randomization test failed")?;

    let output = MultipleOutput {
        n_samples: design.n_samples(),
        means: design.means().to_vec(),
        split_size: test.split_size(),
        null_value: test.null_value(),
        report,
    };
    emit(format, &output, MultipleOutput::to_text)
}
