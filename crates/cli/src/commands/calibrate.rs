//! Repeated-sampling calibration of the single-split test.

use anyhow::{Context, Result};
use best_arm_inference::{calibrate, CalibrationSummary};
use clap::Args;
use serde::Serialize;

use super::common::{boxed, build_design, emit, format_list, resolve_seed, CommonArgs};

/// Arguments for the calibrate command.
#[derive(Args, Debug, Clone)]
pub struct CalibrateArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Number of synthetic datasets (default: 1000)
    #[arg(long, default_value = "1000")]
    pub replications: usize,

    /// Nominal level of each test (default: 0.05)
    #[arg(long, default_value = "0.05")]
    pub alpha: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CalibrateOutput {
    pub n_samples: usize,
    pub means: Vec<f64>,
    pub split_size: usize,
    pub null_value: f64,
    pub summary: CalibrationSummary,
}

impl CalibrateOutput {
    pub fn to_text(&self) -> String {
        let summary = &self.summary;
        let labels: Vec<String> = (0..summary.selected_arm_counts.len())
            .map(|arm| format!("Arm {arm} selected:"))
            .collect();
        let mut rows = vec![
            ("Seed:", summary.seed.to_string()),
            ("Samples:", self.n_samples.to_string()),
            ("Design means:", format_list(&self.means)),
            ("Split size:", self.split_size.to_string()),
            ("Null value:", self.null_value.to_string()),
            ("Replications:", summary.replications.to_string()),
            ("Alpha:", summary.alpha.to_string()),
            ("Rejections:", summary.rejections.to_string()),
            ("Rejection rate:", format!("{:.4}", summary.rejection_rate)),
            ("Mean p-value:", format!("{:.4}", summary.mean_p_value)),
        ];
        for (arm, label) in labels.iter().enumerate() {
            rows.push((
                label.as_str(),
                format!("{:.1}%", 100.0 * summary.selection_share(arm)),
            ));
        }
        boxed("CALIBRATION STUDY", &rows)
    }
}

/// Runs the calibrate command.
pub fn run_calibrate(args: CalibrateArgs) -> Result<()> {
    let format = args.common.output_format()?;
    let config = args.common.load_config()?;
    let seed = resolve_seed(&config);
    let design = build_design(&config)?;

    let summary = calibrate(
        &design,
        &config.engine,
        args.replications,
        args.alpha,
        seed,
    )
    .context("calibration study failed")?;

    let output = CalibrateOutput {
        n_samples: design.n_samples(),
        means: design.means().to_vec(),
        split_size: config.engine.split_size,
        null_value: config.engine.null_value,
        summary,
    };
    emit(format, &output, CalibrateOutput::to_text)
}
