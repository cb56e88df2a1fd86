//! Arguments and helpers shared by every subcommand.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use best_arm_core::{ConfigLoader, InferenceConfig};
use best_arm_inference::{RngStreams, SyntheticDesign};
use clap::Args;
use serde::Serialize;

const BOX_WIDTH: usize = 63;

/// Design, engine and output flags accepted by all subcommands.
///
/// Flags override values from the configuration file and environment.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Config file path (default: config/Inference.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of synthetic units
    #[arg(long)]
    pub samples: Option<usize>,

    /// Comma-separated per-arm means, e.g. 0,0.5,-1
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub means: Option<Vec<f64>>,

    /// Comma-separated per-arm variances (default: 1 per arm when --means
    /// changes the arm count)
    #[arg(long, value_delimiter = ',')]
    pub variances: Option<Vec<f64>>,

    /// Units in the selection set
    #[arg(long)]
    pub split_size: Option<usize>,

    /// Null value for the best arm's mean
    #[arg(long = "null", allow_negative_numbers = true)]
    pub null_value: Option<f64>,

    /// Root seed (random when neither given nor configured)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Worker threads for parallel trials (0 = rayon default)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl CommonArgs {
    /// Loads configuration and applies the command-line overrides.
    pub fn load_config(&self) -> Result<InferenceConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigLoader::load_from(path)?,
            None => ConfigLoader::load()?,
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut InferenceConfig) {
        if let Some(samples) = self.samples {
            config.design.samples = samples;
        }
        if let Some(means) = &self.means {
            if self.variances.is_none() && means.len() != config.design.variances.len() {
                config.design.variances = vec![1.0; means.len()];
            }
            config.design.means = means.clone();
        }
        if let Some(variances) = &self.variances {
            config.design.variances = variances.clone();
        }
        if let Some(split_size) = self.split_size {
            config.engine.split_size = split_size;
        }
        if let Some(null_value) = self.null_value {
            config.engine.null_value = null_value;
        }
        if let Some(seed) = self.seed {
            config.engine.seed = Some(seed);
        }
        if let Some(threads) = self.threads {
            config.engine.num_threads = threads;
        }
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::parse(&self.format)
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parses an output format from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!(
                "Unknown format: '{}'. Valid formats: text, json",
                s
            )),
        }
    }
}

/// Configured seed, or a fresh one that is logged so the run can be repeated.
pub fn resolve_seed(config: &InferenceConfig) -> u64 {
    match config.engine.seed {
        Some(seed) => seed,
        None => {
            let seed = RngStreams::from_entropy().root_seed();
            tracing::info!(seed, "no seed configured, drew one");
            seed
        }
    }
}

pub fn build_design(config: &InferenceConfig) -> Result<SyntheticDesign> {
    SyntheticDesign::from_settings(&config.design).context("invalid synthetic design")
}

/// Prints `value` as pretty JSON or through its text renderer.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, text: fn(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", text(value)),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(value).context("failed to serialize output")?
        ),
    }
    Ok(())
}

/// Renders a titled box of label/value rows.
pub fn boxed(title: &str, rows: &[(&str, String)]) -> String {
    let border = "═".repeat(BOX_WIDTH);
    let mut output = String::new();

    output.push('\n');
    output.push_str(&format!("╔{border}╗\n"));
    output.push_str(&format!("║{:^width$}║\n", title, width = BOX_WIDTH));
    output.push_str(&format!("╠{border}╣\n"));
    for (label, value) in rows {
        output.push_str(&format!("║  {:<28}{:>32} ║\n", label, value));
    }
    output.push_str(&format!("╚{border}╝\n"));
    output
}

pub fn format_list(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{v}"))
        .collect::<Vec<_>>()
        .join(", ")
}
