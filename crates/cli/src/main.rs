use clap::{Parser, Subcommand};

mod commands;

use commands::{CalibrateArgs, MultipleArgs, SingleArgs};

#[derive(Parser)]
#[command(name = "best-arm")]
#[command(about = "Winner's-curse-corrected inference for the best arm", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one random split on a synthetic dataset
    Single(SingleArgs),
    /// Run the multi-split randomization test on a synthetic dataset
    Multiple(MultipleArgs),
    /// Estimate the single-split rejection rate over many synthetic datasets
    Calibrate(CalibrateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Single(args) => commands::run_single(args)?,
        Commands::Multiple(args) => commands::run_multiple(args)?,
        Commands::Calibrate(args) => commands::run_calibrate(args)?,
    }

    Ok(())
}
