//! gmm - Train, adapt and score diagonal Gaussian mixture models.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{AdaptCommand, ScoreCommand, ShowCommand, StatsCommand, TrainCommand};

/// gmm - Gaussian mixture models for speaker verification.
///
/// Data files are JSON arrays of rows, one feature vector per row.
/// Models are stored as JSON.
#[derive(Parser)]
#[command(name = "gmm")]
#[command(about = "Train, adapt and score Gaussian mixture models")]
#[command(version)]
pub struct Cli {
    /// Config file (YAML) with `init` and `map` sections
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model from data by binary splitting
    Train(TrainCommand),
    /// MAP-adapt a model towards data
    Adapt(AdaptCommand),
    /// Dot-score a test set against an enrollment set
    Score(ScoreCommand),
    /// Print sufficient statistics of data as JSON
    Stats(StatsCommand),
    /// Print a model
    Show(ShowCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Train(cmd) => cmd.run(&cli),
        Commands::Adapt(cmd) => cmd.run(&cli),
        Commands::Score(cmd) => cmd.run(&cli),
        Commands::Stats(cmd) => cmd.run(&cli),
        Commands::Show(cmd) => cmd.run(&cli),
    }
}
