//! Dot-scoring command.

use clap::Args;
use giztoy_gmm::{dotscore, Order};

use super::{load_data, load_model};
use crate::Cli;

/// Score a test set against an enrollment set. Higher means more likely the
/// same speaker.
#[derive(Args)]
pub struct ScoreCommand {
    /// Reference model
    #[arg(long)]
    ubm: String,
    /// Enrollment data file
    #[arg(short = 'e', long)]
    enroll: String,
    /// Test data file
    #[arg(short = 't', long)]
    test: String,
    /// Relevance factor applied to the enrollment counts
    #[arg(short = 'r', long, default_value_t = 1.0)]
    relevance: f64,
}

impl ScoreCommand {
    pub fn run(&self, _cli: &Cli) -> anyhow::Result<()> {
        let ubm = load_model(&self.ubm)?;
        let enroll = ubm.cstats(&load_data(&self.enroll)?, Order::First)?;
        let test = ubm.cstats(&load_data(&self.test)?, Order::First)?;

        let score = dotscore(&enroll, &test, self.relevance)?;
        println!("{score}");
        Ok(())
    }
}
