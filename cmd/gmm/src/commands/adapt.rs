//! MAP adaptation command.

use clap::Args;
use tracing::info;

use super::{get_config, load_data, load_model, save_model};
use crate::Cli;

/// MAP-adapt a model towards data.
///
/// Without any of --means, --weights or --covars the groups from the
/// config file apply (default: means only).
#[derive(Args)]
pub struct AdaptCommand {
    /// Model to adapt
    #[arg(long)]
    ubm: String,
    /// Data file (JSON array of rows)
    #[arg(short = 'd', long)]
    data: String,
    /// Relevance factor (overrides config file)
    #[arg(short = 'r', long)]
    relevance: Option<f64>,
    /// Adapt means
    #[arg(long)]
    means: bool,
    /// Adapt weights
    #[arg(long)]
    weights: bool,
    /// Adapt variances
    #[arg(long)]
    covars: bool,
    /// Output model file
    #[arg(short = 'o', long)]
    out: String,
}

impl AdaptCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = get_config(cli)?.map;
        if let Some(r) = self.relevance {
            cfg.relevance = r;
        }
        if self.means || self.weights || self.covars {
            cfg.means = self.means;
            cfg.weights = self.weights;
            cfg.covars = self.covars;
        }

        let ubm = load_model(&self.ubm)?;
        let x = load_data(&self.data)?;
        info!(points = x.nrows(), relevance = cfg.relevance, "adapting {}", self.ubm);

        let mut adapted = ubm.map_adapt(&x, &cfg)?;
        println!(
            "avll {:.6} -> {:.6}",
            ubm.avll(&x)?,
            adapted.avll(&x)?
        );
        save_model(&mut adapted, &self.out)?;
        Ok(())
    }
}
