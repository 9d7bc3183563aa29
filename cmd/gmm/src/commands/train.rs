//! Model training command.

use clap::Args;
use giztoy_gmm::Gmm;
use tracing::info;

use super::{get_config, load_data, save_model};
use crate::Cli;

/// Train a model from a single Gaussian by repeated split + EM rounds.
#[derive(Args)]
pub struct TrainCommand {
    /// Data file (JSON array of rows)
    #[arg(short = 'd', long)]
    data: String,
    /// Number of components, a power of two
    #[arg(short = 'n', long)]
    components: usize,
    /// Output model file
    #[arg(short = 'o', long)]
    out: String,
}

impl TrainCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        let x = load_data(&self.data)?;
        info!(points = x.nrows(), dim = x.ncols(), "training {} components", self.components);

        let mut gmm = Gmm::binary_split(self.components, &x, &cfg.init)?;
        let avll = gmm.avll(&x)?;
        save_model(&mut gmm, &self.out)?;

        println!("{} components, avll {avll:.6}, saved to {}", gmm.n(), self.out);
        Ok(())
    }
}
