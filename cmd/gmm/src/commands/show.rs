//! Model inspection command.

use clap::Args;

use super::load_model;
use crate::Cli;

/// Print a model's parameters.
#[derive(Args)]
pub struct ShowCommand {
    /// Model file
    model: String,
    /// Also print the model's history
    #[arg(long)]
    history: bool,
}

impl ShowCommand {
    pub fn run(&self, _cli: &Cli) -> anyhow::Result<()> {
        let gmm = load_model(&self.model)?;
        print!("{gmm}");
        if self.history {
            println!();
            println!("History:");
            print!("{}", gmm.history());
        }
        Ok(())
    }
}
