//! CLI commands module.

mod adapt;
mod score;
mod show;
mod stats;
mod train;
mod util;

pub use adapt::AdaptCommand;
pub use score::ScoreCommand;
pub use show::ShowCommand;
pub use stats::StatsCommand;
pub use train::TrainCommand;

pub(crate) use util::*;
