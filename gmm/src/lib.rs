//! Diagonal-covariance Gaussian mixture models for speaker-recognition style
//! scoring.
//!
//! # Pipeline
//!
//! 1. [`Gmm::binary_split`]: data -> universal background model (UBM), by
//!    repeated [`Gmm::split`] + [`Gmm::em`] rounds from a single Gaussian
//! 2. [`Gmm::cstats`]: UBM + new data -> centered sufficient statistics
//! 3. [`Gmm::map_adapt`]: UBM + data -> speaker model, or
//!    [`dotscore`]: two sets of centered statistics -> verification score
//!
//! # Usage
//!
//! ```no_run
//! use giztoy_gmm::{dotscore, Gmm, InitConfig, MapConfig, Order};
//! use nalgebra::DMatrix;
//!
//! # fn features() -> DMatrix<f64> { DMatrix::zeros(1000, 20) }
//! let background = features();
//! let ubm = Gmm::binary_split(64, &background, &InitConfig::default())?;
//!
//! let enroll = features();
//! let test = features();
//! let speaker = ubm.map_adapt(&enroll, &MapConfig::default())?;
//!
//! let score = dotscore(
//!     &ubm.cstats(&enroll, Order::First)?,
//!     &ubm.cstats(&test, Order::First)?,
//!     1.0,
//! )?;
//! # Ok::<(), giztoy_gmm::GmmError>(())
//! ```
//!
//! # Ownership
//!
//! [`Gmm::em`] trains in place (`&mut self`). Everything else borrows the
//! model and returns new values; [`Gmm::split`] and [`Gmm::map_adapt`]
//! return a model whose [`History`] is the parent's plus one record.
//!
//! # Memory
//!
//! The EM E-step walks the data in row blocks sized by
//! [`EmConfig::memory_budget`] (see [`block_rows`]), so its working set
//! does not grow with the dataset.

mod error;
mod history;
pub mod io;
mod likelihood;
mod map;
mod model;
mod score;
mod split;
mod stats;
mod train;

pub use error::GmmError;
pub use history::{Event, History};
pub use map::MapConfig;
pub use model::{CovarianceKind, Gmm};
pub use score::dotscore;
pub use split::{InitConfig, SplitConfig};
pub use stats::{CenteredStats, Order, Stats};
pub use train::{block_rows, EmConfig, DEFAULT_MEMORY_BUDGET};
