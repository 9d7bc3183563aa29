//! Sufficient statistics command.

use clap::Args;
use giztoy_gmm::Order;
use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use super::{load_data, load_model};
use crate::Cli;

/// Print sufficient statistics of data under a model as JSON.
#[derive(Args)]
pub struct StatsCommand {
    /// Model
    #[arg(long)]
    ubm: String,
    /// Data file (JSON array of rows)
    #[arg(short = 'd', long)]
    data: String,
    /// Highest order, 1 or 2
    #[arg(long, default_value_t = 2)]
    order: u8,
    /// Center on the model's means and scale by its variances
    #[arg(long)]
    centered: bool,
}

#[derive(Serialize)]
struct StatsOutput {
    centered: bool,
    n: Vec<f64>,
    f: Vec<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    s: Option<Vec<Vec<f64>>>,
}

impl StatsOutput {
    fn new(centered: bool, n: &DVector<f64>, f: &DMatrix<f64>, s: Option<&DMatrix<f64>>) -> Self {
        Self {
            centered,
            n: n.iter().copied().collect(),
            f: rows(f),
            s: s.map(rows),
        }
    }
}

fn rows(m: &DMatrix<f64>) -> Vec<Vec<f64>> {
    m.row_iter().map(|r| r.iter().copied().collect()).collect()
}

impl StatsCommand {
    pub fn run(&self, _cli: &Cli) -> anyhow::Result<()> {
        let order = Order::try_from(self.order)?;
        let ubm = load_model(&self.ubm)?;
        let x = load_data(&self.data)?;

        let out = if self.centered {
            let cs = ubm.cstats(&x, order)?;
            StatsOutput::new(true, &cs.n, &cs.f, cs.s.as_ref())
        } else {
            let st = ubm.stats(&x, order)?;
            StatsOutput::new(false, &st.n, &st.f, st.s.as_ref())
        };

        println!("{}", serde_json::to_string_pretty(&out)?);
        Ok(())
    }
}
