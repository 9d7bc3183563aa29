//! Utility functions for CLI commands.

use anyhow::Context;
use giztoy_gmm::{io, Gmm, InitConfig, MapConfig};
use nalgebra::DMatrix;
use serde::Deserialize;

use crate::Cli;

/// Settings read from `--config`. Missing sections take library defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub init: InitConfig,
    pub map: MapConfig,
}

/// Loads the configuration, or defaults when no file is given.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    match cli.config.as_deref() {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("read config {path}"))?;
            let cfg = serde_yaml::from_str(&content)
                .with_context(|| format!("parse config {path}"))?;
            Ok(cfg)
        }
        None => Ok(Config::default()),
    }
}

/// Loads a data file: a JSON array of equally long rows.
pub fn load_data(path: &str) -> anyhow::Result<DMatrix<f64>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read data {path}"))?;
    let rows: Vec<Vec<f64>> =
        serde_json::from_str(&content).with_context(|| format!("parse data {path}"))?;
    rows_to_matrix(&rows).with_context(|| format!("data {path}"))
}

fn rows_to_matrix(rows: &[Vec<f64>]) -> anyhow::Result<DMatrix<f64>> {
    let Some(first) = rows.first() else {
        anyhow::bail!("no rows");
    };
    let d = first.len();
    if d == 0 {
        anyhow::bail!("empty rows");
    }
    if let Some(i) = rows.iter().position(|r| r.len() != d) {
        anyhow::bail!("row {i} has {} values, want {d}", rows[i].len());
    }
    Ok(DMatrix::from_fn(rows.len(), d, |i, k| rows[i][k]))
}

pub fn load_model(path: &str) -> anyhow::Result<Gmm> {
    io::load(path).with_context(|| format!("load model {path}"))
}

pub fn save_model(gmm: &mut Gmm, path: &str) -> anyhow::Result<()> {
    io::save(gmm, path).with_context(|| format!("save model {path}"))
}
