use nalgebra::DMatrix;
use serde::Deserialize;

use crate::model::Gmm;
use crate::stats::{Order, Stats};
use crate::GmmError;

/// Configures [`Gmm::map_adapt`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Relevance factor `r` in `α_j = N_j / (N_j + r)` (default: 16).
    pub relevance: f64,
    /// Adapt means (default: true).
    pub means: bool,
    /// Adapt weights (default: false).
    pub weights: bool,
    /// Adapt variances (default: false).
    pub covars: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            relevance: 16.0,
            means: true,
            weights: false,
            covars: false,
        }
    }
}

impl Gmm {
    /// Maximum-a-posteriori adaptation of this model towards `x`.
    ///
    /// Returns a new model; `self` is not modified. Parameter groups that
    /// are not enabled in `cfg` are copied unchanged. A component with zero
    /// soft count has `α_j = 0` and keeps its parameters.
    pub fn map_adapt(&self, x: &DMatrix<f64>, cfg: &MapConfig) -> Result<Self, GmmError> {
        let Stats { n, f, s } = self.stats(x, Order::Second)?;
        let s = s.ok_or(GmmError::OrderMismatch)?;

        let alpha = n.map(|nj| nj / (nj + cfg.relevance));
        // α_j / N_j, zero when N_j is zero.
        let alpha_per_count = alpha.zip_map(&n, |a, nj| if nj > 0.0 { a / nj } else { 0.0 });

        let mut weights = self.weights.clone();
        if cfg.weights {
            let total = n.sum();
            for j in 0..self.n() {
                let share = if total > 0.0 { n[j] / total } else { 0.0 };
                weights[j] = alpha[j] * share + (1.0 - alpha[j]) * self.weights[j];
            }
            let total_weight = weights.sum();
            weights /= total_weight;
        }

        let mut means = self.means.clone();
        if cfg.means {
            for j in 0..self.n() {
                let adapted = f.row(j) * alpha_per_count[j] + self.means.row(j) * (1.0 - alpha[j]);
                means.set_row(j, &adapted);
            }
        }

        let mut variances = self.variances.clone();
        if cfg.covars {
            for j in 0..self.n() {
                let mu = self.means.row(j);
                let prior = &self.variances.row(j) + &mu.component_mul(&mu);
                let new_mu = means.row(j);
                let adapted = s.row(j) * alpha_per_count[j] + prior * (1.0 - alpha[j])
                    - new_mu.component_mul(&new_mu);
                variances.set_row(j, &adapted);
            }
        }

        let mut adapted = Vec::new();
        if cfg.means {
            adapted.push("means");
        }
        if cfg.weights {
            adapted.push("weights");
        }
        if cfg.covars {
            adapted.push("covars");
        }
        let adapted = if adapted.is_empty() {
            "nothing".to_string()
        } else {
            adapted.join(", ")
        };

        Ok(Self {
            kind: self.kind,
            weights,
            means,
            variances,
            history: self.history.derive(format!(
                "MAP adapted with {} data points relevance {} {adapted}",
                x.nrows(),
                cfg.relevance
            )),
        })
    }
}
