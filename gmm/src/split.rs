use nalgebra::{DMatrix, DVector, RowDVector};
use serde::Deserialize;
use tracing::info;

use crate::history::History;
use crate::model::{CovarianceKind, Gmm};
use crate::train::EmConfig;
use crate::GmmError;

/// Configures [`Gmm::split`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Components lighter than this are relocated next to the heaviest
    /// component before splitting (default: 1e-5).
    pub min_weight: f64,
    /// Child means are offset by `cov_factor · sqrt(variance)` (default: 0.2).
    pub cov_factor: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            min_weight: 1e-5,
            cov_factor: 0.2,
        }
    }
}

/// Configures [`Gmm::binary_split`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InitConfig {
    /// EM iterations after each intermediate split (default: 10).
    pub n_iter: usize,
    /// EM iterations after the last split (default: 10).
    pub n_final: usize,
    pub split: SplitConfig,
    /// EM settings; `n_iter` is overridden per stage.
    pub em: EmConfig,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            n_iter: 10,
            n_final: 10,
            split: SplitConfig::default(),
            em: EmConfig::default(),
        }
    }
}

impl Gmm {
    /// Fits a single diagonal Gaussian to `x`: sample mean and unbiased
    /// sample variance per column. A single point yields zero variance.
    pub fn from_data(x: &DMatrix<f64>) -> Result<Self, GmmError> {
        let nx = x.nrows();
        if nx == 0 {
            return Err(GmmError::EmptyData);
        }
        let mean: RowDVector<f64> = x.row_mean();
        let mut var: RowDVector<f64> = x.row_variance();
        if nx > 1 {
            var *= nx as f64 / (nx - 1) as f64;
        }
        Ok(Self {
            kind: CovarianceKind::Diag,
            weights: DVector::from_element(1, 1.0),
            means: DMatrix::from_rows(&[mean]),
            variances: DMatrix::from_rows(&[var]),
            history: History::starting_with(format!(
                "Initialized single Gaussian with {nx} data points"
            )),
        })
    }

    /// Trains an `n`-component model by repeated splitting, starting from a
    /// single Gaussian. `n` must be a power of two.
    ///
    /// Each round doubles the component count and runs `cfg.n_iter` EM
    /// iterations, `cfg.n_final` after the last split.
    pub fn binary_split(n: usize, x: &DMatrix<f64>, cfg: &InitConfig) -> Result<Self, GmmError> {
        if !n.is_power_of_two() {
            return Err(GmmError::NotPowerOfTwo(n));
        }
        let rounds = n.trailing_zeros() as usize;

        let mut gmm = Self::from_data(x)?;
        info!(components = 1, avll = gmm.avll(x)?, "gmm: initial");
        for round in 1..=rounds {
            gmm = gmm.split(&cfg.split)?;
            let em = EmConfig {
                n_iter: if round == rounds { cfg.n_final } else { cfg.n_iter },
                ..cfg.em.clone()
            };
            let history = gmm.em(x, &em)?;
            let avll = history.last().copied().unwrap_or(f64::NAN);
            info!(components = gmm.n(), avll, "gmm: split stage");
        }
        Ok(gmm)
    }

    /// Returns a model with twice as many components.
    ///
    /// Components lighter than `cfg.min_weight` are first moved next to the
    /// heaviest component and take half its weight on top of their own, so
    /// the weights still sum to 1. Every component `i` then
    /// becomes children `2i` and `2i + 1` with half the weight and the same
    /// variance, their means shifted by `∓ cov_factor · sqrt(variance)` in
    /// every dimension (lower index negative). `self` is left untouched.
    pub fn split(&self, cfg: &SplitConfig) -> Result<Self, GmmError> {
        self.ensure_diag()?;

        let mut weights = self.weights.clone();
        let mut means = self.means.clone();
        let variances = &self.variances;

        let dead: Vec<usize> = (0..self.n())
            .filter(|&j| self.weights[j] < cfg.min_weight)
            .collect();
        for j in dead {
            let heaviest = weights.imax();
            let w = weights[heaviest] / 2.0;
            weights[heaviest] = w;
            weights[j] += w;
            let offset = variances.row(heaviest).map(f64::sqrt) * cfg.cov_factor;
            let center = means.row(heaviest).clone_owned();
            means.set_row(j, &(&center + &offset));
            means.set_row(heaviest, &(&center - &offset));
        }

        let n = self.n();
        let d = self.d();
        let mut new_weights = DVector::zeros(2 * n);
        let mut new_means = DMatrix::zeros(2 * n, d);
        let mut new_variances = DMatrix::zeros(2 * n, d);
        for i in 0..n {
            let offset = variances.row(i).map(f64::sqrt) * cfg.cov_factor;
            let mean = means.row(i);
            for (child, sign) in [(2 * i, -1.0), (2 * i + 1, 1.0)] {
                new_weights[child] = weights[i] / 2.0;
                let shift = &offset * sign;
                new_means.set_row(child, &(&mean + &shift));
                new_variances.set_row(child, &variances.row(i));
            }
        }

        Ok(Self {
            kind: self.kind,
            weights: new_weights,
            means: new_means,
            variances: new_variances,
            history: self.history.derive(format!("split to {} components", 2 * n)),
        })
    }
}
