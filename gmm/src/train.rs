use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::likelihood::total_log_likelihood;
use crate::model::Gmm;
use crate::GmmError;

/// Default E-step memory budget: 2 GiB.
pub const DEFAULT_MEMORY_BUDGET: usize = 2 << 30;

/// Configures [`Gmm::em`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmConfig {
    /// Number of EM iterations to run (default: 10). There is no early stop.
    pub n_iter: usize,
    /// Variance floor (default: 1e-3). A component with any variance below
    /// this after an M-step has its whole variance row reset to the value
    /// it had before training started.
    pub var_floor: f64,
    /// Compute the log-likelihood on every iteration instead of only the
    /// last one (default: true).
    pub logll: bool,
    /// Upper bound in bytes on the E-step working set (default: 2 GiB).
    pub memory_budget: usize,
}

impl Default for EmConfig {
    fn default() -> Self {
        Self {
            n_iter: 10,
            var_floor: 1e-3,
            logll: true,
            memory_budget: DEFAULT_MEMORY_BUDGET,
        }
    }
}

/// Number of data rows processed per E-step block so that the posterior,
/// likelihood and block buffers of an `n_components` model fit in
/// `memory_budget` bytes. Always at least 1.
pub fn block_rows(memory_budget: usize, n_components: usize) -> usize {
    let row_bytes = (3 + 3 * n_components) * std::mem::size_of::<f64>();
    (memory_budget / row_bytes).max(1)
}

impl Gmm {
    /// Runs `cfg.n_iter` EM iterations on `x`, updating the model in place.
    ///
    /// Returns one average log-likelihood per iteration, normalized by
    /// `nx · d` and evaluated with the parameters entering that iteration.
    /// Entries for iterations where the log-likelihood was not computed
    /// (`cfg.logll == false`, all but the last) are NaN.
    pub fn em(&mut self, x: &DMatrix<f64>, cfg: &EmConfig) -> Result<Vec<f64>, GmmError> {
        self.ensure_diag()?;
        self.ensure_dim(x)?;
        let (nx, d) = x.shape();
        if nx == 0 {
            return Err(GmmError::EmptyData);
        }

        let n = self.n();
        let initial_variances = self.variances.clone();
        let block = block_rows(cfg.memory_budget, n);
        debug!(nx, block, "gmm: em block size");

        let mut history = Vec::with_capacity(cfg.n_iter);
        for iter in 0..cfg.n_iter {
            let want_ll = cfg.logll || iter + 1 == cfg.n_iter;

            // E-step, accumulated block by block.
            let mut denom = DVector::<f64>::zeros(n);
            let mut sx = DMatrix::<f64>::zeros(n, d);
            let mut sxx = DMatrix::<f64>::zeros(n, d);
            let mut ll = 0.0;
            let mut start = 0;
            while start < nx {
                let rows = block.min(nx - start);
                let xb = x.rows(start, rows).clone_owned();
                let (post, likelihood) = self.post(&xb)?;
                denom += post.row_sum().transpose();
                sx += post.tr_mul(&xb);
                sxx += post.tr_mul(&xb.component_mul(&xb));
                if want_ll {
                    ll += total_log_likelihood(&likelihood, &self.weights);
                }
                start += rows;
            }

            self.maximize(&denom, &sx, &sxx, nx);

            let floored = self.floor_variances(cfg.var_floor, &initial_variances);
            if floored > 0 {
                warn!(
                    iter = iter + 1,
                    components = floored,
                    "gmm: variances below floor, reset to initial values"
                );
            }

            let avll = if want_ll { ll / (nx * d) as f64 } else { f64::NAN };
            debug!(iter = iter + 1, avll, "gmm: em iteration");
            history.push(avll);
        }

        let final_avll = history.last().copied().unwrap_or(f64::NAN);
        self.history.push(format!(
            "EM with {nx} data points {} iterations avll {final_avll:.6}",
            cfg.n_iter
        ));
        Ok(history)
    }

    /// M-step. A component that received no responsibility keeps its
    /// previous mean and variance.
    fn maximize(&mut self, denom: &DVector<f64>, sx: &DMatrix<f64>, sxx: &DMatrix<f64>, nx: usize) {
        self.weights = denom / nx as f64;
        for j in 0..self.n() {
            if denom[j] == 0.0 {
                warn!(component = j, "gmm: component received no responsibility");
                continue;
            }
            let mean = sx.row(j) / denom[j];
            let var = sxx.row(j) / denom[j] - mean.component_mul(&mean);
            self.means.set_row(j, &mean);
            self.variances.set_row(j, &var);
        }
    }

    /// Resets every component row holding a variance below `floor` to the
    /// matching row of `initial`. Returns the number of rows reset.
    fn floor_variances(&mut self, floor: f64, initial: &DMatrix<f64>) -> usize {
        let mut count = 0;
        for j in 0..self.n() {
            if self.variances.row(j).iter().any(|&v| v < floor) {
                self.variances.set_row(j, &initial.row(j));
                count += 1;
            }
        }
        count
    }
}
