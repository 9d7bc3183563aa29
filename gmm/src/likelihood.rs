use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

use crate::model::Gmm;
use crate::GmmError;

impl Gmm {
    /// Per-point, per-component Gaussian log-likelihood.
    ///
    /// Returns an `nx × n` matrix whose entry `(i, j)` is `log p(x_i | j)`
    /// under component `j`'s diagonal Gaussian. Mixing weights are not applied.
    pub fn llpg(&self, x: &DMatrix<f64>) -> Result<DMatrix<f64>, GmmError> {
        self.ensure_diag()?;
        self.ensure_dim(x)?;

        let (nx, d) = x.shape();
        let n = self.n();
        let half_d_log_2pi = 0.5 * d as f64 * (2.0 * PI).ln();

        let mut ll = DMatrix::zeros(nx, n);
        for j in 0..n {
            let mean = self.means.row(j);
            let var = self.variances.row(j);
            let log_norm = half_d_log_2pi + 0.5 * var.iter().map(|v| v.ln()).sum::<f64>();
            for i in 0..nx {
                let mut mahalanobis = 0.0;
                for k in 0..d {
                    let diff = x[(i, k)] - mean[k];
                    mahalanobis += diff * diff / var[k];
                }
                ll[(i, j)] = -0.5 * mahalanobis - log_norm;
            }
        }
        Ok(ll)
    }

    /// Posterior responsibilities and per-component likelihoods.
    ///
    /// Returns `(posterior, likelihood)`, both `nx × n`, where
    /// `likelihood = exp(llpg)` and each posterior row is the weighted
    /// likelihood normalized to sum to 1. A point whose weighted likelihood
    /// underflows to zero for every component gets an all-zero posterior row.
    pub fn post(&self, x: &DMatrix<f64>) -> Result<(DMatrix<f64>, DMatrix<f64>), GmmError> {
        let likelihood = self.llpg(x)?.map(f64::exp);
        let mut posterior = likelihood.clone();
        for (j, mut col) in posterior.column_iter_mut().enumerate() {
            col *= self.weights[j];
        }
        normalize_rows(&mut posterior);
        Ok((posterior, likelihood))
    }

    /// Average log-likelihood of `x`, normalized by point count and dimension.
    ///
    /// This is the quantity [`Gmm::em`] reports per iteration.
    pub fn avll(&self, x: &DMatrix<f64>) -> Result<f64, GmmError> {
        if x.nrows() == 0 {
            return Err(GmmError::EmptyData);
        }
        let likelihood = self.llpg(x)?.map(f64::exp);
        let total = total_log_likelihood(&likelihood, &self.weights);
        Ok(total / (x.nrows() * x.ncols()) as f64)
    }
}

/// Divides each row by its sum. A row summing to exactly zero is divided
/// by 1 instead and stays all-zero.
pub(crate) fn normalize_rows(m: &mut DMatrix<f64>) {
    for mut row in m.row_iter_mut() {
        let mut sum = row.sum();
        if sum == 0.0 {
            sum = 1.0;
        }
        row /= sum;
    }
}

/// `Σ_i log Σ_j w_j · likelihood_ij`.
pub(crate) fn total_log_likelihood(likelihood: &DMatrix<f64>, weights: &DVector<f64>) -> f64 {
    (likelihood * weights).iter().map(|p| p.ln()).sum()
}
