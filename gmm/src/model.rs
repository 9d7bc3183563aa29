use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};

use crate::history::History;
use crate::GmmError;

/// Shape of the per-component covariance.
///
/// Only [`CovarianceKind::Diag`] is implemented; numeric operations on a
/// `Full` model fail with [`GmmError::Unimplemented`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovarianceKind {
    Diag,
    Full,
}

impl CovarianceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diag => "diag",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for CovarianceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CovarianceKind {
    type Err = GmmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diag" => Ok(Self::Diag),
            "full" => Ok(Self::Full),
            other => Err(GmmError::UnknownKind(other.to_string())),
        }
    }
}

/// A Gaussian mixture model with `n` components in `d` dimensions.
///
/// # Invariants
///
/// - `weights.len() == means.nrows() == variances.nrows() == n`
/// - `means.ncols() == variances.ncols() == d`
/// - weights are non-negative and sum to 1
///
/// # Ownership contract
///
/// [`Gmm::em`] is the only operation that mutates a model in place.
/// [`Gmm::split`] and [`Gmm::map_adapt`] borrow the model and return a new
/// one whose history is the parent's plus one record.
///
/// Cloning deep-copies the parameters and appends a `copied` record to the
/// clone's history.
#[derive(Debug)]
pub struct Gmm {
    pub(crate) kind: CovarianceKind,
    pub(crate) weights: DVector<f64>,
    pub(crate) means: DMatrix<f64>,
    pub(crate) variances: DMatrix<f64>,
    pub(crate) history: History,
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl Gmm {
    /// Assembles a model from its parameters, validating shapes and weights.
    pub fn from_parts(
        weights: DVector<f64>,
        means: DMatrix<f64>,
        variances: DMatrix<f64>,
        kind: CovarianceKind,
        history: History,
    ) -> Result<Self, GmmError> {
        let sum = weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(GmmError::InvalidModel(format!(
                "weights sum to {sum}, want 1"
            )));
        }
        Self::from_shapes(weights, means, variances, kind, history)
    }

    /// Like [`Gmm::from_parts`] without the weight-sum check. EM leaves the
    /// weights short of 1 when some points get no responsibility, and such
    /// models must still load.
    pub(crate) fn from_shapes(
        weights: DVector<f64>,
        means: DMatrix<f64>,
        variances: DMatrix<f64>,
        kind: CovarianceKind,
        history: History,
    ) -> Result<Self, GmmError> {
        let n = weights.len();
        if n == 0 {
            return Err(GmmError::InvalidModel("no components".into()));
        }
        if means.nrows() != n || variances.nrows() != n {
            return Err(GmmError::InvalidModel(format!(
                "{n} weights but {} mean rows and {} variance rows",
                means.nrows(),
                variances.nrows()
            )));
        }
        if means.ncols() == 0 || means.ncols() != variances.ncols() {
            return Err(GmmError::InvalidModel(format!(
                "means have {} columns, variances have {}",
                means.ncols(),
                variances.ncols()
            )));
        }
        if weights.iter().any(|&w| !(w >= 0.0)) {
            return Err(GmmError::InvalidModel("negative or NaN weight".into()));
        }
        if variances.iter().any(|&v| !(v >= 0.0)) {
            return Err(GmmError::InvalidModel("negative or NaN variance".into()));
        }
        Ok(Self {
            kind,
            weights,
            means,
            variances,
            history,
        })
    }

    /// Number of mixture components.
    pub fn n(&self) -> usize {
        self.weights.len()
    }

    /// Feature dimensionality.
    pub fn d(&self) -> usize {
        self.means.ncols()
    }

    pub fn kind(&self) -> CovarianceKind {
        self.kind
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    pub fn means(&self) -> &DMatrix<f64> {
        &self.means
    }

    pub fn variances(&self) -> &DMatrix<f64> {
        &self.variances
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Appends a record to this model's history.
    pub fn add_history(&mut self, message: impl Into<String>) {
        self.history.push(message);
    }

    /// Fails unless the model has diagonal covariance.
    pub(crate) fn ensure_diag(&self) -> Result<(), GmmError> {
        match self.kind {
            CovarianceKind::Diag => Ok(()),
            CovarianceKind::Full => Err(GmmError::Unimplemented(self.kind.to_string())),
        }
    }

    /// Fails unless `x` has one column per model dimension.
    pub(crate) fn ensure_dim(&self, x: &DMatrix<f64>) -> Result<(), GmmError> {
        if x.ncols() != self.d() {
            return Err(GmmError::DimensionMismatch {
                expected: self.d(),
                got: x.ncols(),
            });
        }
        Ok(())
    }
}

impl Clone for Gmm {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            weights: self.weights.clone(),
            means: self.means.clone(),
            variances: self.variances.clone(),
            history: self.history.derive("copied"),
        }
    }
}

impl fmt::Display for Gmm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "GMM with {} components in {} dimensions and {} covariance",
            self.n(),
            self.d(),
            self.kind
        )?;
        for j in 0..self.n() {
            writeln!(f, "Mix {}: weight {:.6}", j + 1, self.weights[j])?;
            writeln!(f, "  mean: {}", format_row(self.means.row(j).iter()))?;
            writeln!(f, "  variance: {}", format_row(self.variances.row(j).iter()))?;
        }
        Ok(())
    }
}

fn format_row<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    let parts: Vec<String> = values.map(|v| format!("{v:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
