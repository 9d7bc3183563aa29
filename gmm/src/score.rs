use nalgebra::DMatrix;

use crate::model::Gmm;
use crate::stats::{CenteredStats, Order};
use crate::GmmError;

/// Dot-scoring approximation of the log-likelihood ratio between two
/// datasets' adaptations of the same reference model:
/// `Σ_j Σ_k f_x[j,k] / (N_x[j] + relevance) · f_y[j,k]`.
///
/// Both inputs must be centered statistics against the same model.
pub fn dotscore(x: &CenteredStats, y: &CenteredStats, relevance: f64) -> Result<f64, GmmError> {
    if x.f.shape() != y.f.shape() {
        let (expected, got) = if x.f.nrows() != y.f.nrows() {
            (x.f.nrows(), y.f.nrows())
        } else {
            (x.f.ncols(), y.f.ncols())
        };
        return Err(GmmError::DimensionMismatch { expected, got });
    }
    if x.n.len() != x.f.nrows() {
        return Err(GmmError::DimensionMismatch {
            expected: x.f.nrows(),
            got: x.n.len(),
        });
    }

    let mut score = 0.0;
    for j in 0..x.f.nrows() {
        let scale = 1.0 / (x.n[j] + relevance);
        score += scale * x.f.row(j).dot(&y.f.row(j));
    }
    Ok(score)
}

impl Gmm {
    /// [`dotscore`] of two raw datasets against this model, using first
    /// order centered statistics.
    pub fn dotscore_data(
        &self,
        x: &DMatrix<f64>,
        y: &DMatrix<f64>,
        relevance: f64,
    ) -> Result<f64, GmmError> {
        let sx = self.cstats(x, Order::First)?;
        let sy = self.cstats(y, Order::First)?;
        dotscore(&sx, &sy, relevance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::model::CovarianceKind;
    use nalgebra::DVector;

    fn ubm() -> Gmm {
        Gmm::from_parts(
            DVector::from_vec(vec![0.5, 0.5]),
            DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 1.0, 0.0]),
            DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]),
            CovarianceKind::Diag,
            History::starting_with("ubm"),
        )
        .unwrap()
    }

    #[test]
    fn dotscore_hand_computed() {
        let x = CenteredStats {
            n: DVector::from_vec(vec![1.0, 3.0]),
            f: DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 1.0, -1.0]),
            s: None,
        };
        let y = CenteredStats {
            n: DVector::from_vec(vec![5.0, 5.0]),
            f: DMatrix::from_row_slice(2, 2, &[1.0, 4.0, 2.0, 2.0]),
            s: None,
        };
        // (2*1 + 0*4) / (1 + 1) + (1*2 - 1*2) / (3 + 1) = 1.
        let score = dotscore(&x, &y, 1.0).unwrap();
        assert!((score - 1.0).abs() < 1e-12);
        // Relevance applies to x's counts only.
        let score = dotscore(&x, &y, 3.0).unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn dotscore_identical_data_is_reproducible() {
        let g = ubm();
        let x = DMatrix::from_row_slice(4, 2, &[-1.3, 0.4, -0.6, -0.2, 1.4, 0.9, 0.8, -0.5]);
        let a = g.dotscore_data(&x, &x, 1.0).unwrap();
        let b = g.dotscore_data(&x, &x.clone(), 1.0).unwrap();
        assert_eq!(a, b);
        // Self-similarity of a dataset is a sum of non-negative terms.
        assert!(a > 0.0);
    }

    #[test]
    fn dotscore_matches_hand_computed_value() {
        // Points on the x0 = 0 midline are shared equally by both
        // components: N = (1.5, 1.5), F = (0, 1.5) for each.
        // Centered f_0 = F - N·(-1, 0) = (1.5, 1.5), f_1 = (-1.5, 1.5).
        // Score = 2 · (1.5² + 1.5²) / (1.5 + 1) = 3.6.
        let g = ubm();
        let x = DMatrix::from_row_slice(3, 2, &[0.0, 2.0, 0.0, -1.0, 0.0, 2.0]);
        let cs = g.cstats(&x, Order::First).unwrap();
        assert!((cs.n[0] - 1.5).abs() < 1e-12);
        assert!((cs.f[(0, 0)] - 1.5).abs() < 1e-12);
        assert!((cs.f[(1, 0)] + 1.5).abs() < 1e-12);

        let score = g.dotscore_data(&x, &x, 1.0).unwrap();
        assert!((score - 3.6).abs() < 1e-12, "got {score}");
    }

    #[test]
    fn dotscore_prefers_matching_data() {
        let g = ubm();
        let left = DMatrix::from_row_slice(3, 2, &[-2.0, 1.0, -1.8, 1.2, -2.2, 0.9]);
        let right = DMatrix::from_row_slice(3, 2, &[2.0, -1.0, 1.8, -1.2, 2.2, -0.9]);
        let same = g.dotscore_data(&left, &left, 1.0).unwrap();
        let other = g.dotscore_data(&left, &right, 1.0).unwrap();
        assert!(same > other, "same {same} other {other}");
    }

    #[test]
    fn dotscore_rejects_shape_mismatch() {
        let x = CenteredStats {
            n: DVector::zeros(2),
            f: DMatrix::zeros(2, 3),
            s: None,
        };
        let y = CenteredStats {
            n: DVector::zeros(2),
            f: DMatrix::zeros(2, 4),
            s: None,
        };
        assert!(matches!(
            dotscore(&x, &y, 1.0),
            Err(GmmError::DimensionMismatch { expected: 3, got: 4 })
        ));
    }
}
