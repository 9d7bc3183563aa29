use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};

use crate::likelihood::normalize_rows;
use crate::model::Gmm;
use crate::train::block_rows;
use crate::GmmError;

/// Highest order of sufficient statistics to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Zeroth and first order: `N`, `F`.
    First,
    /// Zeroth, first and second order: `N`, `F`, `S`.
    Second,
}

impl TryFrom<u8> for Order {
    type Error = GmmError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(GmmError::InvalidOrder(other)),
        }
    }
}

/// Sufficient statistics of a dataset under a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// Zeroth order (soft counts), length `n`.
    pub n: DVector<f64>,
    /// First order, `n × d`.
    pub f: DMatrix<f64>,
    /// Second order, `n × d`. Present only for [`Order::Second`].
    pub s: Option<DMatrix<f64>>,
}

/// Statistics centered on the model's means and scaled by its variances.
#[derive(Debug, Clone, PartialEq)]
pub struct CenteredStats {
    /// Zeroth order, kept for relevance weighting.
    pub n: DVector<f64>,
    /// `(F_j - N_j μ_j) / σ²_j`.
    pub f: DMatrix<f64>,
    /// `(S_j - (2F_j + N_j μ_j) μ_j) / σ²_j`. Present only for [`Order::Second`].
    pub s: Option<DMatrix<f64>>,
}

impl Stats {
    pub fn order(&self) -> Order {
        if self.s.is_some() {
            Order::Second
        } else {
            Order::First
        }
    }

    /// Adds another set of statistics computed against the same model.
    pub fn accumulate(&mut self, other: &Stats) -> Result<(), GmmError> {
        if other.f.nrows() != self.f.nrows() {
            return Err(GmmError::DimensionMismatch {
                expected: self.f.nrows(),
                got: other.f.nrows(),
            });
        }
        if other.f.ncols() != self.f.ncols() {
            return Err(GmmError::DimensionMismatch {
                expected: self.f.ncols(),
                got: other.f.ncols(),
            });
        }
        match (&mut self.s, &other.s) {
            (Some(s), Some(os)) => *s += os,
            (None, None) => {}
            _ => return Err(GmmError::OrderMismatch),
        }
        self.n += &other.n;
        self.f += &other.f;
        Ok(())
    }
}

impl Gmm {
    /// Zeroth, first and optionally second order statistics of `x`.
    ///
    /// Responsibilities are evaluated directly from precisions rather than
    /// through [`Gmm::post`]; the results agree to floating-point tolerance.
    pub fn stats(&self, x: &DMatrix<f64>, order: Order) -> Result<Stats, GmmError> {
        self.ensure_diag()?;
        self.ensure_dim(x)?;

        let gamma = self.responsibilities(x);
        let n = gamma.row_sum().transpose();
        let f = gamma.tr_mul(x);
        let s = match order {
            Order::First => None,
            Order::Second => Some(gamma.tr_mul(&x.component_mul(x))),
        };
        Ok(Stats { n, f, s })
    }

    /// Same as [`Gmm::stats`] but processes `x` in row blocks bounded by
    /// `memory_budget` bytes.
    pub fn stats_batched(
        &self,
        x: &DMatrix<f64>,
        order: Order,
        memory_budget: usize,
    ) -> Result<Stats, GmmError> {
        self.ensure_diag()?;
        self.ensure_dim(x)?;

        let block = block_rows(memory_budget, self.n());
        let mut total = Stats {
            n: DVector::zeros(self.n()),
            f: DMatrix::zeros(self.n(), self.d()),
            s: match order {
                Order::First => None,
                Order::Second => Some(DMatrix::zeros(self.n(), self.d())),
            },
        };
        let mut start = 0;
        while start < x.nrows() {
            let rows = block.min(x.nrows() - start);
            let chunk = x.rows(start, rows).clone_owned();
            total.accumulate(&self.stats(&chunk, order)?)?;
            start += rows;
        }
        Ok(total)
    }

    /// Statistics centered and scaled by this model's means and variances.
    pub fn cstats(&self, x: &DMatrix<f64>, order: Order) -> Result<CenteredStats, GmmError> {
        let Stats { n, f, s } = self.stats(x, order)?;

        let mut nmu = self.means.clone();
        for (j, mut row) in nmu.row_iter_mut().enumerate() {
            row *= n[j];
        }

        let fc = (&f - &nmu).component_div(&self.variances);
        let sc = s.map(|s| {
            let shifted = (&f * 2.0 + &nmu).component_mul(&self.means);
            (s - shifted).component_div(&self.variances)
        });
        Ok(CenteredStats { n, f: fc, s: sc })
    }

    /// `nx × n` responsibilities computed from precisions:
    /// `γ_ij ∝ a_j · exp(x_i·(μ_j/σ²_j) - ½ x_i²·(1/σ²_j))`, where `a_j`
    /// folds in the weight, normalizer and `exp(-½ μ_j²/σ²_j)`.
    /// Rows with zero total mass stay zero.
    fn responsibilities(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let d = self.d();
        let prec = self.variances.map(|v| 1.0 / v);
        let mean_prec = self.means.component_mul(&prec);
        let half_d_log_2pi = 0.5 * d as f64 * (2.0 * PI).ln();

        let log_a: Vec<f64> = (0..self.n())
            .map(|j| {
                let log_det: f64 = self.variances.row(j).iter().map(|v| v.ln()).sum();
                let mu_prec_mu = self.means.row(j).dot(&mean_prec.row(j));
                self.weights[j].ln() - half_d_log_2pi - 0.5 * log_det - 0.5 * mu_prec_mu
            })
            .collect();

        let xx = x.component_mul(x);
        let mut gamma = x * mean_prec.transpose() - (xx * prec.transpose()) * 0.5;
        for (j, mut col) in gamma.column_iter_mut().enumerate() {
            col.apply(|v| *v = (*v + log_a[j]).exp());
        }
        normalize_rows(&mut gamma);
        gamma
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use crate::model::CovarianceKind;

    fn model() -> Gmm {
        Gmm::from_parts(
            DVector::from_vec(vec![0.2, 0.5, 0.3]),
            DMatrix::from_row_slice(3, 2, &[-1.0, 0.0, 0.5, 0.5, 2.0, -1.0]),
            DMatrix::from_row_slice(3, 2, &[0.8, 1.2, 0.5, 0.5, 1.5, 0.7]),
            CovarianceKind::Diag,
            History::starting_with("test"),
        )
        .unwrap()
    }

    fn data() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            6,
            2,
            &[
                -1.2, 0.3, 0.4, 0.6, 2.2, -0.9, 0.0, 0.0, 1.5, -0.5, -0.7, 1.1,
            ],
        )
    }

    fn assert_close(a: &DMatrix<f64>, b: &DMatrix<f64>, tol: f64) {
        assert_eq!(a.shape(), b.shape());
        for (x, y) in a.iter().zip(b.iter()) {
            assert!((x - y).abs() <= tol * (1.0 + y.abs()), "{x} vs {y}");
        }
    }

    #[test]
    fn order_from_u8() {
        assert_eq!(Order::try_from(1).unwrap(), Order::First);
        assert_eq!(Order::try_from(2).unwrap(), Order::Second);
        assert!(matches!(Order::try_from(3), Err(GmmError::InvalidOrder(3))));
    }

    #[test]
    fn stats_shapes() {
        let st = model().stats(&data(), Order::First).unwrap();
        assert_eq!(st.n.len(), 3);
        assert_eq!(st.f.shape(), (3, 2));
        assert!(st.s.is_none());
        assert_eq!(st.order(), Order::First);

        let st = model().stats(&data(), Order::Second).unwrap();
        assert_eq!(st.s.as_ref().unwrap().shape(), (3, 2));
        assert!((st.n.sum() - 6.0).abs() < 1e-10);
    }

    #[test]
    fn stats_agree_with_posterior() {
        let g = model();
        let x = data();
        let (p, _) = g.post(&x).unwrap();
        let n = p.row_sum().transpose();
        let f = p.tr_mul(&x);
        let s = p.tr_mul(&x.component_mul(&x));

        let st = g.stats(&x, Order::Second).unwrap();
        for j in 0..g.n() {
            assert!((st.n[j] - n[j]).abs() < 1e-10);
        }
        assert_close(&st.f, &f, 1e-10);
        assert_close(st.s.as_ref().unwrap(), &s, 1e-10);
    }

    #[test]
    fn stats_zero_mass_point_contributes_nothing() {
        let g = model();
        let mut x = data();
        let st = g.stats(&x, Order::First).unwrap();
        x = x.insert_row(6, 0.0);
        x[(6, 0)] = 1e6;
        x[(6, 1)] = -1e6;
        let st2 = g.stats(&x, Order::First).unwrap();
        assert!(st2.n.iter().all(|v| v.is_finite()));
        assert!((st2.n.sum() - st.n.sum()).abs() < 1e-10);
    }

    #[test]
    fn stats_batched_matches_unbatched() {
        let g = model();
        let x = data();
        let full = g.stats(&x, Order::Second).unwrap();
        // Room for one row per block.
        let budget = (3 + 3 * g.n()) * std::mem::size_of::<f64>();
        let batched = g.stats_batched(&x, Order::Second, budget).unwrap();
        for j in 0..g.n() {
            assert!((full.n[j] - batched.n[j]).abs() < 1e-10);
        }
        assert_close(&batched.f, &full.f, 1e-10);
        assert_close(batched.s.as_ref().unwrap(), full.s.as_ref().unwrap(), 1e-10);
    }

    #[test]
    fn accumulate_rejects_order_mismatch() {
        let g = model();
        let mut a = g.stats(&data(), Order::First).unwrap();
        let b = g.stats(&data(), Order::Second).unwrap();
        assert!(matches!(a.accumulate(&b), Err(GmmError::OrderMismatch)));
    }

    #[test]
    fn cstats_formula() {
        let g = model();
        let x = data();
        let st = g.stats(&x, Order::Second).unwrap();
        let cs = g.cstats(&x, Order::Second).unwrap();
        let s = st.s.as_ref().unwrap();
        let cs_s = cs.s.as_ref().unwrap();
        for j in 0..g.n() {
            for k in 0..g.d() {
                let mu = g.means()[(j, k)];
                let var = g.variances()[(j, k)];
                let f = (st.f[(j, k)] - st.n[j] * mu) / var;
                let sc = (s[(j, k)] - (2.0 * st.f[(j, k)] + st.n[j] * mu) * mu) / var;
                assert!((cs.f[(j, k)] - f).abs() < 1e-10);
                assert!((cs_s[(j, k)] - sc).abs() < 1e-10);
            }
        }
        assert_eq!(cs.n, st.n);
    }

    #[test]
    fn cstats_first_order_has_no_second() {
        let cs = model().cstats(&data(), Order::First).unwrap();
        assert!(cs.s.is_none());
    }

    #[test]
    fn stats_rejects_full_and_mismatch() {
        let mut g = model();
        assert!(matches!(
            g.stats(&DMatrix::zeros(2, 3), Order::First),
            Err(GmmError::DimensionMismatch { .. })
        ));
        g.kind = CovarianceKind::Full;
        assert!(matches!(
            g.cstats(&data(), Order::First),
            Err(GmmError::Unimplemented(_))
        ));
    }
}
