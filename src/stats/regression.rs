//! Design/response construction and the interceptless OLS statistic
//!
//! X one-hot encodes the binary attribute with the redundant column dropped:
//! a single {0,1} column that is 1 when the utterance carries attribute B.
//! Y holds one transformed context vector per occurrence. The fit is ordinary
//! least squares with no intercept term, and the test statistic is the L2
//! norm of each regressor's coefficient vector ("normed betas").

use super::context::ContextRecord;
use super::{StatError, StatResult};
use crate::embedding::TransformMatrix;
use nalgebra::{DMatrix, DVector};

/// Design and response matrices for one target token.
#[derive(Debug, Clone)]
pub struct Regressors {
    /// N x 1, 1.0 where attribute == B.
    pub x: DMatrix<f64>,
    /// N x D transformed context vectors.
    pub y: DMatrix<f64>,
}

impl Regressors {
    /// Build (X, Y) from a token's context records. The transform's dimension
    /// match against the embedding space is a construction-time invariant of
    /// `TransformMatrix`, so rows here can only agree.
    pub fn build(
        records: &[ContextRecord],
        attribute_b: &str,
        transform: &TransformMatrix,
    ) -> StatResult<Self> {
        if records.is_empty() {
            return Err(StatError::NoContext(String::new()));
        }
        let n = records.len();
        let d = transform.dim();

        let x = DMatrix::from_fn(n, 1, |i, _| {
            if records[i].attribute == attribute_b {
                1.0
            } else {
                0.0
            }
        });

        let mut y = DMatrix::zeros(n, d);
        for (i, record) in records.iter().enumerate() {
            let row = transform.apply(&record.context_vector);
            y.set_row(i, &row.transpose());
        }

        Ok(Self { x, y })
    }

    pub fn nrows(&self) -> usize {
        self.x.nrows()
    }

    /// Y with its rows reordered by `order`; X stays fixed. Used by the
    /// permutation null.
    pub fn permuted_y(&self, order: &[usize]) -> DMatrix<f64> {
        debug_assert_eq!(order.len(), self.y.nrows());
        let mut permuted = DMatrix::zeros(self.y.nrows(), self.y.ncols());
        for (dst, &src) in order.iter().enumerate() {
            permuted.set_row(dst, &self.y.row(src));
        }
        permuted
    }
}

/// Interceptless OLS fit and its normed-coefficient statistic.
#[derive(Debug, Clone)]
pub struct OlsFit {
    /// K x D coefficient matrix (K regressor columns, D output dimensions).
    pub betas: DMatrix<f64>,
    /// Per-regressor L2 norm over the D coefficients.
    pub normed: DVector<f64>,
}

impl OlsFit {
    /// Solve `Y ≈ X·B` by normal equations with no intercept. Mismatched row
    /// counts are a fatal input error; a non-invertible X'X (e.g. an all-zero
    /// design column) is a degenerate fit the caller's trial policy handles.
    pub fn solve(x: &DMatrix<f64>, y: &DMatrix<f64>) -> StatResult<Self> {
        if x.nrows() != y.nrows() {
            return Err(StatError::ShapeMismatch {
                x_rows: x.nrows(),
                y_rows: y.nrows(),
            });
        }
        let xtx = x.transpose() * x;
        let xtx_inv = xtx.try_inverse().ok_or(StatError::SingularFit)?;
        let betas = xtx_inv * x.transpose() * y;

        let normed = DVector::from_fn(betas.nrows(), |k, _| betas.row(k).norm());
        Ok(Self { betas, normed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(attribute: &str, v: &[f64]) -> ContextRecord {
        ContextRecord {
            context_vector: DVector::from_vec(v.to_vec()),
            attribute: attribute.to_string(),
        }
    }

    #[test]
    fn test_single_regressor_closed_form() {
        // X = [[0],[1],[1]], Y = [[2],[4],[6]]: beta = (0+4+6)/(0+1+1) = 5.
        let x = DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 1.0]);
        let y = DMatrix::from_row_slice(3, 1, &[2.0, 4.0, 6.0]);
        let fit = OlsFit::solve(&x, &y).expect("fit");

        assert!((fit.betas[(0, 0)] - 5.0).abs() < 1e-12);
        assert!((fit.normed[0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_normed_statistic_multi_output() {
        // Two output dimensions: beta row is (3, 4), norm 5.
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let y = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 3.0, 4.0]);
        let fit = OlsFit::solve(&x, &y).expect("fit");

        assert_eq!(fit.betas.shape(), (1, 2));
        assert!((fit.normed[0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 1.0]);
        let y = DMatrix::from_row_slice(3, 1, &[1.0, 2.0, 3.0]);
        assert_eq!(
            OlsFit::solve(&x, &y).unwrap_err(),
            StatError::ShapeMismatch { x_rows: 2, y_rows: 3 }
        );
    }

    #[test]
    fn test_all_zero_design_is_singular() {
        let x = DMatrix::from_row_slice(2, 1, &[0.0, 0.0]);
        let y = DMatrix::from_row_slice(2, 1, &[1.0, 2.0]);
        assert_eq!(OlsFit::solve(&x, &y).unwrap_err(), StatError::SingularFit);
    }

    #[test]
    fn test_build_design_encodes_attribute_b() {
        let transform = TransformMatrix::identity(2);
        let records = vec![
            record("M", &[1.0, 2.0]),
            record("F", &[3.0, 4.0]),
            record("F", &[5.0, 6.0]),
        ];
        let reg = Regressors::build(&records, "F", &transform).expect("build");

        assert_eq!(reg.x, DMatrix::from_row_slice(3, 1, &[0.0, 1.0, 1.0]));
        assert_eq!(reg.y.row(1), DMatrix::from_row_slice(1, 2, &[3.0, 4.0]).row(0));
        assert_eq!(reg.nrows(), 3);
    }

    #[test]
    fn test_build_applies_transform() {
        // Transform doubling both dimensions.
        let transform = TransformMatrix::new(
            DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 2.0]),
            2,
        )
        .expect("square transform");
        let records = vec![record("F", &[1.0, 3.0])];
        let reg = Regressors::build(&records, "F", &transform).expect("build");
        assert_eq!(reg.y, DMatrix::from_row_slice(1, 2, &[2.0, 6.0]));
    }

    #[test]
    fn test_build_empty_records_rejected() {
        let transform = TransformMatrix::identity(2);
        assert!(matches!(
            Regressors::build(&[], "F", &transform),
            Err(StatError::NoContext(_))
        ));
    }

    #[test]
    fn test_permuted_y_reorders_rows() {
        let transform = TransformMatrix::identity(1);
        let records = vec![record("M", &[1.0]), record("F", &[2.0]), record("F", &[3.0])];
        let reg = Regressors::build(&records, "F", &transform).expect("build");
        let permuted = reg.permuted_y(&[2, 0, 1]);
        assert_eq!(permuted, DMatrix::from_row_slice(3, 1, &[3.0, 1.0, 2.0]));
    }
}
