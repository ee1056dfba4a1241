//! Shared linear-algebra building blocks.
//!
//! `MatVec` is the affine block `x -> Mx + v` produced by the spline
//! equation builder; constraint Jacobians are sparse `CooMatrix` blocks
//! assembled triplet by triplet.

use nalgebra::{DMatrix, DVector, RowDVector};
use nalgebra_sparse::CooMatrix;

use crate::error::FormulationError;

/// Planar dimension count (x, y).
pub const DIM2: usize = 2;

/// Sparse partial-derivative block of one constraint with respect to one
/// named variable set. Rows match the constraint's residual rows, columns
/// match the variable set's scalars.
pub type Jacobian = CooMatrix<f64>;

/// The block returned for a variable set a constraint does not couple to.
pub fn empty_jacobian() -> Jacobian {
    CooMatrix::new(0, 0)
}

/// Densifies a Jacobian block, summing duplicate triplets.
pub fn jacobian_to_dense(jac: &Jacobian) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(jac.nrows(), jac.ncols());
    for (row, col, value) in jac.triplet_iter() {
        dense[(row, col)] += value;
    }
    dense
}

/// An affine map over a coefficient vector: `x -> Mx + v`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatVec {
    pub m: DMatrix<f64>,
    pub v: DVector<f64>,
}

impl MatVec {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            m: DMatrix::zeros(rows, cols),
            v: DVector::zeros(rows),
        }
    }

    pub fn rows(&self) -> usize {
        self.m.nrows()
    }

    pub fn cols(&self) -> usize {
        self.m.ncols()
    }

    /// Row-stacks `other` below `self`. Both blocks must map the same
    /// coefficient vector, so their column counts must agree.
    pub fn stack(self, other: &MatVec) -> Result<MatVec, FormulationError> {
        if self.cols() != other.cols() {
            return Err(FormulationError::StructuralMismatch {
                left: self.cols(),
                right: other.cols(),
            });
        }

        let rows = self.rows() + other.rows();
        let mut m = DMatrix::zeros(rows, self.cols());
        m.view_mut((0, 0), (self.rows(), self.cols())).copy_from(&self.m);
        m.view_mut((self.rows(), 0), (other.rows(), other.cols()))
            .copy_from(&other.m);

        let mut v = DVector::zeros(rows);
        v.rows_mut(0, self.rows()).copy_from(&self.v);
        v.rows_mut(self.rows(), other.rows()).copy_from(&other.v);

        Ok(MatVec { m, v })
    }

    /// Extracts row `r` as a (row-vector, scalar) pair.
    pub fn row(&self, r: usize) -> (RowDVector<f64>, f64) {
        (self.m.row(r).into_owned(), self.v[r])
    }

    /// Sparse view of `M`, for use as a constant Jacobian block.
    pub fn to_sparse(&self) -> Jacobian {
        let mut jac = CooMatrix::new(self.rows(), self.cols());
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                let value = self.m[(row, col)];
                if value != 0.0 {
                    jac.push(row, col, value);
                }
            }
        }
        jac
    }
}
