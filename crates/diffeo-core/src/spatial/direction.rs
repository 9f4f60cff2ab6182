//! Direction cosine matrix describing the orientation of image axes.

use nalgebra::SMatrix;
use serde::{Serialize, Deserialize};
use super::Vector;

/// Orientation of the image axes in physical space.
///
/// Column `i` is the physical direction of index axis `i`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction<const D: usize>(pub SMatrix<f64, D, D>);

impl<const D: usize> Direction<D> {
    /// Create an identity direction matrix (no rotation).
    pub fn identity() -> Self {
        Self(SMatrix::identity())
    }

    /// Create a zero matrix.
    pub fn zeros() -> Self {
        Self(SMatrix::zeros())
    }

    /// Check if direction matrix is orthogonal (rotation matrix).
    pub fn is_orthogonal(&self) -> bool {
        let product = self.0 * self.0.transpose();
        (0..D).all(|i| {
            (0..D).all(|j| {
                let expected = if i == j { 1.0 } else { 0.0 };
                (product[(i, j)] - expected).abs() < 1e-6
            })
        })
    }

    /// Check if the matrix is the identity within `tolerance`.
    pub fn is_identity(&self, tolerance: f64) -> bool {
        (self.0 - SMatrix::<f64, D, D>::identity()).abs().max() <= tolerance
    }

    /// Determinant of the direction matrix.
    ///
    /// Cofactor expansion for D=2 and D=3, partial-pivot elimination above that.
    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        match D {
            1 => m[(0, 0)],
            2 => m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)],
            3 => {
                m[(0, 0)] * (m[(1, 1)] * m[(2, 2)] - m[(1, 2)] * m[(2, 1)])
                    - m[(0, 1)] * (m[(1, 0)] * m[(2, 2)] - m[(1, 2)] * m[(2, 0)])
                    + m[(0, 2)] * (m[(1, 0)] * m[(2, 1)] - m[(1, 1)] * m[(2, 0)])
            }
            _ => {
                let mut work = *m;
                let mut det = 1.0;
                for col in 0..D {
                    let pivot = (col..D)
                        .max_by(|&a, &b| work[(a, col)].abs().total_cmp(&work[(b, col)].abs()))
                        .unwrap_or(col);
                    if work[(pivot, col)].abs() < 1e-12 {
                        return 0.0;
                    }
                    if pivot != col {
                        work.swap_rows(pivot, col);
                        det = -det;
                    }
                    det *= work[(col, col)];
                    for row in (col + 1)..D {
                        let factor = work[(row, col)] / work[(col, col)];
                        for k in col..D {
                            work[(row, k)] -= factor * work[(col, k)];
                        }
                    }
                }
                det
            }
        }
    }

    /// Try to compute the inverse of the direction matrix.
    pub fn try_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Self)
    }

    /// Transposed matrix.
    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// Get the inner nalgebra matrix.
    pub fn inner(&self) -> &SMatrix<f64, D, D> {
        &self.0
    }
}

impl<const D: usize> Default for Direction<D> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<const D: usize> std::ops::Index<(usize, usize)> for Direction<D> {
    type Output = f64;

    fn index(&self, index: (usize, usize)) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<(usize, usize)> for Direction<D> {
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Mul for Direction<D> {
    type Output = Self;

    fn mul(self, other: Self) -> Self::Output {
        Self(self.0 * other.0)
    }
}

impl<const D: usize> std::ops::Mul<Vector<D>> for Direction<D> {
    type Output = Vector<D>;

    fn mul(self, vector: Vector<D>) -> Self::Output {
        Vector(self.0 * vector.0)
    }
}
