//! Affine transform (linear map + translation about a fixed centre).

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use nalgebra::SMatrix;
use serde::{Serialize, Deserialize};
use super::trait_::Transform;
use crate::spatial::{Point, Vector};

/// Affine transform with a fixed centre:
/// `T(x) = A(x - c) + c + t`
///
/// where `A` is a `D×D` matrix, `t` a translation and `c` the centre of
/// rotation and scaling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform<const D: usize> {
    matrix: SMatrix<f64, D, D>,
    translation: Vector<D>,
    center: Point<D>,
}

impl<const D: usize> AffineTransform<D> {
    /// Create a new affine transform.
    pub fn new(matrix: SMatrix<f64, D, D>, translation: Vector<D>, center: Point<D>) -> Self {
        Self {
            matrix,
            translation,
            center,
        }
    }

    /// Identity transform centred at the origin.
    pub fn identity() -> Self {
        Self::new(SMatrix::identity(), Vector::zeros(), Point::origin())
    }

    /// Pure translation.
    pub fn from_translation(translation: Vector<D>) -> Self {
        Self::new(SMatrix::identity(), translation, Point::origin())
    }

    pub fn matrix(&self) -> &SMatrix<f64, D, D> {
        &self.matrix
    }

    pub fn translation(&self) -> &Vector<D> {
        &self.translation
    }

    pub fn center(&self) -> &Point<D> {
        &self.center
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == SMatrix::<f64, D, D>::identity() && self.translation.is_zero()
    }

    /// Map a point.
    pub fn apply(&self, point: &Point<D>) -> Point<D> {
        let centered = *point - self.center;
        self.center + Vector(self.matrix * centered.0) + self.translation
    }

    /// Inverse transform about the same centre, if the matrix is invertible.
    pub fn try_inverse(&self) -> Option<Self> {
        let inv = self.matrix.try_inverse()?;
        Some(Self::new(inv, -Vector(inv * self.translation.0), self.center))
    }
}

impl<const D: usize> Default for AffineTransform<D> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<B: Backend, const D: usize> Transform<B, D> for AffineTransform<D> {
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        self.apply(point)
    }

    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        // Row vectors: y = (x - c) @ A^T + c + t
        let device = points.device();
        let c: Vec<f32> = (0..D).map(|i| self.center[i] as f32).collect();
        let ct: Vec<f32> = (0..D).map(|i| (self.center[i] + self.translation[i]) as f32).collect();
        let mut a_t = Vec::with_capacity(D * D);
        for r in 0..D {
            for col in 0..D {
                a_t.push(self.matrix[(col, r)] as f32);
            }
        }
        let c = Tensor::<B, 2>::from_data(TensorData::new(c, vec![1, D]), &device);
        let ct = Tensor::<B, 2>::from_data(TensorData::new(ct, vec![1, D]), &device);
        let a_t = Tensor::<B, 2>::from_data(TensorData::new(a_t, vec![D, D]), &device);

        (points - c).matmul(a_t) + ct
    }

    fn inverse(&self) -> Option<Box<dyn Transform<B, D>>> {
        self.try_inverse().map(|inv| Box::new(inv) as Box<dyn Transform<B, D>>)
    }
}
