//! Transform trait for spatial coordinate transformations.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use crate::spatial::Point;

/// Maps points from one physical space to another.
///
/// Implementors provide the single-point mapping; the batched tensor form
/// defaults to mapping each row on the host.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `D` - The spatial dimensionality (2 or 3)
pub trait Transform<B: Backend, const D: usize> {
    /// Map a single physical point.
    fn transform_point(&self, point: &Point<D>) -> Point<D>;

    /// Apply transform to a batch of points.
    ///
    /// # Arguments
    /// * `points` - Tensor of shape `[Batch, D]` containing the input points
    ///
    /// # Returns
    /// Tensor of shape `[Batch, D]` containing the transformed points
    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let [batch, _] = points.dims();
        let coords: Vec<f32> = points.into_data().iter::<f32>().collect();
        let mut mapped = Vec::with_capacity(coords.len());
        for row in coords.chunks_exact(D) {
            let p = Point::<D>::new(std::array::from_fn(|i| row[i] as f64));
            let q = self.transform_point(&p);
            mapped.extend((0..D).map(|i| q[i] as f32));
        }
        Tensor::<B, 2>::from_data(TensorData::new(mapped, vec![batch, D]), &device)
    }

    /// Get the inverse transform (if available).
    fn inverse(&self) -> Option<Box<dyn Transform<B, D>>> {
        None
    }
}

/// Identity mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl<B: Backend, const D: usize> Transform<B, D> for IdentityTransform {
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        *point
    }

    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        points
    }

    fn inverse(&self) -> Option<Box<dyn Transform<B, D>>> {
        Some(Box::new(IdentityTransform))
    }
}
