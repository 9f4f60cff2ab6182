//! Output of a registration run.

use burn::tensor::backend::Backend;
use diffeo_core::field::VectorField;
use diffeo_core::image::Image;
use diffeo_core::spatial::Point;
use diffeo_core::transform::{AffineTransform, DisplacementFieldTransform};

use crate::error::Result;
use crate::state::MetricEnergy;
use crate::warp::WarpMultiTransform;

/// Affine part plus total displacement fields on the finest domain.
#[derive(Debug, Clone)]
pub struct RegistrationResult<const D: usize> {
    pub affine: Option<AffineTransform<D>>,
    /// Fixed → moving displacement, applied before the affine.
    pub forward: VectorField<D>,
    /// Moving → fixed displacement.
    pub inverse: VectorField<D>,
    pub energies: Vec<MetricEnergy>,
    pub iterations_per_level: Vec<usize>,
}

impl<const D: usize> RegistrationResult<D> {
    pub fn total_iterations(&self) -> usize {
        self.iterations_per_level.iter().sum()
    }

    /// Summed energy of the last iteration.
    pub fn final_energy(&self) -> f64 {
        self.energies.iter().map(|e| e.current).sum()
    }

    /// Map a fixed-frame physical point into the moving frame.
    pub fn transform_point(&self, point: &Point<D>) -> Point<D> {
        let displaced = DisplacementFieldTransform::new(&self.forward).apply(point);
        match &self.affine {
            Some(affine) => affine.apply(&displaced),
            None => displaced,
        }
    }

    /// Resample `moving` onto the grid of `reference` through the full map.
    pub fn warp_moving<B: Backend>(&self, moving: &Image<B, D>, reference: &Image<B, D>) -> Result<Image<B, D>> {
        WarpMultiTransform::default().warp_image(moving, reference.geometry(), self.affine.as_ref(), Some(&self.forward))
    }
}
