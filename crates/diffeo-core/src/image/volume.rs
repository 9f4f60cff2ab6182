//! Host-resident scalar volume.
//!
//! Similarity metrics visit voxels and their neighbourhoods in random order,
//! so they work on a flat `Vec<f32>` rather than on a tensor.

use crate::error::{FieldError, Result};
use crate::image::ImageGeometry;
use crate::interpolation::vector_linear::for_each_corner;
use crate::spatial::{Point, Vector};

/// Scalar image stored in buffer order (axis 0 fastest).
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarVolume<const D: usize> {
    geometry: ImageGeometry<D>,
    data: Vec<f32>,
}

impl<const D: usize> ScalarVolume<D> {
    /// Wrap a buffer; its length must equal the number of voxels.
    pub fn new(geometry: ImageGeometry<D>, data: Vec<f32>) -> Result<Self> {
        if data.len() != geometry.num_voxels() {
            return Err(FieldError::BufferLength {
                expected: geometry.num_voxels(),
                actual: data.len(),
            });
        }
        Ok(Self { geometry, data })
    }

    /// Volume filled with a constant.
    pub fn filled(geometry: ImageGeometry<D>, value: f32) -> Self {
        let data = vec![value; geometry.num_voxels()];
        Self { geometry, data }
    }

    /// Volume whose voxels are computed from their physical positions.
    pub fn from_fn(geometry: ImageGeometry<D>, f: impl Fn(&Point<D>) -> f32) -> Self {
        let data = geometry
            .indices()
            .map(|index| f(&geometry.index_to_physical(&index)))
            .collect();
        Self { geometry, data }
    }

    pub fn geometry(&self) -> &ImageGeometry<D> {
        &self.geometry
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    pub fn value(&self, index: &[usize; D]) -> f32 {
        self.data[self.geometry.offset(index)]
    }

    /// Value at a continuous index, D-linear, clamped to the buffer.
    pub fn interpolate(&self, index: &[f64; D]) -> f64 {
        let mut value = 0.0;
        for_each_corner(&self.geometry.size(), index, |neighbor, weight| {
            value += weight * self.value(neighbor) as f64;
        });
        value
    }

    /// Value at a physical point, clamped to the buffer.
    pub fn sample(&self, point: &Point<D>) -> f64 {
        self.interpolate(&self.geometry.physical_to_continuous_index(point))
    }

    /// Physical-space gradient by central differences.
    ///
    /// Components along axes where the index touches the boundary are zero.
    pub fn gradient(&self, index: &[usize; D]) -> Vector<D> {
        let size = self.geometry.size();
        let spacing = self.geometry.spacing();
        let mut grad = Vector::<D>::zeros();
        for i in 0..D {
            if index[i] == 0 || index[i] + 1 >= size[i] {
                continue;
            }
            let mut forward = *index;
            let mut backward = *index;
            forward[i] += 1;
            backward[i] -= 1;
            grad[i] = (self.value(&forward) - self.value(&backward)) as f64 / (2.0 * spacing[i]);
        }
        *self.geometry.direction() * grad
    }

    /// Largest voxel value.
    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Mean voxel value.
    pub fn mean(&self) -> f64 {
        self.data.iter().map(|&v| v as f64).sum::<f64>() / self.data.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ScalarVolume<2> {
        let geometry = ImageGeometry::<2>::from_size([4, 3]);
        ScalarVolume::from_fn(geometry, |p| (2.0 * p[0] + p[1]) as f32)
    }

    #[test]
    fn test_buffer_length_checked() {
        let geometry = ImageGeometry::<2>::from_size([4, 3]);
        assert!(ScalarVolume::new(geometry.clone(), vec![0.0; 12]).is_ok());
        assert!(ScalarVolume::new(geometry, vec![0.0; 11]).is_err());
    }

    #[test]
    fn test_interpolate_linear_ramp() {
        let volume = ramp();
        assert!((volume.interpolate(&[1.5, 0.5]) - 3.5).abs() < 1e-9);
        assert!((volume.interpolate(&[3.0, 2.0]) - 8.0).abs() < 1e-9);
        // clamped outside the buffer
        assert!((volume.interpolate(&[10.0, 2.0]) - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_gradient_of_ramp() {
        let volume = ramp();
        let g = volume.gradient(&[1, 1]);
        assert!((g[0] - 2.0).abs() < 1e-9);
        assert!((g[1] - 1.0).abs() < 1e-9);
        let edge = volume.gradient(&[0, 1]);
        assert_eq!(edge[0], 0.0);
    }
}
