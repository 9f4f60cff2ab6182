//! Dense vector field on an image grid.
//!
//! Displacement and velocity fields share this type. All binary operations
//! require both operands to live on the same grid.

use rayon::prelude::*;
use crate::error::{FieldError, Result};
use crate::image::ImageGeometry;
use crate::spatial::{Point, Vector};

/// Dense grid of `D`-dimensional vectors in physical units.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField<const D: usize> {
    geometry: ImageGeometry<D>,
    data: Vec<Vector<D>>,
}

impl<const D: usize> VectorField<D> {
    /// Zero field on `geometry`.
    pub fn zeros(geometry: ImageGeometry<D>) -> Self {
        let data = vec![Vector::zeros(); geometry.num_voxels()];
        Self { geometry, data }
    }

    /// Zero field sharing the grid of `reference`.
    pub fn zeros_like(reference: &Self) -> Self {
        Self::zeros(reference.geometry.clone())
    }

    /// Wrap a buffer; its length must equal the number of voxels.
    pub fn from_vec(geometry: ImageGeometry<D>, data: Vec<Vector<D>>) -> Result<Self> {
        if data.len() != geometry.num_voxels() {
            return Err(FieldError::BufferLength {
                expected: geometry.num_voxels(),
                actual: data.len(),
            });
        }
        Ok(Self { geometry, data })
    }

    /// Field whose vectors are computed from the physical position of each voxel.
    pub fn from_fn(geometry: ImageGeometry<D>, f: impl Fn(&Point<D>) -> Vector<D> + Sync) -> Self {
        let data = (0..geometry.num_voxels())
            .into_par_iter()
            .map(|offset| f(&geometry.index_to_physical(&geometry.index_of(offset))))
            .collect();
        Self { geometry, data }
    }

    /// Independent copy with its own storage.
    pub fn deep_copy(&self) -> Self {
        Self {
            geometry: self.geometry.clone(),
            data: self.data.clone(),
        }
    }

    /// Exchange storage with another field on the same grid.
    pub fn swap_buffer(&mut self, other: &mut Self) -> Result<()> {
        self.geometry.ensure_same_grid(&other.geometry, "swap_buffer")?;
        std::mem::swap(&mut self.data, &mut other.data);
        Ok(())
    }

    pub fn geometry(&self) -> &ImageGeometry<D> {
        &self.geometry
    }

    /// Replace the geometry keeping the buffer (same voxel count required).
    pub fn set_geometry(&mut self, geometry: ImageGeometry<D>) -> Result<()> {
        if geometry.num_voxels() != self.data.len() {
            return Err(FieldError::BufferLength {
                expected: geometry.num_voxels(),
                actual: self.data.len(),
            });
        }
        self.geometry = geometry;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[Vector<D>] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [Vector<D>] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, index: &[usize; D]) -> Vector<D> {
        self.data[self.geometry.offset(index)]
    }

    #[inline]
    pub fn set(&mut self, index: &[usize; D], value: Vector<D>) {
        let offset = self.geometry.offset(index);
        self.data[offset] = value;
    }

    pub fn fill(&mut self, value: Vector<D>) {
        self.data.par_iter_mut().for_each(|v| *v = value);
    }

    /// Multiply every vector by `factor`.
    pub fn scale(&mut self, factor: f64) {
        self.data.par_iter_mut().for_each(|v| *v *= factor);
    }

    /// `self += factor * other`.
    pub fn add_scaled(&mut self, other: &Self, factor: f64) -> Result<()> {
        self.geometry.ensure_same_grid(&other.geometry, "add_scaled")?;
        self.data
            .par_iter_mut()
            .zip(other.data.par_iter())
            .for_each(|(a, b)| *a += *b * factor);
        Ok(())
    }

    /// Largest vector magnitude measured in voxel units.
    pub fn max_magnitude_in_voxels(&self) -> f64 {
        let spacing = *self.geometry.spacing();
        self.data
            .par_iter()
            .map(|v| v.norm_in_voxels(&spacing))
            .reduce(|| 0.0, f64::max)
    }

    /// Largest vector magnitude in physical units.
    pub fn max_magnitude(&self) -> f64 {
        self.data.par_iter().map(|v| v.norm()).reduce(|| 0.0, f64::max)
    }

    /// True if every vector is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.data.par_iter().all(|v| v.is_zero())
    }

    /// Parallel in-place update with access to each voxel's index.
    pub fn par_update(&mut self, f: impl Fn(&[usize; D], &mut Vector<D>) + Sync + Send) {
        let geometry = &self.geometry;
        self.data
            .par_iter_mut()
            .enumerate()
            .for_each(|(offset, v)| f(&geometry.index_of(offset), v));
    }
}
