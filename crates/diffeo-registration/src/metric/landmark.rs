//! Landmark correspondence metric.

use std::collections::HashMap;
use diffeo_core::image::{ImageGeometry, ScalarVolume};
use diffeo_core::spatial::{Point, Vector};
use crate::error::{RegistrationError, Result};
use crate::point_set::PointSet;
use super::trait_::SimilarityMetric;

/// Point-set metric pulling each fixed landmark onto its moving partner.
///
/// The forward update at the voxel nearest a fixed landmark is
/// `moving - fixed`; the inverse update is its negation. Voxels without a
/// landmark get no update. Several landmarks on one voxel add up.
#[derive(Debug, Clone, Default)]
pub struct LandmarkMetric<const D: usize> {
    geometry: Option<ImageGeometry<D>>,
    fixed_points: PointSet<D>,
    moving_points: PointSet<D>,
    displacements: HashMap<usize, Vector<D>>,
    energy: f64,
}

impl<const D: usize> LandmarkMetric<D> {
    pub fn new() -> Self {
        Self::default()
    }

    fn nearest_offset(geometry: &ImageGeometry<D>, point: &Point<D>) -> Option<usize> {
        let continuous = geometry.physical_to_continuous_index(point);
        let size = geometry.size();
        let mut index = [0usize; D];
        for i in 0..D {
            let rounded = continuous[i].round();
            if rounded < 0.0 || rounded >= size[i] as f64 {
                return None;
            }
            index[i] = rounded as usize;
        }
        Some(geometry.offset(&index))
    }
}

impl<const D: usize> SimilarityMetric<D> for LandmarkMetric<D> {
    fn name(&self) -> &'static str {
        "Landmark"
    }

    fn radius(&self) -> [usize; D] {
        [0; D]
    }

    fn is_point_set_metric(&self) -> bool {
        true
    }

    fn set_fixed_image(&mut self, image: ScalarVolume<D>) {
        self.geometry = Some(image.geometry().clone());
    }

    fn set_moving_image(&mut self, _image: ScalarVolume<D>) {}

    fn set_fixed_points(&mut self, points: PointSet<D>) {
        self.fixed_points = points;
    }

    fn set_moving_points(&mut self, points: PointSet<D>) {
        self.moving_points = points;
    }

    fn initialize_iteration(&mut self) -> Result<()> {
        let geometry = self
            .geometry
            .as_ref()
            .ok_or_else(|| RegistrationError::metric("landmark metric needs a reference grid"))?;
        if self.fixed_points.len() != self.moving_points.len() {
            return Err(RegistrationError::dimension_mismatch(format!(
                "{} fixed landmarks but {} moving landmarks",
                self.fixed_points.len(),
                self.moving_points.len()
            )));
        }

        self.displacements.clear();
        let mut total_distance = 0.0;
        for (fixed, moving) in self.fixed_points.iter().zip(self.moving_points.iter()) {
            let displacement = *moving - *fixed;
            total_distance += displacement.norm();
            match Self::nearest_offset(geometry, fixed) {
                Some(offset) => *self.displacements.entry(offset).or_insert_with(Vector::zeros) += displacement,
                None => tracing::debug!(point = ?fixed.to_array(), "landmark outside the domain"),
            }
        }
        self.energy = if self.fixed_points.is_empty() {
            0.0
        } else {
            total_distance / self.fixed_points.len() as f64
        };
        Ok(())
    }

    fn compute_update(&self, index: &[usize; D]) -> Vector<D> {
        self.geometry
            .as_ref()
            .and_then(|g| self.displacements.get(&g.offset(index)))
            .copied()
            .unwrap_or_else(Vector::zeros)
    }

    fn compute_update_inverse(&self, index: &[usize; D]) -> Vector<D> {
        -self.compute_update(index)
    }

    fn energy(&self) -> f64 {
        self.energy
    }
}
