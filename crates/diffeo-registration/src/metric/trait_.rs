//! Similarity metric trait for dense update computation.
//!
//! A metric is handed images already warped into the current working frame.
//! It prepares whatever per-iteration state it needs in
//! [`SimilarityMetric::initialize_iteration`] and then answers per-voxel update
//! queries, possibly from many threads at once.

use diffeo_core::image::ScalarVolume;
use diffeo_core::spatial::Vector;
use crate::error::Result;
use crate::point_set::PointSet;

/// Source of per-voxel update vectors.
///
/// The forward update moves the fixed image's content toward the moving
/// image; the inverse update moves the moving image's content toward the fixed
/// image. Lower energy means better alignment.
///
/// # Type Parameters
/// * `D` - The spatial dimensionality (2 or 3)
pub trait SimilarityMetric<const D: usize>: Send + Sync {
    /// Get the name of this metric.
    fn name(&self) -> &'static str;

    /// Neighbourhood radius; voxels closer than this to the boundary are skipped.
    fn radius(&self) -> [usize; D];

    /// Whether the update is driven by landmarks rather than intensities.
    fn is_point_set_metric(&self) -> bool {
        false
    }

    fn set_fixed_image(&mut self, image: ScalarVolume<D>);

    fn set_moving_image(&mut self, image: ScalarVolume<D>);

    fn set_fixed_points(&mut self, _points: PointSet<D>) {}

    fn set_moving_points(&mut self, _points: PointSet<D>) {}

    /// Prepare for a sweep over the grid. Energy is computed here.
    fn initialize_iteration(&mut self) -> Result<()>;

    /// Forward update at `index`.
    fn compute_update(&self, index: &[usize; D]) -> Vector<D>;

    /// Inverse update at `index`.
    fn compute_update_inverse(&self, index: &[usize; D]) -> Vector<D>;

    /// Energy of the last initialised iteration.
    fn energy(&self) -> f64;
}
