//! Binding of a metric to its images, landmarks and weight.

use burn::tensor::backend::Backend;
use diffeo_core::filter::MultiResolutionPyramid;
use diffeo_core::image::Image;
use crate::error::{RegistrationError, Result};
use crate::metric::SimilarityMetric;
use crate::point_set::PointSet;

/// One term of the registration objective.
pub struct MetricDescriptor<B: Backend, const D: usize> {
    pub metric: Box<dyn SimilarityMetric<D>>,
    pub fixed: Image<B, D>,
    pub moving: Image<B, D>,
    pub fixed_points: Option<PointSet<D>>,
    pub moving_points: Option<PointSet<D>>,
    pub weight: f64,
    prepared: Option<(Image<B, D>, Image<B, D>)>,
}

impl<B: Backend, const D: usize> MetricDescriptor<B, D> {
    pub fn new(metric: Box<dyn SimilarityMetric<D>>, fixed: Image<B, D>, moving: Image<B, D>) -> Self {
        Self {
            metric,
            fixed,
            moving,
            fixed_points: None,
            moving_points: None,
            weight: 1.0,
            prepared: None,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Attach corresponding landmarks. Both sets must have the same length.
    pub fn with_points(mut self, fixed: PointSet<D>, moving: PointSet<D>) -> Result<Self> {
        if fixed.len() != moving.len() {
            return Err(RegistrationError::dimension_mismatch(format!(
                "{} fixed landmarks but {} moving landmarks",
                fixed.len(),
                moving.len()
            )));
        }
        self.fixed_points = Some(fixed);
        self.moving_points = Some(moving);
        Ok(self)
    }

    pub fn name(&self) -> &'static str {
        self.metric.name()
    }

    /// Smooth and shrink both images for the next resolution level.
    ///
    /// Sigmas are physical, one per axis. Unit factors with zero sigmas keep
    /// the originals.
    pub fn prepare_level(&mut self, factors: &[usize; D], sigmas: &[f64]) -> Result<()> {
        if factors.iter().all(|&f| f == 1) && sigmas.iter().all(|&s| s <= 0.0) {
            self.prepared = None;
            return Ok(());
        }
        let fixed = MultiResolutionPyramid::level(&self.fixed, factors, sigmas)?;
        let moving = MultiResolutionPyramid::level(&self.moving, factors, sigmas)?;
        self.prepared = Some((fixed, moving));
        Ok(())
    }

    /// Images of the current level, or the inputs if none was prepared.
    pub fn level_images(&self) -> (&Image<B, D>, &Image<B, D>) {
        match &self.prepared {
            Some((fixed, moving)) => (fixed, moving),
            None => (&self.fixed, &self.moving),
        }
    }
}

impl<B: Backend, const D: usize> std::fmt::Debug for MetricDescriptor<B, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricDescriptor")
            .field("metric", &self.metric.name())
            .field("weight", &self.weight)
            .field("landmarks", &self.fixed_points.as_ref().map(|p| p.len()))
            .finish()
    }
}
