//! Construction of the per-iteration update field.
//!
//! Every metric sees its images warped into the working frame, answers
//! per-voxel update queries, and its smoothed, max-normalised answer is
//! blended into the total update.

use burn::tensor::backend::Backend;
use rayon::prelude::*;
use diffeo_core::field::VectorField;
use diffeo_core::filter::{smooth_field, SmoothingConfig};
use diffeo_core::image::{Image, ImageGeometry, ScalarVolume};
use diffeo_core::transform::AffineTransform;
use crate::error::Result;
use crate::metric::{MetricDescriptor, SimilarityMetric};
use crate::point_set::PointSet;
use crate::warp::WarpMultiTransform;

/// Mask probabilities below this exclude a voxel.
const MASK_THRESHOLD: f32 = 0.1;

/// Warps and landmarks for one update computation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateRequest<'a, const D: usize> {
    /// Warp applied, after the affine, to the moving images.
    pub fixed_warp: Option<&'a VectorField<D>>,
    /// Warp applied to the fixed images and the mask.
    pub moving_warp: Option<&'a VectorField<D>>,
    pub fixed_points: Option<&'a PointSet<D>>,
    pub moving_points: Option<&'a PointSet<D>>,
    /// Also build the inverse-direction update.
    pub want_inverse: bool,
    /// Record metric energies.
    pub update_energy: bool,
}

/// Output of [`UpdateFieldBuilder::compute`].
#[derive(Debug, Clone)]
pub struct UpdateFields<const D: usize> {
    pub forward: VectorField<D>,
    pub inverse: Option<VectorField<D>>,
    /// Energy per metric; `None` for metrics not evaluated or not requested.
    pub energies: Vec<Option<f64>>,
}

/// Borrowed view of everything an update computation reads.
pub struct UpdateFieldBuilder<'a, B: Backend, const D: usize> {
    metrics: &'a mut [MetricDescriptor<B, D>],
    domain: &'a ImageGeometry<D>,
    smoothing: &'a SmoothingConfig,
    mask: Option<&'a Image<B, D>>,
    affine: Option<AffineTransform<D>>,
    warper: WarpMultiTransform,
    round_robin: Option<usize>,
}

impl<'a, B: Backend, const D: usize> UpdateFieldBuilder<'a, B, D> {
    pub fn new(
        metrics: &'a mut [MetricDescriptor<B, D>],
        domain: &'a ImageGeometry<D>,
        smoothing: &'a SmoothingConfig,
    ) -> Self {
        Self {
            metrics,
            domain,
            smoothing,
            mask: None,
            affine: None,
            warper: WarpMultiTransform::default(),
            round_robin: None,
        }
    }

    pub fn with_mask(mut self, mask: Option<&'a Image<B, D>>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_affine(mut self, affine: Option<AffineTransform<D>>) -> Self {
        self.affine = affine;
        self
    }

    pub fn with_warper(mut self, warper: WarpMultiTransform) -> Self {
        self.warper = warper;
        self
    }

    /// Alternating minimisation: evaluate only metric `iteration % n`.
    pub fn alternating(mut self, iteration: usize) -> Self {
        self.round_robin = Some(iteration);
        self
    }

    pub fn domain(&self) -> &ImageGeometry<D> {
        self.domain
    }

    pub fn affine(&self) -> Option<&AffineTransform<D>> {
        self.affine.as_ref()
    }

    pub fn warper(&self) -> WarpMultiTransform {
        self.warper
    }

    pub fn num_metrics(&self) -> usize {
        self.metrics.len()
    }

    /// Build the update field (and optionally its inverse) in the domain frame.
    pub fn compute(&mut self, request: &UpdateRequest<'_, D>) -> Result<UpdateFields<D>> {
        let mask = self.warped_mask(request.moving_warp)?;
        let mut forward = VectorField::zeros(self.domain.clone());
        let mut inverse = request.want_inverse.then(|| VectorField::zeros(self.domain.clone()));
        let mut energies = vec![None; self.metrics.len()];

        let configured: f64 = self.metrics.iter().map(|m| m.weight).sum();
        // Configured weights are not renormalised: each term enters with its own weight.
        let sum_weights = 1.0;
        tracing::trace!(configured, sum_weights, "metric weights");

        let selected: Vec<usize> = match self.round_robin {
            Some(iteration) if !self.metrics.is_empty() => vec![iteration % self.metrics.len()],
            _ => (0..self.metrics.len()).collect(),
        };

        for index in selected {
            let (fixed_image, moving_image) = {
                let descriptor = &self.metrics[index];
                let (fixed, moving) = descriptor.level_images();
                let moving_warped =
                    self.warper
                        .warp_image(moving, self.domain, self.affine.as_ref(), request.fixed_warp)?;
                let fixed_warped = self.warper.warp_image(fixed, self.domain, None, request.moving_warp)?;
                (fixed_warped.to_volume()?, moving_warped.to_volume()?)
            };

            let descriptor = &mut self.metrics[index];
            let weight = descriptor.weight / sum_weights;
            let metric = descriptor.metric.as_mut();
            metric.set_fixed_image(fixed_image);
            metric.set_moving_image(moving_image);
            let is_point_set = metric.is_point_set_metric();
            if is_point_set {
                match (request.fixed_points, request.moving_points) {
                    (Some(fixed), Some(moving)) => {
                        metric.set_fixed_points(fixed.clone());
                        metric.set_moving_points(moving.clone());
                    }
                    _ => tracing::warn!(metric = metric.name(), "point-set metric without landmarks"),
                }
            }
            metric.initialize_iteration()?;

            let (mut update, mut update_inverse) =
                accumulate(metric, self.domain, mask.as_ref(), request.want_inverse);
            if request.update_energy {
                energies[index] = Some(metric.energy());
            }
            tracing::debug!(
                metric = metric.name(),
                energy = metric.energy(),
                weight,
                "metric update computed"
            );

            smooth_field(&mut update, self.smoothing)?;
            normalize_into(&mut forward, &update, weight, is_point_set);
            if let (Some(total), Some(per_metric)) = (inverse.as_mut(), update_inverse.as_mut()) {
                smooth_field(per_metric, self.smoothing)?;
                normalize_into(total, per_metric, weight, is_point_set);
            }
        }

        Ok(UpdateFields {
            forward,
            inverse,
            energies,
        })
    }

    fn warped_mask(&self, moving_warp: Option<&VectorField<D>>) -> Result<Option<ScalarVolume<D>>> {
        let Some(mask) = self.mask else {
            return Ok(None);
        };
        let warped = self
            .warper
            .nearest()
            .warp_image(mask, self.domain, None, moving_warp)?;
        Ok(Some(warped.to_volume()?))
    }
}

/// Per-voxel metric updates over the non-boundary region, weighted by the mask.
fn accumulate<const D: usize>(
    metric: &dyn SimilarityMetric<D>,
    domain: &ImageGeometry<D>,
    mask: Option<&ScalarVolume<D>>,
    want_inverse: bool,
) -> (VectorField<D>, Option<VectorField<D>>) {
    let radius = metric.radius();
    let probability = |index: &[usize; D]| -> Option<f64> {
        if domain.is_boundary(index, &radius) {
            return None;
        }
        match mask {
            Some(mask) => {
                let p = mask.value(index);
                (p >= MASK_THRESHOLD).then(|| p.min(1.0) as f64)
            }
            None => Some(1.0),
        }
    };

    let mut update = VectorField::zeros(domain.clone());
    update.par_update(|index, value| {
        if let Some(p) = probability(index) {
            *value += metric.compute_update(index) * p;
        }
    });

    let inverse = want_inverse.then(|| {
        let mut inverse = VectorField::zeros(domain.clone());
        inverse.par_update(|index, value| {
            if let Some(p) = probability(index) {
                *value = metric.compute_update_inverse(index) * p;
            }
        });
        inverse
    });
    (update, inverse)
}

/// Blend a per-metric update, divided by its largest voxel magnitude, into `total`.
///
/// Intensity terms add `weight * u`. A landmark term overrides the total
/// where it is strong: `total * (1 - min(1, |u|)) + weight * u`, with `|u|` in
/// voxel units.
pub fn normalize_into<const D: usize>(
    total: &mut VectorField<D>,
    update: &VectorField<D>,
    weight: f64,
    is_point_set: bool,
) {
    let mut max = update.max_magnitude_in_voxels();
    if max <= 0.0 {
        max = 1.0;
    }
    let spacing = *update.geometry().spacing();
    total
        .values_mut()
        .par_iter_mut()
        .zip(update.values().par_iter())
        .for_each(|(t, u)| {
            let normalized = *u / max;
            if is_point_set {
                let modifier = 1.0 - normalized.norm_in_voxels(&spacing).min(1.0);
                *t = *t * modifier + normalized * weight;
            } else {
                *t += normalized * weight;
            }
        });
}
