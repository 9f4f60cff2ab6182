//! Demons-style mean squares metric.

use rayon::prelude::*;
use diffeo_core::image::ScalarVolume;
use diffeo_core::spatial::Vector;
use crate::error::{RegistrationError, Result};
use super::trait_::SimilarityMetric;

/// Mean squared intensity difference with a demons force.
///
/// With `f`, `m` the fixed and moving intensities and `K` the mean squared
/// spacing, the forward update is `(f - m) ∇f / (|∇f|² + (f - m)² / K)` and
/// the inverse update swaps the roles of the two images.
#[derive(Debug, Clone)]
pub struct MeanSquaresMetric<const D: usize> {
    fixed: Option<ScalarVolume<D>>,
    moving: Option<ScalarVolume<D>>,
    normalizer: f64,
    intensity_threshold: f64,
    energy: f64,
}

const DENOMINATOR_THRESHOLD: f64 = 1e-9;

impl<const D: usize> MeanSquaresMetric<D> {
    pub fn new() -> Self {
        Self {
            fixed: None,
            moving: None,
            normalizer: 1.0,
            intensity_threshold: 1e-3,
            energy: 0.0,
        }
    }

    /// Differences below this are treated as matched.
    pub fn with_intensity_threshold(mut self, threshold: f64) -> Self {
        self.intensity_threshold = threshold;
        self
    }

    fn force(&self, difference: f64, gradient: Vector<D>) -> Vector<D> {
        if difference.abs() < self.intensity_threshold {
            return Vector::zeros();
        }
        let denominator = gradient.norm_squared() + difference * difference / self.normalizer;
        if denominator < DENOMINATOR_THRESHOLD {
            return Vector::zeros();
        }
        gradient * (difference / denominator)
    }
}

impl<const D: usize> Default for MeanSquaresMetric<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> SimilarityMetric<D> for MeanSquaresMetric<D> {
    fn name(&self) -> &'static str {
        "MeanSquares"
    }

    fn radius(&self) -> [usize; D] {
        [1; D]
    }

    fn set_fixed_image(&mut self, image: ScalarVolume<D>) {
        self.fixed = Some(image);
    }

    fn set_moving_image(&mut self, image: ScalarVolume<D>) {
        self.moving = Some(image);
    }

    fn initialize_iteration(&mut self) -> Result<()> {
        let (fixed, moving) = match (&self.fixed, &self.moving) {
            (Some(f), Some(m)) => (f, m),
            _ => return Err(RegistrationError::metric("mean squares metric needs both images")),
        };
        fixed.geometry().ensure_same_grid(moving.geometry(), "mean squares images")?;

        let spacing = fixed.geometry().spacing();
        self.normalizer = (0..D).map(|i| spacing[i] * spacing[i]).sum::<f64>() / D as f64;

        let sum: f64 = fixed
            .data()
            .par_iter()
            .zip(moving.data().par_iter())
            .map(|(&f, &m)| {
                let d = (f - m) as f64;
                d * d
            })
            .sum();
        self.energy = sum / fixed.data().len().max(1) as f64;
        Ok(())
    }

    fn compute_update(&self, index: &[usize; D]) -> Vector<D> {
        match (&self.fixed, &self.moving) {
            (Some(fixed), Some(moving)) => {
                let difference = (fixed.value(index) - moving.value(index)) as f64;
                self.force(difference, fixed.gradient(index))
            }
            _ => Vector::zeros(),
        }
    }

    fn compute_update_inverse(&self, index: &[usize; D]) -> Vector<D> {
        match (&self.fixed, &self.moving) {
            (Some(fixed), Some(moving)) => {
                let difference = (moving.value(index) - fixed.value(index)) as f64;
                self.force(difference, moving.gradient(index))
            }
            _ => Vector::zeros(),
        }
    }

    fn energy(&self) -> f64 {
        self.energy
    }
}
