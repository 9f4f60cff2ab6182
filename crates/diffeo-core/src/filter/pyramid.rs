use burn::tensor::backend::Backend;
use crate::error::{FieldError, Result};
use crate::image::Image;
use crate::interpolation::LinearInterpolator;
use crate::transform::IdentityTransform;
use super::gaussian::GaussianFilter;
use super::resample::ResampleImageFilter;

/// Multi-resolution image pyramid.
///
/// Each level is the input smoothed with the level's sigmas and resampled
/// onto the input grid shrunk by the level's factors. Levels are ordered
/// from coarsest to finest.
pub struct MultiResolutionPyramid<B: Backend, const D: usize> {
    images: Vec<Image<B, D>>,
}

impl<B: Backend, const D: usize> MultiResolutionPyramid<B, D> {
    /// Create a pyramid from an input image and schedules.
    ///
    /// # Arguments
    /// * `input` - The original high-resolution image.
    /// * `shrink_factors` - Shrink factors for each level `[level][axis]`.
    /// * `smoothing_sigmas` - Smoothing sigmas in physical units for each level `[level][axis]`.
    pub fn new(input: &Image<B, D>, shrink_factors: &[[usize; D]], smoothing_sigmas: &[Vec<f64>]) -> Result<Self> {
        if shrink_factors.len() != smoothing_sigmas.len() {
            return Err(FieldError::invalid_geometry(format!(
                "{} shrink levels but {} smoothing levels",
                shrink_factors.len(),
                smoothing_sigmas.len()
            )));
        }
        let images = shrink_factors
            .iter()
            .zip(smoothing_sigmas)
            .map(|(factors, sigmas)| Self::level(input, factors, sigmas))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { images })
    }

    /// Smooth and shrink a single image.
    pub fn level(input: &Image<B, D>, factors: &[usize; D], sigmas: &[f64]) -> Result<Image<B, D>> {
        let is_identity_shrink = factors.iter().all(|&f| f == 1);
        let is_identity_smooth = sigmas.iter().all(|&s| s <= 1e-6);

        let smoothed = if is_identity_smooth {
            input.clone()
        } else {
            GaussianFilter::new(sigmas.to_vec()).apply(input)?
        };
        if is_identity_shrink {
            return Ok(smoothed);
        }
        let geometry = input.geometry().shrink(factors)?;
        ResampleImageFilter::new(geometry, IdentityTransform, LinearInterpolator::new()).apply(&smoothed)
    }

    /// Get image at specific level.
    pub fn get_level(&self, level: usize) -> Option<&Image<B, D>> {
        self.images.get(level)
    }

    /// Get number of levels.
    pub fn levels(&self) -> usize {
        self.images.len()
    }

    /// Default schedule for N levels with power-of-2 shrinking.
    ///
    /// Returns (shrink_factors, smoothing_sigmas), e.g. levels=3 gives
    /// factors [4, 2, 1] and sigmas [2.0, 1.0, 0.0].
    pub fn default_schedule(levels: usize) -> (Vec<[usize; D]>, Vec<Vec<f64>>) {
        (0..levels)
            .map(|i| {
                let factor = 2usize.pow((levels - 1 - i) as u32);
                let sigma = if factor > 1 { 0.5 * factor as f64 } else { 0.0 };
                ([factor; D], vec![sigma; D])
            })
            .unzip()
    }
}
