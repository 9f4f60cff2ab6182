//! Affine pre-registration collaborator.
//!
//! The deformable optimizer only consumes the resulting transform; how it is
//! found is up to the implementor.

use burn::tensor::backend::Backend;
use diffeo_core::image::Image;
use diffeo_core::transform::AffineTransform;
use crate::error::Result;

/// Produces the affine part of the registration (fixed → moving physical map).
pub trait AffineOptimizer<B: Backend, const D: usize> {
    fn optimize(
        &self,
        fixed: &Image<B, D>,
        moving: &Image<B, D>,
        mask: Option<&Image<B, D>>,
    ) -> Result<AffineTransform<D>>;
}

/// Returns the identity; registration then starts from the raw images.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityAffineOptimizer;

impl<B: Backend, const D: usize> AffineOptimizer<B, D> for IdentityAffineOptimizer {
    fn optimize(
        &self,
        _fixed: &Image<B, D>,
        _moving: &Image<B, D>,
        _mask: Option<&Image<B, D>>,
    ) -> Result<AffineTransform<D>> {
        Ok(AffineTransform::identity())
    }
}

/// Hands back a transform computed elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct PrecomputedAffine<const D: usize>(pub AffineTransform<D>);

impl<B: Backend, const D: usize> AffineOptimizer<B, D> for PrecomputedAffine<D> {
    fn optimize(
        &self,
        _fixed: &Image<B, D>,
        _moving: &Image<B, D>,
        _mask: Option<&Image<B, D>>,
    ) -> Result<AffineTransform<D>> {
        Ok(self.0)
    }
}
