//! Interpolator trait for sampling tensors at continuous indices.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;

/// Samples tensor data at continuous voxel indices.
///
/// # Type Parameters
/// * `B` - The Burn backend
pub trait Interpolator<B: Backend> {
    /// Interpolate values from a tensor at given continuous indices.
    ///
    /// # Arguments
    /// * `data` - The source tensor, dimensions reversed (`[Z, Y, X]` or `[Y, X]`)
    /// * `indices` - `[Batch, D]` indices in axis order `(x, y, z)`
    ///
    /// # Returns
    /// Tensor of sampled values `[Batch]`
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1>;
}
