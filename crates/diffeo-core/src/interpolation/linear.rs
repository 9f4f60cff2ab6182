//! Linear interpolation on tensors.
//!
//! Bilinear for 2-D data, trilinear for 3-D, gathering the `2^D` corners
//! from a flattened copy of the data.

use burn::tensor::{Tensor, Int};
use burn::tensor::backend::Backend;
use serde::{Serialize, Deserialize};
use super::trait_::Interpolator;

/// Linear interpolator with edge clamping.
///
/// Indices outside the data are clamped to the nearest edge voxel.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LinearInterpolator;

impl LinearInterpolator {
    /// Create a new linear interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for LinearInterpolator {
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let dims: [usize; D] = data.dims();
        let total: usize = dims.iter().product();
        let flat_data = data.clone().reshape([total]);
        let batch_size = indices.dims()[0];
        let device = indices.device();

        // Column `axis` of `indices` addresses tensor dimension `D - 1 - axis`.
        let mut lower: Vec<Tensor<B, 1, Int>> = Vec::with_capacity(D);
        let mut upper: Vec<Tensor<B, 1, Int>> = Vec::with_capacity(D);
        let mut w_lower: Vec<Tensor<B, 1>> = Vec::with_capacity(D);
        let mut w_upper: Vec<Tensor<B, 1>> = Vec::with_capacity(D);
        let mut stride = 1usize;
        for axis in 0..D {
            let extent = dims[D - 1 - axis];
            let coord = indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
            let floor = coord.clone().floor();
            let weight = coord - floor.clone();

            let i0 = floor.clone().clamp(0.0, (extent - 1) as f64).int();
            let i1 = (floor + 1.0).clamp(0.0, (extent - 1) as f64).int();
            lower.push(i0 * (stride as i32));
            upper.push(i1 * (stride as i32));
            w_lower.push(Tensor::<B, 1>::ones([batch_size], &device) - weight.clone());
            w_upper.push(weight);
            stride *= extent;
        }

        let mut result = Tensor::<B, 1>::zeros([batch_size], &device);
        for corner in 0..(1usize << D) {
            let pick = |axis: usize| corner & (1 << axis) != 0;
            let mut idx = if pick(0) { upper[0].clone() } else { lower[0].clone() };
            let mut weight = if pick(0) { w_upper[0].clone() } else { w_lower[0].clone() };
            for axis in 1..D {
                if pick(axis) {
                    idx = idx + upper[axis].clone();
                    weight = weight * w_upper[axis].clone();
                } else {
                    idx = idx + lower[axis].clone();
                    weight = weight * w_lower[axis].clone();
                }
            }
            result = result + flat_data.clone().gather(0, idx) * weight;
        }
        result
    }
}
