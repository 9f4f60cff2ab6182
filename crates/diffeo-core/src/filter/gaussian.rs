use burn::tensor::{Tensor, Shape};
use burn::tensor::backend::Backend;
use burn::tensor::ops::ConvOptions;
use super::kernel::{discrete_gaussian_kernel, DEFAULT_MAX_ERROR};
use crate::error::Result;
use crate::image::Image;
use crate::spatial::Spacing;

/// Gaussian smoothing filter for images.
///
/// Applies a discrete Gaussian as separable 1D convolutions. Sigmas are in
/// physical units and converted to voxel variances through the spacing.
/// Edges are handled by replicating the border value.
pub struct GaussianFilter<B: Backend> {
    sigmas: Vec<f64>,
    max_kernel_width: usize,
    max_error: f64,
    _b: std::marker::PhantomData<B>,
}

impl<B: Backend> GaussianFilter<B> {
    /// Create a new Gaussian filter with the given standard deviation (in physical units).
    ///
    /// # Arguments
    /// * `sigmas` - Standard deviation per axis `(x, y, z)`; a single entry applies to every axis.
    pub fn new(sigmas: Vec<f64>) -> Self {
        Self {
            sigmas,
            max_kernel_width: 32,
            max_error: DEFAULT_MAX_ERROR,
            _b: std::marker::PhantomData,
        }
    }

    /// Set the maximum kernel width (radius * 2 + 1).
    pub fn with_max_kernel_width(mut self, width: usize) -> Self {
        self.max_kernel_width = width;
        self
    }

    /// Apply the filter to an image.
    pub fn apply<const D: usize>(&self, image: &Image<B, D>) -> Result<Image<B, D>> {
        let data = self.apply_tensor(image.data().clone(), image.spacing());
        image.with_data(data)
    }

    /// Apply the filter to a tensor directly.
    ///
    /// # Arguments
    /// * `input` - Input tensor with reversed dimensions (`[Z, Y, X]`)
    /// * `spacing` - Physical spacing in axis order
    pub fn apply_tensor<const D: usize>(&self, input: Tensor<B, D>, spacing: &Spacing<D>) -> Tensor<B, D> {
        let mut data = input;
        let device = data.device();

        for axis in 0..D {
            let sigma = self.sigmas.get(axis).or(self.sigmas.first()).copied().unwrap_or(0.0);
            if sigma <= 1e-6 {
                continue;
            }
            let voxel_sigma = sigma / spacing[axis];
            let kernel = discrete_gaussian_kernel(voxel_sigma * voxel_sigma, self.max_error, self.max_kernel_width);
            if kernel.len() == 1 {
                continue;
            }
            let kernel: Vec<f32> = kernel.iter().map(|&c| c as f32).collect();
            let kernel_tensor = Tensor::<B, 1>::from_floats(kernel.as_slice(), &device);

            // Axis 0 is the last tensor dimension.
            data = self.convolve_1d::<D>(data, kernel_tensor, D - 1 - axis);
        }
        data
    }

    fn convolve_1d<const D: usize>(&self, input: Tensor<B, D>, kernel: Tensor<B, 1>, dim: usize) -> Tensor<B, D> {
        let dims: [usize; D] = input.shape().dims();

        // Move the target dimension last.
        let mut permute_indices = [0isize; D];
        let mut idx = 0;
        for i in 0..D {
            if i != dim {
                permute_indices[idx] = i as isize;
                idx += 1;
            }
        }
        permute_indices[D - 1] = dim as isize;
        let input_permuted = input.permute(permute_indices);

        let length = dims[dim];
        let batch_size: usize = (0..D).filter(|&i| i != dim).map(|i| dims[i]).product();
        let rows = input_permuted.reshape([batch_size, 1, length]);

        let kernel_size = kernel.dims()[0];
        let radius = kernel_size / 2;
        let kernel_reshaped = kernel.reshape([1, 1, kernel_size]);

        // Replicate the border values so edges are not pulled towards zero.
        let left = rows.clone().narrow(2, 0, 1).repeat_dim(2, radius);
        let right = rows.clone().narrow(2, length - 1, 1).repeat_dim(2, radius);
        let padded = Tensor::cat(vec![left, rows, right], 2);

        let options = ConvOptions::new([1], [0], [1], 1);
        let output = burn::tensor::module::conv1d(padded, kernel_reshaped, None, options);

        let mut permuted_shape = [0; D];
        let mut p_idx = 0;
        for i in 0..D {
            if i != dim {
                permuted_shape[p_idx] = dims[i];
                p_idx += 1;
            }
        }
        permuted_shape[D - 1] = length;
        let output_permuted = output.reshape(Shape::new(permuted_shape));

        let mut inv_permute_indices = [0isize; D];
        for (new_pos, &old_pos) in permute_indices.iter().enumerate() {
            inv_permute_indices[old_pos as usize] = new_pos as isize;
        }
        output_permuted.permute(inv_permute_indices)
    }
}
