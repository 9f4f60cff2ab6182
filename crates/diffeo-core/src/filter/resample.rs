//! Resample image filter.
//!
//! Resamples an image onto a new grid using a transform and an interpolator.

use std::marker::PhantomData;
use burn::tensor::{Tensor, Shape};
use burn::tensor::backend::Backend;
use crate::error::Result;
use crate::image::{generate_grid, index_to_world_tensor, Image, ImageGeometry};
use crate::transform::trait_::Transform;
use crate::interpolation::trait_::Interpolator;

/// Resample image filter.
///
/// The transform maps output physical points into input physical space,
/// i.e. it pulls values from the input. Output voxels that map outside the
/// input buffer receive the default pixel value.
///
/// # Type Parameters
/// * `B` - The Burn backend
/// * `T` - The transform type
/// * `I` - The interpolator type
/// * `D` - The dimensionality (2 or 3)
pub struct ResampleImageFilter<B, T, I, const D: usize>
where
    B: Backend,
    T: Transform<B, D>,
    I: Interpolator<B>,
{
    geometry: ImageGeometry<D>,
    transform: T,
    interpolator: I,
    default_pixel_value: f64,
    _phantom: PhantomData<B>,
}

impl<B, T, I, const D: usize> ResampleImageFilter<B, T, I, D>
where
    B: Backend,
    T: Transform<B, D>,
    I: Interpolator<B>,
{
    /// Create a new resample filter writing onto `geometry`.
    pub fn new(geometry: ImageGeometry<D>, transform: T, interpolator: I) -> Self {
        Self {
            geometry,
            transform,
            interpolator,
            default_pixel_value: 0.0,
            _phantom: PhantomData,
        }
    }

    /// Set default pixel value for outside the field of view.
    pub fn with_default_pixel_value(mut self, value: f64) -> Self {
        self.default_pixel_value = value;
        self
    }

    /// Create from a reference image, reusing its grid.
    pub fn new_from_reference(reference: &Image<B, D>, transform: T, interpolator: I) -> Self {
        Self::new(reference.geometry().clone(), transform, interpolator)
    }

    /// Apply filter to an input image.
    pub fn apply(&self, input: &Image<B, D>) -> Result<Image<B, D>> {
        let device = input.data().device();

        let output_indices = generate_grid::<B, D>(self.geometry.size(), &device);
        let output_points = index_to_world_tensor(&self.geometry, output_indices);
        let input_points = self.transform.transform_points(output_points);
        let input_indices = input.world_to_index_tensor(input_points);

        let inside = inside_mask(&input_indices, &input.size());
        let sampled = self.interpolator.interpolate(input.data(), input_indices);
        let fill = (inside.ones_like() - inside.clone()) * self.default_pixel_value;
        let values = sampled * inside + fill;

        let output = values.reshape(Shape::new(self.geometry.tensor_shape()));
        Image::new(output, self.geometry.clone())
    }
}

/// 1 where the continuous index lies within `[0, size - 1]` on every axis.
fn inside_mask<B: Backend, const D: usize>(indices: &Tensor<B, 2>, size: &[usize; D]) -> Tensor<B, 1> {
    let tol = 1e-3;
    let [batch, _] = indices.dims();
    let mut mask = Tensor::<B, 1>::ones([batch], &indices.device());
    for (axis, &extent) in size.iter().enumerate() {
        let column: Tensor<B, 1> = indices.clone().narrow(1, axis, 1).squeeze(1);
        let lower = column.clone().greater_equal_elem(-tol).float();
        let upper = column.lower_equal_elem(extent as f64 - 1.0 + tol).float();
        mask = mask * lower * upper;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;
    use crate::interpolation::{LinearInterpolator, NearestNeighborInterpolator};
    use crate::spatial::Vector;
    use crate::transform::{AffineTransform, IdentityTransform};

    type TestBackend = NdArray<f32>;

    fn square_image() -> Image<TestBackend, 2> {
        let device = Default::default();
        let mut data = vec![0.0; 100];
        data[4 * 10 + 4] = 1.0;
        data[4 * 10 + 5] = 1.0;
        data[5 * 10 + 4] = 1.0;
        data[5 * 10 + 5] = 1.0;
        let tensor = Tensor::<TestBackend, 2>::from_data(TensorData::new(data, Shape::new([10, 10])), &device);
        Image::new(tensor, ImageGeometry::from_size([10, 10])).unwrap()
    }

    #[test]
    fn test_resample_translation_2d() {
        let image = square_image();

        // Pulling from x - (2, 1) moves content by +2 in x and +1 in y.
        let transform = AffineTransform::<2>::from_translation(Vector::new([-2.0, -1.0]));
        let filter = ResampleImageFilter::new_from_reference(&image, transform, LinearInterpolator::new());
        let result = filter.apply(&image).unwrap();

        let slice = result.data().clone().into_data().to_vec::<f32>().unwrap();
        assert!(slice[5 * 10 + 6] > 0.9);
        assert!(slice[5 * 10 + 7] > 0.9);
        assert!(slice[6 * 10 + 6] > 0.9);
        assert!(slice[6 * 10 + 7] > 0.9);
        assert!(slice[4 * 10 + 4] < 0.1);
    }

    #[test]
    fn test_outside_uses_default_value() {
        let image = square_image();
        let transform = AffineTransform::<2>::from_translation(Vector::new([5.0, 0.0]));
        let filter = ResampleImageFilter::new_from_reference(&image, transform, NearestNeighborInterpolator::new())
            .with_default_pixel_value(-1.0);
        let result = filter.apply(&image).unwrap();
        let slice = result.data().clone().into_data().to_vec::<f32>().unwrap();

        // x in 5..10 maps past the right edge.
        assert_eq!(slice[9], -1.0);
        assert_eq!(slice[0], 0.0);
        // (0, 4) pulls (5, 4) which is lit.
        assert!((slice[4 * 10] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_resample_onto_coarser_grid() {
        let image = square_image();
        let coarse = image.geometry().shrink(&[2, 2]).unwrap();
        let filter = ResampleImageFilter::new(coarse.clone(), IdentityTransform, LinearInterpolator::new());
        let result = filter.apply(&image).unwrap();
        assert_eq!(result.size(), coarse.size());
        assert_eq!(result.shape(), [5, 5]);
    }
}
