//! Separable Gaussian smoothing of vector fields.

use rayon::prelude::*;
use super::kernel::discrete_gaussian_kernel;
use crate::field::VectorField;
use crate::spatial::Vector;

/// Smooth `field` in place with a discrete Gaussian of the given variance
/// (in voxels), applied axis by axis with nearest-value boundary replication.
///
/// Afterwards every voxel on the outermost layer of the grid is set to zero
/// and interior voxels are blended as `w * smoothed + (1 - w) * original`,
/// with `w = 1` for `variance >= 0.5` and `1 - variance / 0.5` below that.
/// A non-positive variance leaves the field untouched.
pub fn smooth_field_gaussian<const D: usize>(
    field: &mut VectorField<D>,
    variance: f64,
    max_error: f64,
    max_kernel_width: usize,
) {
    if variance <= 0.0 {
        return;
    }
    let kernel = discrete_gaussian_kernel(variance, max_error, max_kernel_width);
    let size = field.geometry().size();

    let mut smoothed = field.values().to_vec();
    let mut scratch = vec![Vector::<D>::zeros(); smoothed.len()];
    let mut stride = 1;
    for axis in 0..D {
        convolve_axis(&smoothed, &mut scratch, &kernel, size[axis], stride);
        std::mem::swap(&mut smoothed, &mut scratch);
        stride *= size[axis];
    }

    let weight = if variance >= 0.5 { 1.0 } else { 1.0 - variance / 0.5 };
    let unit = [1usize; D];
    let geometry = field.geometry().clone();
    field
        .values_mut()
        .par_iter_mut()
        .zip(smoothed.par_iter())
        .enumerate()
        .for_each(|(offset, (value, s))| {
            if geometry.is_boundary(&geometry.index_of(offset), &unit) {
                *value = Vector::zeros();
            } else {
                *value = *s * weight + *value * (1.0 - weight);
            }
        });
}

/// One 1-D pass along the axis with the given extent and buffer stride.
fn convolve_axis<const D: usize>(
    input: &[Vector<D>],
    output: &mut [Vector<D>],
    kernel: &[f64],
    extent: usize,
    stride: usize,
) {
    let radius = (kernel.len() / 2) as isize;
    let last = extent as isize - 1;
    output.par_iter_mut().enumerate().for_each(|(offset, out)| {
        let coord = ((offset / stride) % extent) as isize;
        let base = offset - coord as usize * stride;
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, &c)| {
                let neighbour = (coord + k as isize - radius).clamp(0, last) as usize;
                input[base + neighbour * stride] * c
            })
            .sum();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::kernel::{DEFAULT_MAX_ERROR, DEFAULT_MAX_KERNEL_WIDTH};
    use crate::image::ImageGeometry;

    fn ramp_field() -> VectorField<2> {
        VectorField::from_fn(ImageGeometry::from_size([9, 7]), |p| Vector::new([0.1 * p[0], -0.2 * p[1]]))
    }

    #[test]
    fn test_zero_variance_leaves_field_unchanged() {
        let mut field = ramp_field();
        let original = field.deep_copy();
        smooth_field_gaussian(&mut field, 0.0, DEFAULT_MAX_ERROR, DEFAULT_MAX_KERNEL_WIDTH);
        assert_eq!(field, original);
    }

    #[test]
    fn test_boundary_forced_to_zero() {
        let mut field = VectorField::<3>::zeros(ImageGeometry::from_size([6, 5, 4]));
        field.fill(Vector::new([1.0, 1.0, 1.0]));
        smooth_field_gaussian(&mut field, 1.0, DEFAULT_MAX_ERROR, DEFAULT_MAX_KERNEL_WIDTH);

        let geometry = field.geometry().clone();
        for index in geometry.indices() {
            let v = field.get(&index);
            if geometry.is_boundary(&index, &[1, 1, 1]) {
                assert!(v.is_zero(), "boundary voxel {index:?} not zero");
            } else {
                // Constant field stays constant under a normalised kernel.
                assert!((v[0] - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_linear_field_preserved_in_interior() {
        // With replicated edges a linear ramp is preserved away from the edges.
        let mut field = VectorField::from_fn(ImageGeometry::from_size([21, 21]), |p| Vector::new([p[0], 0.0]));
        smooth_field_gaussian(&mut field, 1.0, DEFAULT_MAX_ERROR, DEFAULT_MAX_KERNEL_WIDTH);
        let v = field.get(&[10, 10]);
        assert!((v[0] - 10.0).abs() < 1e-6);
        assert!(v[1].abs() < 1e-12);
    }

    #[test]
    fn test_small_variance_blends_with_original() {
        let mut field = VectorField::<2>::zeros(ImageGeometry::from_size([7, 7]));
        field.set(&[3, 3], Vector::new([1.0, 0.0]));
        let mut smoothed = field.deep_copy();
        smooth_field_gaussian(&mut smoothed, 1.0, DEFAULT_MAX_ERROR, DEFAULT_MAX_KERNEL_WIDTH);
        let mut blended = field.deep_copy();
        smooth_field_gaussian(&mut blended, 0.25, DEFAULT_MAX_ERROR, DEFAULT_MAX_KERNEL_WIDTH);

        // Half of the peak survives at variance 0.25 before smoothing is even counted.
        assert!(blended.get(&[3, 3])[0] > 0.5);
        assert!(smoothed.get(&[3, 3])[0] < blended.get(&[3, 3])[0]);
    }
}
