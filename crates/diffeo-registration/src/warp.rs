//! Warping of images and landmarks through an affine and a displacement field.

use burn::tensor::backend::Backend;
use diffeo_core::field::VectorField;
use diffeo_core::filter::ResampleImageFilter;
use diffeo_core::image::{Image, ImageGeometry};
use diffeo_core::interpolation::{Interpolator, LinearInterpolator, NearestNeighborInterpolator};
use diffeo_core::transform::{
    AffineTransform, ChainedTransform, DisplacementFieldTransform, IdentityTransform, Transform,
};
use diffeo_core::interpolation::VectorLinearInterpolator;
use crate::error::Result;
use crate::point_set::PointSet;

/// Applies an optional displacement field followed by an optional affine.
///
/// Images are pulled back: output voxel `x` on the reference grid takes the
/// input value at `A(x + s·u(x))`. Points are pushed forward: `y = A(x)` and
/// then `y + s·u(y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WarpMultiTransform {
    use_nearest_neighbor: bool,
    scale_factor: f64,
}

impl Default for WarpMultiTransform {
    fn default() -> Self {
        Self {
            use_nearest_neighbor: false,
            scale_factor: 1.0,
        }
    }
}

impl WarpMultiTransform {
    pub fn new(use_nearest_neighbor: bool, scale_factor: f64) -> Self {
        Self {
            use_nearest_neighbor,
            scale_factor,
        }
    }

    /// Same settings with nearest-neighbour sampling forced on.
    pub fn nearest(self) -> Self {
        Self {
            use_nearest_neighbor: true,
            ..self
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Resample `image` onto `reference` through `field` then `affine`.
    ///
    /// With neither a field nor an affine this is plain subsampling onto the
    /// reference grid.
    pub fn warp_image<B: Backend, const D: usize>(
        &self,
        image: &Image<B, D>,
        reference: &ImageGeometry<D>,
        affine: Option<&AffineTransform<D>>,
        field: Option<&VectorField<D>>,
    ) -> Result<Image<B, D>> {
        let displacement = field.map(|f| DisplacementFieldTransform::new(f).with_scale(self.scale_factor));
        match (displacement, affine) {
            (Some(d), Some(a)) => self.resample(image, reference, ChainedTransform::new(d, *a)),
            (Some(d), None) => self.resample(image, reference, d),
            (None, Some(a)) => self.resample(image, reference, *a),
            (None, None) => self.resample(image, reference, IdentityTransform),
        }
    }

    fn resample<B: Backend, T: Transform<B, D>, const D: usize>(
        &self,
        image: &Image<B, D>,
        reference: &ImageGeometry<D>,
        transform: T,
    ) -> Result<Image<B, D>> {
        if self.use_nearest_neighbor {
            apply_filter(image, reference, transform, NearestNeighborInterpolator::new())
        } else {
            apply_filter(image, reference, transform, LinearInterpolator::new())
        }
    }

    /// Map landmarks through `affine` and then `field`.
    ///
    /// Displacements outside the field's buffer count as zero.
    pub fn warp_points<const D: usize>(
        &self,
        points: &PointSet<D>,
        affine: Option<&AffineTransform<D>>,
        field: Option<&VectorField<D>>,
    ) -> PointSet<D> {
        let interpolator = field.map(VectorLinearInterpolator::new);
        points.map(|p| {
            let mapped = affine.map_or(*p, |a| a.apply(p));
            match &interpolator {
                Some(i) => mapped + i.sample(&mapped) * self.scale_factor,
                None => mapped,
            }
        })
    }
}

fn apply_filter<B, T, I, const D: usize>(
    image: &Image<B, D>,
    reference: &ImageGeometry<D>,
    transform: T,
    interpolator: I,
) -> Result<Image<B, D>>
where
    B: Backend,
    T: Transform<B, D>,
    I: Interpolator<B>,
{
    let filter = ResampleImageFilter::new(reference.clone(), transform, interpolator);
    Ok(filter.apply(image)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use diffeo_core::image::ScalarVolume;
    use diffeo_core::spatial::{Point, Vector};

    type TestBackend = NdArray<f32>;

    fn ramp_image() -> Image<TestBackend, 2> {
        let volume = ScalarVolume::from_fn(ImageGeometry::from_size([12, 10]), |p| p[0] as f32);
        Image::from_volume(&volume, &Default::default())
    }

    #[test]
    fn test_subsample_without_transforms_is_identity() {
        let image = ramp_image();
        let warped = WarpMultiTransform::default()
            .warp_image(&image, image.geometry(), None, None)
            .unwrap();
        assert_eq!(warped.to_volume().unwrap(), image.to_volume().unwrap());
    }

    #[test]
    fn test_field_then_affine() {
        let image = ramp_image();
        let mut field = VectorField::zeros(image.geometry().clone());
        field.fill(Vector::new([1.0, 0.0]));
        let affine = AffineTransform::from_translation(Vector::new([2.0, 0.0]));

        let warped = WarpMultiTransform::default()
            .warp_image(&image, image.geometry(), Some(&affine), Some(&field))
            .unwrap()
            .to_volume()
            .unwrap();
        // ramp(x + 1 + 2)
        assert!((warped.value(&[4, 5]) - 7.0).abs() < 1e-4);
        // beyond the input buffer
        assert_eq!(warped.value(&[10, 5]), 0.0);
    }

    #[test]
    fn test_scale_factor_scales_displacement() {
        let image = ramp_image();
        let mut field = VectorField::zeros(image.geometry().clone());
        field.fill(Vector::new([2.0, 0.0]));
        let warped = WarpMultiTransform::new(false, 0.5)
            .warp_image(&image, image.geometry(), None, Some(&field))
            .unwrap()
            .to_volume()
            .unwrap();
        assert!((warped.value(&[3, 3]) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_warp_points_affine_then_field() {
        let geometry = ImageGeometry::<2>::from_size([10, 10]);
        let mut field = VectorField::zeros(geometry);
        field.set(&[5, 5], Vector::new([0.0, 1.0]));
        let affine = AffineTransform::from_translation(Vector::new([1.0, 1.0]));
        let points = PointSet::new(vec![Point::new([4.0, 4.0]), Point::new([40.0, 4.0])]);

        let warped = WarpMultiTransform::default().warp_points(&points, Some(&affine), Some(&field));
        assert_eq!(warped.points()[0], Point::new([5.0, 6.0]));
        assert_eq!(warped.points()[1], Point::new([41.0, 5.0]));
    }
}
