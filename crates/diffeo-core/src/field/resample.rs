//! Carrying a displacement field onto another grid.

use crate::field::VectorField;
use crate::image::ImageGeometry;
use crate::interpolation::VectorLinearInterpolator;

/// Linearly resample `field` onto `geometry`.
///
/// Displacements stay in physical units, so no rescaling is needed when the
/// spacing changes between resolution levels. Points of the new grid that
/// fall outside the old buffer get a zero displacement.
pub fn resample_field<const D: usize>(field: &VectorField<D>, geometry: &ImageGeometry<D>) -> VectorField<D> {
    if field.geometry().same_grid(geometry) {
        return field.deep_copy();
    }
    let interpolator = VectorLinearInterpolator::new(field);
    VectorField::from_fn(geometry.clone(), |point| interpolator.sample(point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::{Point, Spacing, Direction, Vector};

    #[test]
    fn test_resample_same_grid_is_copy() {
        let geometry = ImageGeometry::<2>::from_size([6, 5]);
        let field = VectorField::from_fn(geometry.clone(), |p| Vector::new([p[0], -p[1]]));
        assert_eq!(resample_field(&field, &geometry), field);
    }

    #[test]
    fn test_resample_to_finer_grid_keeps_linear_field() {
        let coarse = ImageGeometry::<2>::new(
            [5, 5],
            Point::new([0.0, 0.0]),
            Spacing::new([2.0, 2.0]),
            Direction::identity(),
        )
        .unwrap();
        let fine = ImageGeometry::<2>::from_size([9, 9]);
        let field = VectorField::from_fn(coarse, |p| Vector::new([0.1 * p[0], 0.2 * p[1]]));

        let resampled = resample_field(&field, &fine);
        assert_eq!(resampled.geometry(), &fine);
        let v = resampled.get(&[3, 5]);
        assert!((v[0] - 0.3).abs() < 1e-9);
        assert!((v[1] - 1.0).abs() < 1e-9);
    }
}
