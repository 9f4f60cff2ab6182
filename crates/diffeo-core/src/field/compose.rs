//! Composition of displacement fields and the constant-velocity exponential.

use rayon::prelude::*;
use crate::error::Result;
use crate::field::VectorField;
use crate::interpolation::VectorLinearInterpolator;

/// Right-compose `field` onto `to_warp_by`.
///
/// For every voxel `x` of `to_warp_by` the result is
/// `to_warp_by(x) + time_sign * field(x + to_warp_by(x))`, where samples of
/// `field` outside its buffer count as zero.
pub fn compose_fields<const D: usize>(
    to_warp_by: &VectorField<D>,
    field: &VectorField<D>,
    time_sign: f64,
) -> Result<VectorField<D>> {
    let mut composed = to_warp_by.deep_copy();
    compose_in_place(&mut composed, field, time_sign)?;
    Ok(composed)
}

/// In-place form of [`compose_fields`]: `target` is both the warp and the output.
///
/// Each voxel reads only its own value of `target`, so overwriting is safe.
pub fn compose_in_place<const D: usize>(
    target: &mut VectorField<D>,
    field: &VectorField<D>,
    time_sign: f64,
) -> Result<()> {
    target.geometry().ensure_same_grid(field.geometry(), "compose")?;
    let interpolator = VectorLinearInterpolator::new(field);
    let geometry = target.geometry().clone();

    target
        .values_mut()
        .par_iter_mut()
        .enumerate()
        .for_each(|(offset, displacement)| {
            let start = geometry.index_to_physical(&geometry.index_of(offset));
            let sampled = interpolator.sample(&(start + *displacement));
            *displacement += sampled * time_sign;
        });
    Ok(())
}

/// Group exponential of a stationary velocity by repeated composition.
///
/// Starting from the zero map, composes `velocity` scaled by `step` onto the
/// accumulated displacement `n_steps` times.
pub fn integrate_constant_velocity<const D: usize>(
    velocity: &VectorField<D>,
    n_steps: usize,
    step: f64,
) -> Result<VectorField<D>> {
    let mut displacement = VectorField::zeros_like(velocity);
    for _ in 0..n_steps {
        compose_in_place(&mut displacement, velocity, step)?;
    }
    Ok(displacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageGeometry;
    use crate::spatial::Vector;

    fn geometry() -> ImageGeometry<2> {
        ImageGeometry::from_size([12, 12])
    }

    #[test]
    fn test_compose_with_zero_is_identity() {
        let f = VectorField::from_fn(geometry(), |p| Vector::new([0.1 * p[1], -0.05 * p[0]]));
        let zero = VectorField::zeros_like(&f);
        let composed = compose_fields(&f, &zero, 1.0).unwrap();
        assert_eq!(composed, f);

        let composed = compose_fields(&zero, &f, 1.0).unwrap();
        for (a, b) in composed.values().iter().zip(f.values()) {
            assert!((*a - *b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_compose_translations_add() {
        let mut a = VectorField::zeros(geometry());
        a.fill(Vector::new([1.0, 0.0]));
        let mut b = VectorField::zeros(geometry());
        b.fill(Vector::new([0.0, 2.0]));

        let composed = compose_fields(&a, &b, 1.0).unwrap();
        assert_eq!(composed.get(&[3, 3]), Vector::new([1.0, 2.0]));

        let composed = compose_fields(&a, &b, -0.5).unwrap();
        assert_eq!(composed.get(&[3, 3]), Vector::new([1.0, -1.0]));

        // the translated sample point leaves the buffer on the last column
        assert_eq!(composed.get(&[11, 3]), Vector::new([1.0, 0.0]));
    }

    #[test]
    fn test_compose_rejects_mismatched_grids() {
        let a = VectorField::<2>::zeros(geometry());
        let b = VectorField::<2>::zeros(ImageGeometry::from_size([6, 6]));
        assert!(compose_fields(&a, &b, 1.0).is_err());
    }

    #[test]
    fn test_constant_velocity_steps_accumulate() {
        let mut v = VectorField::zeros(geometry());
        v.fill(Vector::new([0.5, 0.0]));
        let phi = integrate_constant_velocity(&v, 3, 1.0).unwrap();
        assert!((phi.get(&[2, 5]) - Vector::new([1.5, 0.0])).norm() < 1e-12);

        let none = integrate_constant_velocity(&v, 0, 1.0).unwrap();
        assert!(none.is_zero());
    }
}
