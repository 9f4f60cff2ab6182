use diffeo_core::field::{
    compose_fields, integrate_constant_velocity, invert_field, InversionConfig, TimeVaryingVelocityField,
    VectorField,
};
use diffeo_core::filter::{smooth_field, smooth_field_gaussian, SmoothingConfig};
use diffeo_core::image::ImageGeometry;
use diffeo_core::spatial::{Point, Spacing, Vector, Direction};
use proptest::prelude::*;

fn geometry() -> ImageGeometry<2> {
    ImageGeometry::new([24, 20], Point::new([-3.0, 4.0]), Spacing::new([1.5, 1.0]), Direction::identity()).unwrap()
}

/// Smooth, small displacement vanishing towards the edges.
fn bump(amplitude: f64, geometry: ImageGeometry<2>) -> VectorField<2> {
    let center = geometry.center();
    let extent = [geometry.size()[0] as f64 * geometry.spacing()[0], geometry.size()[1] as f64 * geometry.spacing()[1]];
    VectorField::from_fn(geometry, move |p| {
        let dx = (p[0] - center[0]) / extent[0];
        let dy = (p[1] - center[1]) / extent[1];
        let g = (-(dx * dx + dy * dy) * 20.0).exp();
        Vector::new([amplitude * g, -0.5 * amplitude * g])
    })
}

proptest! {
    #[test]
    fn test_compose_with_zero_is_identity(ax in -1.0f64..1.0, ay in -1.0f64..1.0, sign in -2.0f64..2.0) {
        let field = VectorField::from_fn(geometry(), |p| Vector::new([ax * (0.1 * p[1]).sin(), ay * (0.1 * p[0]).cos()]));
        let zero = VectorField::zeros_like(&field);

        let right = compose_fields(&field, &zero, sign).unwrap();
        prop_assert_eq!(&right, &field);

        let left = compose_fields(&zero, &field, 1.0).unwrap();
        for (a, b) in left.values().iter().zip(field.values()) {
            prop_assert!((*a - *b).norm() < 1e-9);
        }
    }

    #[test]
    fn test_index_offset_roundtrip(x in 0usize..24, y in 0usize..20) {
        let geometry = geometry();
        let offset = geometry.offset(&[x, y]);
        prop_assert_eq!(geometry.index_of(offset), [x, y]);
    }
}

#[test]
fn test_double_inversion_recovers_field() {
    let field = bump(1.5, geometry());
    let config = InversionConfig::default().with_max_iterations(50).with_tolerance(1e-3);
    let inverse = invert_field(&field, &config).unwrap();
    let recovered = invert_field(&inverse, &config).unwrap();

    let worst = field
        .values()
        .iter()
        .zip(recovered.values())
        .map(|(a, b)| (*a - *b).norm())
        .fold(0.0, f64::max);
    assert!(worst < 0.05, "double inversion error {worst}");
}

#[test]
fn test_composition_with_inverse_is_near_zero() {
    let field = bump(2.0, geometry());
    let inverse = invert_field(&field, &InversionConfig::default().with_max_iterations(50)).unwrap();
    let residual = compose_fields(&inverse, &field, 1.0).unwrap();
    assert!(residual.max_magnitude_in_voxels() < 0.05);
}

#[test]
fn test_exponential_of_small_velocity_is_near_velocity() {
    let velocity = bump(0.2, geometry());
    let phi = integrate_constant_velocity(&velocity, 10, 0.1).unwrap();
    let worst = velocity
        .values()
        .iter()
        .zip(phi.values())
        .map(|(a, b)| (*a - *b).norm())
        .fold(0.0, f64::max);
    assert!(worst < 0.01);
}

#[test]
fn test_forward_and_backward_exponentials_cancel() {
    let velocity = bump(0.8, geometry());
    let forward = integrate_constant_velocity(&velocity, 4, 0.25).unwrap();
    let backward = integrate_constant_velocity(&velocity, 4, -0.25).unwrap();
    let scale = forward.max_magnitude_in_voxels();
    assert!(scale > 0.5, "forward map too small to be meaningful: {scale}");

    // Both orders of composition come back to the identity map.
    for residual in [
        compose_fields(&forward, &backward, 1.0).unwrap(),
        compose_fields(&backward, &forward, 1.0).unwrap(),
    ] {
        let worst = residual.max_magnitude_in_voxels();
        assert!(worst < 0.035, "exp(v) o exp(-v) residual {worst} voxels");
        assert!(worst < 0.06 * scale);
    }
}

#[test]
fn test_velocity_from_half_fields_interpolates_in_time() {
    let f = bump(1.0, geometry());
    let m = bump(0.5, geometry());
    let tv = TimeVaryingVelocityField::from_half_fields(&f, &m).unwrap();
    assert_eq!(tv.num_time_points(), 2);

    let index = [12, 10];
    let p = geometry().index_to_physical(&index);
    let fixed_half = f.get(&index);
    let moving_half = m.get(&index);

    // Slice 0 holds the fixed half, slice 1 the negated moving half.
    let start = tv.evaluate(&p, tv.time_index(0.0));
    let end = tv.evaluate(&p, tv.time_index(1.0));
    let mid = tv.evaluate(&p, tv.time_index(0.5));
    let quarter = tv.evaluate(&p, tv.time_index(0.25));
    assert!((start - fixed_half).norm() < 1e-12);
    assert!((end + moving_half).norm() < 1e-12);
    assert!((mid - (fixed_half - moving_half) * 0.5).norm() < 1e-12);
    assert!((quarter - (fixed_half * 0.75 - moving_half * 0.25)).norm() < 1e-12);
}

#[test]
fn test_gaussian_smoothing_properties() {
    let mut field = bump(1.0, geometry());
    let original = field.deep_copy();
    smooth_field_gaussian(&mut field, 0.0, 0.001, 256);
    assert_eq!(field, original);

    smooth_field(&mut field, &SmoothingConfig::gaussian(2.0)).unwrap();
    let geometry = field.geometry().clone();
    for index in geometry.indices() {
        if geometry.is_boundary(&index, &[1, 1]) {
            assert!(field.get(&index).is_zero());
        }
    }
    assert!(field.max_magnitude() < original.max_magnitude());
}

#[test]
fn test_mismatched_grids_are_rejected() {
    let a = bump(1.0, geometry());
    let b = bump(1.0, ImageGeometry::from_size([24, 20]));
    assert!(compose_fields(&a, &b, 1.0).is_err());
    let mut c = a.deep_copy();
    assert!(c.add_scaled(&b, 1.0).is_err());
}
