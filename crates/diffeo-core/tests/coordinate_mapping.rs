use diffeo_core::image::{Image, ImageGeometry};
use diffeo_core::spatial::{Direction, Point, Spacing};
use burn::tensor::Tensor;
use burn_ndarray::NdArray;
use nalgebra::{Rotation3, Vector3};
use proptest::prelude::*;
use std::f64::consts::PI;

type Backend = NdArray<f32>;
const D: usize = 3;

fn make_rotation(angle_x: f64, angle_y: f64, angle_z: f64) -> Direction<D> {
    let rotation = Rotation3::from_euler_angles(angle_x, angle_y, angle_z);
    Direction(rotation.into_inner())
}

proptest! {
    #[test]
    fn test_coordinate_roundtrip(
        ox in -100.0f64..100.0, oy in -100.0f64..100.0, oz in -100.0f64..100.0,
        sx in 0.1f64..5.0, sy in 0.1f64..5.0, sz in 0.1f64..5.0,
        ax in -3.14f64..3.14, ay in -3.14f64..3.14, az in -3.14f64..3.14,
        px in -50.0f64..50.0, py in -50.0f64..50.0, pz in -50.0f64..50.0
    ) {
        let geometry = ImageGeometry::new(
            [2, 2, 2],
            Point::<D>::new([ox, oy, oz]),
            Spacing::<D>::new([sx, sy, sz]),
            make_rotation(ax, ay, az),
        ).unwrap();
        let point = Point::<D>::new([px, py, pz]);

        let index = geometry.physical_to_continuous_index(&point);
        let recovered = geometry.continuous_index_to_physical(&index);

        prop_assert!((point[0] - recovered[0]).abs() < 1e-8, "X mismatch: {} vs {}", point[0], recovered[0]);
        prop_assert!((point[1] - recovered[1]).abs() < 1e-8, "Y mismatch: {} vs {}", point[1], recovered[1]);
        prop_assert!((point[2] - recovered[2]).abs() < 1e-8, "Z mismatch: {} vs {}", point[2], recovered[2]);
    }

    #[test]
    fn test_tensor_batch_consistency(
        ox in -10.0f64..10.0,
        sx in 0.5f64..2.0,
        angle in -3.0f64..3.0,
        px in -10.0f64..10.0,
        py in -10.0f64..10.0
    ) {
        let device = Default::default();
        let geometry = ImageGeometry::new(
            [2, 2, 2],
            Point::<D>::new([ox, -ox, 0.5 * ox]),
            Spacing::<D>::new([sx, 1.0, 2.0 * sx]),
            make_rotation(0.0, 0.0, angle),
        ).unwrap();
        let image = Image::new(Tensor::<Backend, D>::zeros([2, 2, 2], &device), geometry.clone()).unwrap();

        let point = Point::<D>::new([px, py, px - py]);
        let index = geometry.physical_to_continuous_index(&point);

        let points_tensor = Tensor::<Backend, 2>::from_floats([[px as f32, py as f32, (px - py) as f32]], &device);
        let indices = image.world_to_index_tensor(points_tensor);
        let values = indices.clone().into_data().to_vec::<f32>().unwrap();
        for axis in 0..D {
            prop_assert!((values[axis] - index[axis] as f32).abs() < 1e-3);
        }

        let back = image.index_to_world_tensor(indices).into_data().to_vec::<f32>().unwrap();
        for axis in 0..D {
            prop_assert!((back[axis] - point[axis] as f32).abs() < 1e-3);
        }
    }
}

#[test]
fn test_rotated_geometry_transform() {
    // Rotate 90 degrees around Z: index x runs along physical y.
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), PI / 2.0);
    let geometry = ImageGeometry::new(
        [10, 10, 10],
        Point::<D>::origin(),
        Spacing::<D>::uniform(1.0),
        Direction(rotation.into_inner()),
    )
    .unwrap();

    let index = geometry.physical_to_continuous_index(&Point::new([1.0, 0.0, 0.0]));
    assert!(index[0].abs() < 1e-9);
    assert!((index[1] + 1.0).abs() < 1e-9);
    assert!(index[2].abs() < 1e-9);
    assert!(!geometry.is_inside_buffer(&index));

    let p = geometry.index_to_physical(&[1, 0, 0]);
    assert!((p[1] - 1.0).abs() < 1e-9);
}
