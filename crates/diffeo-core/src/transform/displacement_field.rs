//! Dense displacement field transform.
//!
//! Maps `x` to `x + s * u(x)` where `u` is sampled linearly from a vector
//! field and `s` is a scale factor. Points outside the field are not moved.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use rayon::prelude::*;
use super::trait_::Transform;
use crate::field::VectorField;
use crate::interpolation::VectorLinearInterpolator;
use crate::spatial::Point;

/// Displacement field transform borrowing its field.
#[derive(Debug, Clone, Copy)]
pub struct DisplacementFieldTransform<'a, const D: usize> {
    field: &'a VectorField<D>,
    scale: f64,
}

impl<'a, const D: usize> DisplacementFieldTransform<'a, D> {
    pub fn new(field: &'a VectorField<D>) -> Self {
        Self { field, scale: 1.0 }
    }

    /// Scale applied to every displacement.
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn field(&self) -> &VectorField<D> {
        self.field
    }

    /// Map a point through the field.
    pub fn apply(&self, point: &Point<D>) -> Point<D> {
        *point + VectorLinearInterpolator::new(self.field).sample(point) * self.scale
    }
}

impl<'a, B: Backend, const D: usize> Transform<B, D> for DisplacementFieldTransform<'a, D> {
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        self.apply(point)
    }

    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let [batch, _] = points.dims();
        let coords: Vec<f32> = points.into_data().iter::<f32>().collect();
        let mapped: Vec<f32> = coords
            .par_chunks_exact(D)
            .flat_map_iter(|row| {
                let p = Point::<D>::new(std::array::from_fn(|i| row[i] as f64));
                let q = self.apply(&p);
                (0..D).map(move |i| q[i] as f32)
            })
            .collect();
        Tensor::<B, 2>::from_data(TensorData::new(mapped, vec![batch, D]), &device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::image::ImageGeometry;
    use crate::spatial::Vector;

    type TestBackend = NdArray<f32>;

    fn shift_field() -> VectorField<3> {
        let mut field = VectorField::zeros(ImageGeometry::from_size([8, 8, 8]));
        field.fill(Vector::new([1.0, 0.0, -0.5]));
        field
    }

    #[test]
    fn test_displacement_applied_inside_field() {
        let field = shift_field();
        let transform = DisplacementFieldTransform::new(&field);
        let q = transform.apply(&Point::new([2.0, 3.0, 4.0]));
        assert_eq!(q, Point::new([3.0, 3.0, 3.5]));

        let scaled = DisplacementFieldTransform::new(&field).with_scale(2.0);
        assert_eq!(scaled.apply(&Point::new([2.0, 3.0, 4.0])), Point::new([4.0, 3.0, 3.0]));
    }

    #[test]
    fn test_points_outside_field_unchanged() {
        let field = shift_field();
        let transform = DisplacementFieldTransform::new(&field);
        let p = Point::new([20.0, 3.0, 4.0]);
        assert_eq!(transform.apply(&p), p);
    }

    #[test]
    fn test_transform_points_tensor() {
        let device = Default::default();
        let field = shift_field();
        let transform = DisplacementFieldTransform::new(&field);
        let points = Tensor::<TestBackend, 2>::from_floats([[2.0, 3.0, 4.0], [1.0, 1.0, 1.0]], &device);
        let mapped = Transform::<TestBackend, 3>::transform_points(&transform, points);
        assert_eq!(mapped.dims(), [2, 3]);
        let values = mapped.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![3.0, 3.0, 3.5, 2.0, 1.0, 0.5]);
    }
}
