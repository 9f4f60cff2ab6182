//! Chained transform: `T(x) = T2(T1(x))`.

use burn::tensor::Tensor;
use burn::tensor::backend::Backend;
use super::trait_::Transform;
use crate::spatial::Point;

/// Applies `first`, then `second`.
///
/// The warp utility chains a displacement field with the affine transform
/// this way.
#[derive(Debug, Clone)]
pub struct ChainedTransform<T1, T2> {
    pub first: T1,
    pub second: T2,
}

impl<T1, T2> ChainedTransform<T1, T2> {
    /// Create a new chained transform.
    pub fn new(first: T1, second: T2) -> Self {
        Self { first, second }
    }
}

impl<B: Backend, T1, T2, const D: usize> Transform<B, D> for ChainedTransform<T1, T2>
where
    T1: Transform<B, D>,
    T2: Transform<B, D>,
{
    fn transform_point(&self, point: &Point<D>) -> Point<D> {
        self.second.transform_point(&self.first.transform_point(point))
    }

    fn transform_points(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let intermediate = self.first.transform_points(points);
        self.second.transform_points(intermediate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use crate::spatial::Vector;
    use crate::transform::AffineTransform;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_chained_translations() {
        let device = Default::default();
        let t1 = AffineTransform::<2>::from_translation(Vector::new([1.0, 0.0]));
        let t2 = AffineTransform::<2>::from_translation(Vector::new([0.0, 1.0]));
        let chain = ChainedTransform::new(t1, t2);

        let q = Transform::<TestBackend, 2>::transform_point(&chain, &Point::new([0.0, 0.0]));
        assert_eq!(q, Point::new([1.0, 1.0]));

        let points = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0]], &device);
        let values = Transform::<TestBackend, 2>::transform_points(&chain, points)
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert_eq!(values, vec![1.0, 1.0]);
    }

    #[test]
    fn test_chain_order_matters() {
        let scale = AffineTransform::<2>::new(
            nalgebra::SMatrix::<f64, 2, 2>::identity() * 2.0,
            Vector::zeros(),
            Point::origin(),
        );
        let shift = AffineTransform::<2>::from_translation(Vector::new([1.0, 0.0]));
        let p = Point::new([1.0, 0.0]);

        let a = Transform::<TestBackend, 2>::transform_point(&ChainedTransform::new(scale, shift), &p);
        let b = Transform::<TestBackend, 2>::transform_point(&ChainedTransform::new(shift, scale), &p);
        assert_eq!(a, Point::new([3.0, 0.0]));
        assert_eq!(b, Point::new([4.0, 0.0]));
    }
}
