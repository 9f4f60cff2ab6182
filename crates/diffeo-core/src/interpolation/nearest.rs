//! Nearest neighbor interpolation on tensors.

use burn::tensor::{Tensor, Int};
use burn::tensor::backend::Backend;
use serde::{Serialize, Deserialize};
use super::trait_::Interpolator;

/// Nearest neighbor interpolator (rounds to the nearest voxel, clamped).
///
/// Used for label-like data such as masks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NearestNeighborInterpolator;

impl NearestNeighborInterpolator {
    /// Create a new nearest neighbor interpolator.
    pub fn new() -> Self {
        Self
    }
}

impl<B: Backend> Interpolator<B> for NearestNeighborInterpolator {
    fn interpolate<const D: usize>(&self, data: &Tensor<B, D>, indices: Tensor<B, 2>) -> Tensor<B, 1> {
        let dims: [usize; D] = data.dims();
        let total: usize = dims.iter().product();
        let flat_data = data.clone().reshape([total]);

        let mut idx: Option<Tensor<B, 1, Int>> = None;
        let mut stride = 1usize;
        for axis in 0..D {
            let extent = dims[D - 1 - axis];
            let coord = indices.clone().narrow(1, axis, 1).squeeze::<1>(1);
            let part = coord.round().clamp(0.0, (extent - 1) as f64).int() * (stride as i32);
            idx = Some(match idx {
                Some(acc) => acc + part,
                None => part,
            });
            stride *= extent;
        }

        match idx {
            Some(idx) => flat_data.gather(0, idx),
            None => Tensor::zeros([indices.dims()[0]], &indices.device()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_nearest_neighbor_interpolator_2d() {
        let device = Default::default();
        // [Y=2, X=3]
        let data = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0], vec![2, 3]),
            &device,
        );
        let interpolator = NearestNeighborInterpolator::new();

        let indices = Tensor::<TestBackend, 2>::from_floats(
            [[0.0, 0.0], [1.6, 0.2], [2.0, 0.9], [9.0, -3.0]],
            &device,
        );
        let values = interpolator.interpolate(&data, indices).into_data().to_vec::<f32>().unwrap();

        assert_eq!(values, vec![0.0, 2.0, 5.0, 2.0]);
    }

    #[test]
    fn test_nearest_neighbor_interpolator_3d() {
        let device = Default::default();
        let data = Tensor::<TestBackend, 3>::from_data(
            TensorData::new((0..8).map(|v| v as f32).collect::<Vec<_>>(), vec![2, 2, 2]),
            &device,
        );
        let interpolator = NearestNeighborInterpolator::new();
        let indices = Tensor::<TestBackend, 2>::from_floats([[0.9, 0.1, 0.7]], &device);
        let values = interpolator.interpolate(&data, indices).into_data().to_vec::<f32>().unwrap();
        // (x=1, y=0, z=1) -> 4 + 1
        assert_eq!(values, vec![5.0]);
    }
}
