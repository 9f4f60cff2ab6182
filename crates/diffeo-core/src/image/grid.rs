use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;

/// Generate the continuous indices of every voxel of a grid.
///
/// Returns a tensor of shape `[N, D]` whose rows are `(x, y, z)` indices in
/// buffer order (axis 0 fastest).
///
/// # Arguments
/// * `size` - Grid size in axis order `[X, Y, ...]`
/// * `device` - The device to create the tensor on
pub fn generate_grid<B, const D: usize>(size: [usize; D], device: &B::Device) -> Tensor<B, 2>
where
    B: Backend,
{
    let total: usize = size.iter().product();
    let mut grid = Vec::with_capacity(total * D);
    let mut index = [0usize; D];
    for _ in 0..total {
        grid.extend(index.iter().map(|&i| i as f32));
        for axis in 0..D {
            index[axis] += 1;
            if index[axis] < size[axis] {
                break;
            }
            index[axis] = 0;
        }
    }

    Tensor::<B, 2>::from_data(TensorData::new(grid, vec![total, D]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_generate_grid_3d_order() {
        let device = Default::default();
        let grid = generate_grid::<TestBackend, 3>([3, 2, 2], &device);
        assert_eq!(grid.dims(), [12, 3]);

        let values = grid.into_data().to_vec::<f32>().unwrap();
        assert_eq!(&values[0..3], &[0.0, 0.0, 0.0]);
        assert_eq!(&values[3..6], &[1.0, 0.0, 0.0]);
        assert_eq!(&values[9..12], &[0.0, 1.0, 0.0]);
        assert_eq!(&values[33..36], &[2.0, 1.0, 1.0]);
    }
}
