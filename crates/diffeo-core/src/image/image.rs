//! Image type with physical metadata and coordinate transformations.
//!
//! An `Image` pairs tensor data (potentially on GPU) with the grid geometry
//! that maps its indices to physical coordinates.

use burn::tensor::{Tensor, TensorData};
use burn::tensor::backend::Backend;
use crate::error::{FieldError, Result};
use crate::image::{ImageGeometry, ScalarVolume};
use crate::spatial::{Point, Spacing, Direction};

/// Image with physical metadata.
///
/// # Type Parameters
/// * `B` - The backend (CPU or GPU) for tensor operations
/// * `D` - The dimensionality of the image (2 or 3)
///
/// # Coordinate Systems
/// * **Index Space**: voxel indices `(x, y, z)`, axis 0 fastest
/// * **Physical Space**: continuous coordinates in mm or other units
///
/// The tensor stores the axes in reverse order (`[Z, Y, X]` for 3-D).
///
/// # Examples
/// ```rust
/// use diffeo_core::image::{Image, ImageGeometry};
/// use burn::tensor::Tensor;
/// use burn_ndarray::NdArray;
///
/// type Backend = NdArray<f32>;
///
/// let device = Default::default();
/// let geometry = ImageGeometry::<3>::from_size([12, 10, 8]);
/// let data = Tensor::<Backend, 3>::zeros(geometry.tensor_shape(), &device);
/// let image = Image::new(data, geometry).unwrap();
/// assert_eq!(image.shape(), [8, 10, 12]);
/// ```
#[derive(Debug, Clone)]
pub struct Image<B: Backend, const D: usize> {
    data: Tensor<B, D>,
    geometry: ImageGeometry<D>,
}

impl<B: Backend, const D: usize> Image<B, D> {
    /// Create a new image; the tensor shape must match the geometry.
    pub fn new(data: Tensor<B, D>, geometry: ImageGeometry<D>) -> Result<Self> {
        let actual: [usize; D] = data.dims();
        let expected = geometry.tensor_shape();
        if actual != expected {
            return Err(FieldError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(Self { data, geometry })
    }

    /// Upload a host volume.
    pub fn from_volume(volume: &ScalarVolume<D>, device: &B::Device) -> Self {
        let geometry = volume.geometry().clone();
        let data = Tensor::<B, D>::from_data(
            TensorData::new(volume.data().to_vec(), geometry.tensor_shape().to_vec()),
            device,
        );
        Self { data, geometry }
    }

    /// Download the voxel values into a host volume.
    pub fn to_volume(&self) -> Result<ScalarVolume<D>> {
        let values = self
            .data
            .clone()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| FieldError::tensor_data(format!("{:?}", e)))?;
        ScalarVolume::new(self.geometry.clone(), values)
    }

    /// Get the image data tensor.
    pub fn data(&self) -> &Tensor<B, D> {
        &self.data
    }

    /// Same geometry, new voxel data.
    pub fn with_data(&self, data: Tensor<B, D>) -> Result<Self> {
        Self::new(data, self.geometry.clone())
    }

    pub fn geometry(&self) -> &ImageGeometry<D> {
        &self.geometry
    }

    /// Get the origin (physical coordinate of first pixel).
    pub fn origin(&self) -> &Point<D> {
        self.geometry.origin()
    }

    /// Get the spacing (physical distance between pixels).
    pub fn spacing(&self) -> &Spacing<D> {
        self.geometry.spacing()
    }

    /// Get the direction (orientation matrix).
    pub fn direction(&self) -> &Direction<D> {
        self.geometry.direction()
    }

    /// Tensor shape (reversed axis order).
    pub fn shape(&self) -> [usize; D] {
        self.data.dims()
    }

    /// Grid size in axis order.
    pub fn size(&self) -> [usize; D] {
        self.geometry.size()
    }

    /// Batch transform physical points to continuous indices.
    ///
    /// # Arguments
    /// * `points` - A tensor of shape `[Batch, D]` containing physical points
    ///
    /// # Returns
    /// A tensor of shape `[Batch, D]` containing continuous indices `(x, y, z)`
    pub fn world_to_index_tensor(&self, points: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = points.device();
        let origin_tensor = self.origin_tensor(&device);

        // I = (P - O) @ T with T[r, c] = inv_dir[c, r] / spacing[c]
        let inv_dir = self.geometry.inverse_direction();
        let spacing = self.geometry.spacing();
        let mut t_data = Vec::with_capacity(D * D);
        for r in 0..D {
            for c in 0..D {
                t_data.push((inv_dir[(c, r)] / spacing[c]) as f32);
            }
        }
        let t_tensor = Tensor::<B, 2>::from_data(TensorData::new(t_data, vec![D, D]), &device);

        (points - origin_tensor).matmul(t_tensor)
    }

    /// Batch transform continuous indices to physical points.
    ///
    /// # Arguments
    /// * `indices` - A tensor of shape `[Batch, D]` containing continuous indices
    ///
    /// # Returns
    /// A tensor of shape `[Batch, D]` containing physical points
    pub fn index_to_world_tensor(&self, indices: Tensor<B, 2>) -> Tensor<B, 2> {
        index_to_world_tensor(&self.geometry, indices)
    }

    fn origin_tensor(&self, device: &B::Device) -> Tensor<B, 2> {
        origin_tensor::<B, D>(&self.geometry, device)
    }
}

fn origin_tensor<B: Backend, const D: usize>(
    geometry: &ImageGeometry<D>,
    device: &B::Device,
) -> Tensor<B, 2> {
    let origin_vec: Vec<f32> = (0..D).map(|i| geometry.origin()[i] as f32).collect();
    Tensor::<B, 2>::from_data(TensorData::new(origin_vec, vec![1, D]), device)
}

/// Map a `[Batch, D]` tensor of continuous indices of `geometry` to physical points.
pub fn index_to_world_tensor<B: Backend, const D: usize>(
    geometry: &ImageGeometry<D>,
    indices: Tensor<B, 2>,
) -> Tensor<B, 2> {
    let device = indices.device();
    let origin = origin_tensor::<B, D>(geometry, &device);

    // P = O + I @ M with M[r, c] = spacing[r] * dir[c, r]
    let spacing = geometry.spacing();
    let direction = geometry.direction();
    let mut m_data = Vec::with_capacity(D * D);
    for r in 0..D {
        for c in 0..D {
            m_data.push((spacing[r] * direction[(c, r)]) as f32);
        }
    }
    let m_tensor = Tensor::<B, 2>::from_data(TensorData::new(m_data, vec![D, D]), &device);

    indices.matmul(m_tensor) + origin
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type Backend = NdArray<f32>;

    fn rotated_geometry() -> ImageGeometry<3> {
        let mut direction = Direction::<3>::zeros();
        direction[(0, 1)] = -1.0;
        direction[(1, 0)] = 1.0;
        direction[(2, 2)] = 1.0;
        ImageGeometry::new(
            [6, 5, 4],
            Point::new([1.0, 2.0, 3.0]),
            Spacing::new([2.0, 1.0, 0.5]),
            direction,
        )
        .unwrap()
    }

    #[test]
    fn test_image_creation() {
        let device = Default::default();
        let geometry = rotated_geometry();
        let data = Tensor::<Backend, 3>::zeros([4, 5, 6], &device);
        let image = Image::new(data, geometry.clone()).unwrap();

        assert_eq!(image.shape(), [4, 5, 6]);
        assert_eq!(image.size(), [6, 5, 4]);
        assert_eq!(image.origin(), geometry.origin());

        let wrong = Tensor::<Backend, 3>::zeros([6, 5, 4], &device);
        assert!(Image::new(wrong, geometry).is_err());
    }

    #[test]
    fn test_volume_roundtrip_keeps_buffer_order() {
        let device = Default::default();
        let geometry = ImageGeometry::<2>::from_size([3, 2]);
        let volume = ScalarVolume::new(geometry, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        let image = Image::<Backend, 2>::from_volume(&volume, &device);
        assert_eq!(image.shape(), [2, 3]);

        // x fastest: element (x=2, y=1) is the last one
        let back = image.to_volume().unwrap();
        assert_eq!(back.value(&[2, 1]), 5.0);
        assert_eq!(back, volume);
    }

    #[test]
    fn test_tensor_mappings_match_host() {
        let device = Default::default();
        let geometry = rotated_geometry();
        let image = Image::new(Tensor::<Backend, 3>::zeros([4, 5, 6], &device), geometry.clone()).unwrap();

        let index = [2.0, 3.0, 1.0];
        let expected = geometry.continuous_index_to_physical(&index);

        let indices = Tensor::<Backend, 2>::from_floats([[2.0, 3.0, 1.0]], &device);
        let points = image.index_to_world_tensor(indices);
        let p = points.clone().into_data().to_vec::<f32>().unwrap();
        for i in 0..3 {
            assert!((p[i] as f64 - expected[i]).abs() < 1e-5);
        }

        let back = image.world_to_index_tensor(points).into_data().to_vec::<f32>().unwrap();
        for i in 0..3 {
            assert!((back[i] as f64 - index[i]).abs() < 1e-5);
        }
    }
}
