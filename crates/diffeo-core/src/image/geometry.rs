//! Sampling grid geometry shared by images and vector fields.
//!
//! Axis 0 is the fastest-varying axis of every host buffer; burn tensors store
//! the same data with their dimensions reversed (`[Z, Y, X]` for 3-D).

use crate::error::{FieldError, Result};
use crate::spatial::{Direction, Point, Spacing, Vector};

/// Tolerance used when comparing origins, spacings and directions.
const GRID_TOLERANCE: f64 = 1e-6;

/// Grid geometry: size, origin, spacing and direction cosines.
///
/// Maps indices to physical points with
/// `point = origin + direction * (index * spacing)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry<const D: usize> {
    size: [usize; D],
    origin: Point<D>,
    spacing: Spacing<D>,
    direction: Direction<D>,
    inverse_direction: Direction<D>,
}

impl<const D: usize> ImageGeometry<D> {
    /// Create a new geometry.
    ///
    /// Fails if any size is zero, any spacing is not strictly positive or the
    /// direction matrix is singular.
    pub fn new(
        size: [usize; D],
        origin: Point<D>,
        spacing: Spacing<D>,
        direction: Direction<D>,
    ) -> Result<Self> {
        if size.iter().any(|&s| s == 0) {
            return Err(FieldError::invalid_geometry(format!("zero-sized axis in {:?}", size)));
        }
        if (0..D).any(|i| !(spacing[i] > 0.0)) {
            return Err(FieldError::invalid_geometry(format!(
                "spacing must be positive, got {:?}",
                spacing.to_array()
            )));
        }
        let inverse_direction = direction.try_inverse().ok_or(FieldError::SingularDirection)?;
        Ok(Self {
            size,
            origin,
            spacing,
            direction,
            inverse_direction,
        })
    }

    /// Unit spacing, zero origin, identity direction.
    pub fn from_size(size: [usize; D]) -> Self {
        Self {
            size,
            origin: Point::origin(),
            spacing: Spacing::uniform(1.0),
            direction: Direction::identity(),
            inverse_direction: Direction::identity(),
        }
    }

    pub fn size(&self) -> [usize; D] {
        self.size
    }

    pub fn origin(&self) -> &Point<D> {
        &self.origin
    }

    pub fn spacing(&self) -> &Spacing<D> {
        &self.spacing
    }

    pub fn direction(&self) -> &Direction<D> {
        &self.direction
    }

    pub fn inverse_direction(&self) -> &Direction<D> {
        &self.inverse_direction
    }

    /// Tensor shape holding this grid (dimensions reversed).
    pub fn tensor_shape(&self) -> [usize; D] {
        std::array::from_fn(|i| self.size[D - 1 - i])
    }

    /// Total number of voxels.
    pub fn num_voxels(&self) -> usize {
        self.size.iter().product()
    }

    /// Linear buffer offset of an index.
    #[inline]
    pub fn offset(&self, index: &[usize; D]) -> usize {
        let mut offset = 0;
        let mut stride = 1;
        for i in 0..D {
            offset += index[i] * stride;
            stride *= self.size[i];
        }
        offset
    }

    /// Index of a linear buffer offset.
    #[inline]
    pub fn index_of(&self, mut offset: usize) -> [usize; D] {
        let mut index = [0usize; D];
        for i in 0..D {
            index[i] = offset % self.size[i];
            offset /= self.size[i];
        }
        index
    }

    /// Iterate every index in buffer order.
    pub fn indices(&self) -> impl Iterator<Item = [usize; D]> + '_ {
        (0..self.num_voxels()).map(move |o| self.index_of(o))
    }

    /// Physical point of a grid index.
    pub fn index_to_physical(&self, index: &[usize; D]) -> Point<D> {
        let continuous: [f64; D] = std::array::from_fn(|i| index[i] as f64);
        self.continuous_index_to_physical(&continuous)
    }

    /// Physical point of a continuous index.
    pub fn continuous_index_to_physical(&self, index: &[f64; D]) -> Point<D> {
        let mut scaled = Vector::<D>::zeros();
        for i in 0..D {
            scaled[i] = index[i] * self.spacing[i];
        }
        self.origin + self.direction * scaled
    }

    /// Continuous index of a physical point.
    pub fn physical_to_continuous_index(&self, point: &Point<D>) -> [f64; D] {
        let rotated = self.inverse_direction * (*point - self.origin);
        std::array::from_fn(|i| rotated[i] / self.spacing[i])
    }

    /// Physical vector expressed along the index axes, in voxel units.
    pub fn physical_to_index_vector(&self, vector: &Vector<D>) -> Vector<D> {
        (self.inverse_direction * *vector).component_div(&self.spacing)
    }

    /// Whether a continuous index lies inside `[0, size - 1]` on every axis.
    pub fn is_inside_buffer(&self, index: &[f64; D]) -> bool {
        (0..D).all(|i| index[i] >= 0.0 && index[i] <= (self.size[i] - 1) as f64)
    }

    /// Whether a physical point maps inside the buffer.
    pub fn contains_point(&self, point: &Point<D>) -> bool {
        self.is_inside_buffer(&self.physical_to_continuous_index(point))
    }

    /// Whether an index lies within `radius` voxels of the domain boundary.
    pub fn is_boundary(&self, index: &[usize; D], radius: &[usize; D]) -> bool {
        (0..D).any(|i| index[i] < radius[i] || index[i] + radius[i] >= self.size[i])
    }

    /// True if both grids have equal size and matching origin, spacing and direction.
    pub fn same_grid(&self, other: &Self) -> bool {
        self.size == other.size
            && (self.origin - other.origin).norm() <= GRID_TOLERANCE
            && (self.spacing - other.spacing).norm() <= GRID_TOLERANCE
            && (self.direction.0 - other.direction.0).abs().max() <= GRID_TOLERANCE
    }

    /// Error unless `other` shares this grid.
    pub fn ensure_same_grid(&self, other: &Self, context: &str) -> Result<()> {
        if self.same_grid(other) {
            Ok(())
        } else {
            Err(FieldError::geometry_mismatch(format!(
                "{}: size {:?} vs {:?}, spacing {:?} vs {:?}",
                context,
                self.size,
                other.size,
                self.spacing.to_array(),
                other.spacing.to_array()
            )))
        }
    }

    /// Same grid with a different direction matrix.
    pub fn with_direction(&self, direction: Direction<D>) -> Result<Self> {
        Self::new(self.size, self.origin, self.spacing, direction)
    }

    /// Coarser grid covering the same physical extent.
    ///
    /// Each axis is shrunk by its integer factor (at least one voxel remains)
    /// and the origin moves so that the first coarse voxel is centred on the
    /// block of fine voxels it replaces.
    pub fn shrink(&self, factors: &[usize; D]) -> Result<Self> {
        if factors.iter().any(|&f| f == 0) {
            return Err(FieldError::invalid_geometry("shrink factor must be at least 1"));
        }
        let size: [usize; D] = std::array::from_fn(|i| (self.size[i] / factors[i]).max(1));
        let spacing = self.spacing.scaled_by(factors);
        let mut shift = Vector::<D>::zeros();
        for i in 0..D {
            shift[i] = 0.5 * (factors[i] as f64 - 1.0) * self.spacing[i];
        }
        let origin = self.origin + self.direction * shift;
        Self::new(size, origin, spacing, self.direction)
    }

    /// Physical centre of the grid.
    pub fn center(&self) -> Point<D> {
        let index: [f64; D] = std::array::from_fn(|i| 0.5 * (self.size[i] - 1) as f64);
        self.continuous_index_to_physical(&index)
    }
}
