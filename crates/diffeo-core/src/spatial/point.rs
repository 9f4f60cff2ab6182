//! Point type for representing spatial coordinates.
//!
//! Points represent positions in physical space.

use nalgebra::Point as NaPoint;
use super::Vector;
use serde::{Serialize, Deserialize};

/// A point in D-dimensional physical space.
///
/// Thin wrapper around nalgebra's `Point`. Used for image origins, voxel
/// centres mapped to physical space and landmark positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<const D: usize>(pub NaPoint<f64, D>);

impl<const D: usize> Point<D> {
    /// Create a new point from coordinates.
    pub fn new(coords: [f64; D]) -> Self {
        Self(NaPoint::from(coords))
    }

    /// Create a point at the origin (all coordinates zero).
    pub fn origin() -> Self {
        Self(NaPoint::origin())
    }

    /// Create a new point from a slice of coordinates.
    pub fn from_slice(coords: &[f64]) -> Self {
        assert!(coords.len() == D, "Coordinate slice length must match dimension");
        let mut point = Self::origin();
        for (i, &c) in coords.iter().enumerate() {
            point.0.coords[i] = c;
        }
        point
    }

    /// Coordinates as a fixed-size array.
    pub fn to_array(&self) -> [f64; D] {
        std::array::from_fn(|i| self.0.coords[i])
    }

    /// Position vector of this point (displacement from the origin).
    pub fn coords(&self) -> Vector<D> {
        Vector(self.0.coords)
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Self) -> f64 {
        (self.0.coords - other.0.coords).norm()
    }
}

impl<const D: usize> Default for Point<D> {
    fn default() -> Self {
        Self::origin()
    }
}

impl<const D: usize> std::ops::Index<usize> for Point<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0.coords[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Point<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0.coords[index]
    }
}

impl<const D: usize> std::ops::Sub for Point<D> {
    type Output = Vector<D>;

    fn sub(self, other: Self) -> Self::Output {
        Vector(self.0.coords - other.0.coords)
    }
}

impl<const D: usize> std::ops::Add<Vector<D>> for Point<D> {
    type Output = Self;

    fn add(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 + vector.0)
    }
}

impl<const D: usize> std::ops::Sub<Vector<D>> for Point<D> {
    type Output = Self;

    fn sub(self, vector: Vector<D>) -> Self::Output {
        Self(self.0 - vector.0)
    }
}

impl<const D: usize> std::ops::AddAssign<Vector<D>> for Point<D> {
    fn add_assign(&mut self, vector: Vector<D>) {
        self.0 += vector.0;
    }
}
