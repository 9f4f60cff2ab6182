//! Vector type for displacements, velocities and per-axis quantities.

use nalgebra::SVector;
use serde::{Serialize, Deserialize};

/// A vector in D-dimensional space.
///
/// Displacement and velocity samples of a vector field are `Vector`s, as are
/// image spacings. Thin wrapper around nalgebra's `SVector`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector<const D: usize>(pub SVector<f64, D>);

impl<const D: usize> Vector<D> {
    /// Create a new vector from components.
    pub fn new(components: [f64; D]) -> Self {
        Self(SVector::from(components))
    }

    /// Create a zero vector.
    pub fn zeros() -> Self {
        Self(SVector::zeros())
    }

    /// Create a vector with every component set to `value`.
    pub fn repeat(value: f64) -> Self {
        Self(SVector::repeat(value))
    }

    /// Create a new vector from a slice of components.
    pub fn from_slice(components: &[f64]) -> Self {
        assert!(components.len() == D, "Component slice length must match dimension");
        let mut vector = Self::zeros();
        for (i, &c) in components.iter().enumerate() {
            vector.0[i] = c;
        }
        vector
    }

    /// Components as a fixed-size array.
    pub fn to_array(&self) -> [f64; D] {
        std::array::from_fn(|i| self.0[i])
    }

    /// Unit vector along `axis`.
    pub fn axis(axis: usize) -> Self {
        let mut v = Self::zeros();
        v.0[axis] = 1.0;
        v
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.0.norm()
    }

    /// Squared Euclidean norm.
    pub fn norm_squared(&self) -> f64 {
        self.0.norm_squared()
    }

    /// Dot product.
    pub fn dot(&self, other: &Self) -> f64 {
        self.0.dot(&other.0)
    }

    /// Component-wise division.
    pub fn component_div(&self, other: &Self) -> Self {
        Self(self.0.component_div(&other.0))
    }

    /// Component-wise multiplication.
    pub fn component_mul(&self, other: &Self) -> Self {
        Self(self.0.component_mul(&other.0))
    }

    /// Magnitude measured in voxel units: `sqrt(sum((v_i / spacing_i)^2))`.
    pub fn norm_in_voxels(&self, spacing: &Self) -> f64 {
        self.component_div(spacing).norm()
    }

    /// True if every component is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&c| c == 0.0)
    }
}

impl<const D: usize> Default for Vector<D> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<const D: usize> std::ops::Index<usize> for Vector<D> {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<const D: usize> std::ops::IndexMut<usize> for Vector<D> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.0[index]
    }
}

impl<const D: usize> std::ops::Add for Vector<D> {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl<const D: usize> std::ops::Sub for Vector<D> {
    type Output = Self;

    fn sub(self, other: Self) -> Self::Output {
        Self(self.0 - other.0)
    }
}

impl<const D: usize> std::ops::Mul<f64> for Vector<D> {
    type Output = Self;

    fn mul(self, scalar: f64) -> Self::Output {
        Self(self.0 * scalar)
    }
}

impl<const D: usize> std::ops::Div<f64> for Vector<D> {
    type Output = Self;

    fn div(self, scalar: f64) -> Self::Output {
        Self(self.0 / scalar)
    }
}

impl<const D: usize> std::ops::Neg for Vector<D> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl<const D: usize> std::ops::AddAssign for Vector<D> {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl<const D: usize> std::ops::SubAssign for Vector<D> {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl<const D: usize> std::ops::MulAssign<f64> for Vector<D> {
    fn mul_assign(&mut self, scalar: f64) {
        self.0 *= scalar;
    }
}

impl<const D: usize> std::iter::Sum for Vector<D> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zeros(), |acc, v| acc + v)
    }
}
