//! Ordered landmark collections in physical space.

use serde::{Deserialize, Serialize};
use diffeo_core::spatial::Point;

/// Ordered physical-space landmarks. The i-th fixed landmark corresponds to
/// the i-th moving landmark.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PointSet<const D: usize> {
    points: Vec<Point<D>>,
}

impl<const D: usize> PointSet<D> {
    pub fn new(points: Vec<Point<D>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point<D>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point<D>> {
        self.points.iter()
    }

    /// New set with every point mapped through `f`.
    pub fn map(&self, f: impl Fn(&Point<D>) -> Point<D>) -> Self {
        Self {
            points: self.points.iter().map(f).collect(),
        }
    }
}

impl<const D: usize> FromIterator<Point<D>> for PointSet<D> {
    fn from_iter<I: IntoIterator<Item = Point<D>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
