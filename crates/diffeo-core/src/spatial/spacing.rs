//! Physical distance between adjacent voxels along each axis.

use super::Vector;

/// Spacing between adjacent voxels along each axis.
///
/// Type alias to `Vector` so spacings participate in the same arithmetic.
pub type Spacing<const D: usize> = Vector<D>;

impl<const D: usize> Spacing<D> {
    /// Create uniform spacing (same value for all dimensions).
    pub fn uniform(value: f64) -> Self {
        Vector::repeat(value)
    }

    /// Check if spacing is uniform (all components equal).
    pub fn is_uniform(&self) -> bool {
        (1..D).all(|i| (self[i] - self[0]).abs() < 1e-9)
    }

    /// Get the minimum spacing value.
    pub fn min_spacing(&self) -> f64 {
        (0..D).map(|i| self[i]).fold(f64::INFINITY, f64::min)
    }

    /// Get the maximum spacing value.
    pub fn max_spacing(&self) -> f64 {
        (0..D).map(|i| self[i]).fold(f64::NEG_INFINITY, f64::max)
    }

    /// Spacing after shrinking the grid by per-axis integer factors.
    pub fn scaled_by(&self, factors: &[usize; D]) -> Self {
        let mut out = *self;
        for i in 0..D {
            out[i] *= factors[i] as f64;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Spacing3 = Spacing<3>;

    #[test]
    fn test_spacing_uniform() {
        let s = Spacing3::uniform(1.5);
        assert_eq!(s, Spacing3::new([1.5, 1.5, 1.5]));
        assert!(s.is_uniform());
        assert!(!Spacing3::new([1.0, 2.0, 3.0]).is_uniform());
    }

    #[test]
    fn test_spacing_min_max() {
        let s = Spacing3::new([1.0, 2.0, 3.0]);
        assert_eq!(s.min_spacing(), 1.0);
        assert_eq!(s.max_spacing(), 3.0);
    }

    #[test]
    fn test_spacing_scaled_by() {
        let s = Spacing3::new([1.0, 0.5, 2.0]);
        assert_eq!(s.scaled_by(&[2, 4, 1]), Spacing3::new([2.0, 2.0, 2.0]));
    }
}
