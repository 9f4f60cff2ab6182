//! D-linear interpolation of vector fields on the host.

use crate::field::VectorField;
use crate::spatial::{Point, Vector};

/// Visit the `2^D` corners surrounding a continuous index with their weights.
///
/// The index is clamped into the buffer first, so the weights always sum to one.
pub(crate) fn for_each_corner<const D: usize>(
    size: &[usize; D],
    index: &[f64; D],
    mut visit: impl FnMut(&[usize; D], f64),
) {
    let mut base = [0usize; D];
    let mut frac = [0f64; D];
    for i in 0..D {
        let upper = size[i].saturating_sub(1) as f64;
        let c = index[i].clamp(0.0, upper);
        let f = c.floor().min(upper - 1.0).max(0.0);
        base[i] = f as usize;
        frac[i] = if size[i] > 1 { c - f } else { 0.0 };
    }

    for corner in 0..(1usize << D) {
        let mut weight = 1.0;
        let mut neighbor = base;
        for i in 0..D {
            if corner & (1 << i) != 0 {
                weight *= frac[i];
                neighbor[i] = (base[i] + 1).min(size[i] - 1);
            } else {
                weight *= 1.0 - frac[i];
            }
        }
        if weight != 0.0 {
            visit(&neighbor, weight);
        }
    }
}

/// Linear interpolator over a borrowed vector field.
///
/// Samples outside the buffer are reported through `is_inside_buffer`;
/// `sample` turns them into zero displacement.
pub struct VectorLinearInterpolator<'a, const D: usize> {
    field: &'a VectorField<D>,
}

impl<'a, const D: usize> VectorLinearInterpolator<'a, D> {
    pub fn new(field: &'a VectorField<D>) -> Self {
        Self { field }
    }

    /// Whether a physical point lies inside the field's buffer.
    pub fn is_inside_buffer(&self, point: &Point<D>) -> bool {
        self.field.geometry().contains_point(point)
    }

    /// Interpolated vector at a physical point (clamped to the buffer).
    pub fn evaluate(&self, point: &Point<D>) -> Vector<D> {
        let index = self.field.geometry().physical_to_continuous_index(point);
        self.evaluate_at_continuous_index(&index)
    }

    /// Interpolated vector at a continuous index (clamped to the buffer).
    pub fn evaluate_at_continuous_index(&self, index: &[f64; D]) -> Vector<D> {
        let size = self.field.geometry().size();
        let mut value = Vector::zeros();
        for_each_corner(&size, index, |neighbor, weight| {
            value += self.field.get(neighbor) * weight;
        });
        value
    }

    /// Interpolated vector, or zero when the point is outside the buffer.
    pub fn sample(&self, point: &Point<D>) -> Vector<D> {
        let index = self.field.geometry().physical_to_continuous_index(point);
        if self.field.geometry().is_inside_buffer(&index) {
            self.evaluate_at_continuous_index(&index)
        } else {
            Vector::zeros()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageGeometry;
    use crate::spatial::{Direction, Spacing};

    fn linear_field() -> VectorField<2> {
        let geometry = ImageGeometry::new(
            [5, 4],
            Point::new([1.0, -1.0]),
            Spacing::new([0.5, 2.0]),
            Direction::identity(),
        )
        .unwrap();
        VectorField::from_fn(geometry, |p| Vector::new([p[0] + p[1], 2.0 * p[1]]))
    }

    #[test]
    fn test_linear_field_is_reproduced() {
        let field = linear_field();
        let interpolator = VectorLinearInterpolator::new(&field);
        let p = Point::new([1.7, 2.3]);
        assert!(interpolator.is_inside_buffer(&p));
        let v = interpolator.evaluate(&p);
        assert!((v[0] - 4.0).abs() < 1e-9);
        assert!((v[1] - 4.6).abs() < 1e-9);
    }

    #[test]
    fn test_outside_buffer_samples_zero() {
        let field = linear_field();
        let interpolator = VectorLinearInterpolator::new(&field);
        let outside = Point::new([0.0, 0.0]);
        assert!(!interpolator.is_inside_buffer(&outside));
        assert_eq!(interpolator.sample(&outside), Vector::zeros());
        assert!(!interpolator.evaluate(&outside).is_zero());
    }
}
