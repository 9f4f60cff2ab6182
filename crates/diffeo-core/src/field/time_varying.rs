//! Velocity field sampled at a few discrete times.
//!
//! The time axis has origin 0, spacing 1 and identity direction, so a
//! normalised time `t` in `[0, 1]` sits at time index `t * (n - 1)`.

use crate::error::{FieldError, Result};
use crate::field::VectorField;
use crate::image::ImageGeometry;
use crate::interpolation::VectorLinearInterpolator;
use crate::spatial::{Point, Vector};

/// Stack of velocity fields on one spatial grid, one per time sample.
#[derive(Debug, Clone)]
pub struct TimeVaryingVelocityField<const D: usize> {
    slices: Vec<VectorField<D>>,
}

impl<const D: usize> TimeVaryingVelocityField<D> {
    /// Build from time slices that share one grid.
    pub fn from_slices(slices: Vec<VectorField<D>>) -> Result<Self> {
        let first = slices
            .first()
            .ok_or_else(|| FieldError::invalid_geometry("velocity field needs at least one time sample"))?;
        for slice in &slices[1..] {
            first.geometry().ensure_same_grid(slice.geometry(), "time slice")?;
        }
        Ok(Self { slices })
    }

    /// Two-sample field: slice 0 is the fixed half field, slice 1 the negated moving half field.
    pub fn from_half_fields(fixed_half: &VectorField<D>, moving_half: &VectorField<D>) -> Result<Self> {
        fixed_half.geometry().ensure_same_grid(moving_half.geometry(), "half fields")?;
        let mut backward = moving_half.deep_copy();
        backward.scale(-1.0);
        Ok(Self {
            slices: vec![fixed_half.deep_copy(), backward],
        })
    }

    /// Overwrite from half fields, reallocating only when the spatial grid changed.
    pub fn refresh_from_half_fields(
        &mut self,
        fixed_half: &VectorField<D>,
        moving_half: &VectorField<D>,
    ) -> Result<()> {
        if self.slices.len() != 2 || !self.geometry().same_grid(fixed_half.geometry()) {
            *self = Self::from_half_fields(fixed_half, moving_half)?;
            return Ok(());
        }
        fixed_half.geometry().ensure_same_grid(moving_half.geometry(), "half fields")?;
        self.slices[0].values_mut().copy_from_slice(fixed_half.values());
        for (dst, src) in self.slices[1].values_mut().iter_mut().zip(moving_half.values()) {
            *dst = -*src;
        }
        Ok(())
    }

    pub fn geometry(&self) -> &ImageGeometry<D> {
        self.slices[0].geometry()
    }

    pub fn num_time_points(&self) -> usize {
        self.slices.len()
    }

    pub fn slice(&self, time_index: usize) -> &VectorField<D> {
        &self.slices[time_index]
    }

    /// Time index of a normalised time in `[0, 1]`.
    pub fn time_index(&self, time: f64) -> f64 {
        time.clamp(0.0, 1.0) * (self.slices.len() - 1) as f64
    }

    /// Whether `(point, time_index)` lies inside the space-time buffer.
    pub fn is_inside_buffer(&self, point: &Point<D>, time_index: f64) -> bool {
        let upper = (self.slices.len() - 1) as f64;
        time_index >= 0.0 && time_index <= upper && self.geometry().contains_point(point)
    }

    /// Velocity at `(point, time_index)`, linear in space and time.
    pub fn evaluate(&self, point: &Point<D>, time_index: f64) -> Vector<D> {
        let upper = self.slices.len() - 1;
        let t = time_index.clamp(0.0, upper as f64);
        let lower = (t.floor() as usize).min(upper.saturating_sub(1));
        let frac = t - lower as f64;

        let index = self.geometry().physical_to_continuous_index(point);
        let v0 = VectorLinearInterpolator::new(&self.slices[lower]).evaluate_at_continuous_index(&index);
        if upper == 0 || frac == 0.0 {
            return v0;
        }
        let v1 = VectorLinearInterpolator::new(&self.slices[lower + 1]).evaluate_at_continuous_index(&index);
        v0 * (1.0 - frac) + v1 * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn half_fields() -> (VectorField<2>, VectorField<2>) {
        let geometry = ImageGeometry::from_size([6, 6]);
        let mut f = VectorField::zeros(geometry.clone());
        f.fill(Vector::new([1.0, 0.0]));
        let mut m = VectorField::zeros(geometry);
        m.fill(Vector::new([0.0, 2.0]));
        (f, m)
    }

    #[test]
    fn test_half_fields_layout() {
        let (f, m) = half_fields();
        let tv = TimeVaryingVelocityField::from_half_fields(&f, &m).unwrap();
        assert_eq!(tv.num_time_points(), 2);
        assert_eq!(tv.slice(0).get(&[2, 2]), Vector::new([1.0, 0.0]));
        assert_eq!(tv.slice(1).get(&[2, 2]), Vector::new([0.0, -2.0]));
    }

    #[test]
    fn test_time_interpolation() {
        let (f, m) = half_fields();
        let tv = TimeVaryingVelocityField::from_half_fields(&f, &m).unwrap();
        let p = Point::new([2.5, 3.0]);
        assert_eq!(tv.time_index(0.5), 0.5);
        let v = tv.evaluate(&p, tv.time_index(0.25));
        assert!((v[0] - 0.75).abs() < 1e-12);
        assert!((v[1] + 0.5).abs() < 1e-12);
        assert!(tv.is_inside_buffer(&p, 1.0));
        assert!(!tv.is_inside_buffer(&p, 1.5));
        assert!(!tv.is_inside_buffer(&Point::new([-1.0, 0.0]), 0.5));
    }

    #[test]
    fn test_refresh_reallocates_on_new_grid() {
        let (f, m) = half_fields();
        let mut tv = TimeVaryingVelocityField::from_half_fields(&f, &m).unwrap();

        let mut f2 = f.clone();
        f2.scale(3.0);
        tv.refresh_from_half_fields(&f2, &m).unwrap();
        assert_eq!(tv.slice(0).get(&[0, 0]), Vector::new([3.0, 0.0]));

        let small = VectorField::zeros(ImageGeometry::from_size([3, 3]));
        tv.refresh_from_half_fields(&small, &small).unwrap();
        assert_eq!(tv.geometry().size(), [3, 3]);
    }

    #[test]
    fn test_mismatched_slices_rejected() {
        let a = VectorField::<2>::zeros(ImageGeometry::from_size([3, 3]));
        let b = VectorField::<2>::zeros(ImageGeometry::from_size([3, 4]));
        assert!(TimeVaryingVelocityField::from_slices(vec![a, b]).is_err());
        assert!(TimeVaryingVelocityField::<2>::from_slices(vec![]).is_err());
    }
}
