//! Fixed-point inversion of displacement fields.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::field::{compose_fields, VectorField};

/// Stopping rule for [`invert_field_into`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InversionConfig {
    /// Maximum number of sweeps.
    pub max_iterations: usize,
    /// Stop once the largest residual (in voxels) drops below this.
    pub tolerance: f64,
    /// Stop once the mean residual (in voxels) drops below this.
    pub mean_tolerance: f64,
}

impl Default for InversionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 0.01,
            mean_tolerance: 1e-4,
        }
    }
}

impl InversionConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Outcome of an inversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InversionReport {
    /// Sweeps that updated the inverse.
    pub iterations: usize,
    /// Largest residual of the last evaluation, in voxels.
    pub max_residual: f64,
    /// Mean residual of the last evaluation, in voxels.
    pub mean_residual: f64,
}

/// Refine `inverse` so that `inverse(x) + field(x + inverse(x)) ≈ 0`.
///
/// The current content of `inverse` is the initial guess. Each sweep moves
/// every voxel against its residual, by 0.75 on the first sweep and 0.5 on
/// later ones, with the step capped at one voxel.
pub fn invert_field_into<const D: usize>(
    field: &VectorField<D>,
    inverse: &mut VectorField<D>,
    config: &InversionConfig,
) -> Result<InversionReport> {
    field.geometry().ensure_same_grid(inverse.geometry(), "invert")?;
    let spacing = *field.geometry().spacing();
    let n = field.len().max(1) as f64;

    let mut iterations = 0;
    loop {
        let residual = compose_fields(inverse, field, 1.0)?;
        let (max_residual, sum_residual) = residual
            .values()
            .par_iter()
            .map(|r| {
                let m = r.norm_in_voxels(&spacing);
                (m, m)
            })
            .reduce(|| (0.0, 0.0), |a, b| (a.0.max(b.0), a.1 + b.1));
        let mean_residual = sum_residual / n;

        if max_residual < config.tolerance
            || mean_residual < config.mean_tolerance
            || iterations >= config.max_iterations
        {
            tracing::debug!(iterations, max_residual, mean_residual, "field inversion finished");
            return Ok(InversionReport {
                iterations,
                max_residual,
                mean_residual,
            });
        }

        let epsilon = if iterations == 0 { 0.75 } else { 0.5 };
        inverse
            .values_mut()
            .par_iter_mut()
            .zip(residual.values().par_iter())
            .for_each(|(inv, r)| {
                let magnitude = r.norm_in_voxels(&spacing);
                let step = if magnitude > 1.0 { *r / magnitude } else { *r };
                *inv -= step * epsilon;
            });
        iterations += 1;
    }
}

/// Inverse of `field` starting from the zero map.
pub fn invert_field<const D: usize>(
    field: &VectorField<D>,
    config: &InversionConfig,
) -> Result<VectorField<D>> {
    let mut inverse = VectorField::zeros_like(field);
    invert_field_into(field, &mut inverse, config)?;
    Ok(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ImageGeometry;
    use crate::spatial::Vector;

    #[test]
    fn test_zero_field_inverts_immediately() {
        let field = VectorField::<2>::zeros(ImageGeometry::from_size([8, 8]));
        let mut inverse = VectorField::zeros_like(&field);
        let report = invert_field_into(&field, &mut inverse, &InversionConfig::default()).unwrap();
        assert_eq!(report.iterations, 0);
        assert!(inverse.is_zero());
    }

    #[test]
    fn test_translation_inverse() {
        let mut field = VectorField::zeros(ImageGeometry::<2>::from_size([16, 16]));
        field.fill(Vector::new([0.5, -0.25]));
        let inverse = invert_field(&field, &InversionConfig::default()).unwrap();
        let v = inverse.get(&[8, 8]);
        assert!((v[0] + 0.5).abs() < 0.02, "got {:?}", v);
        assert!((v[1] - 0.25).abs() < 0.02, "got {:?}", v);
    }

    #[test]
    fn test_iteration_budget_respected() {
        let mut field = VectorField::zeros(ImageGeometry::<2>::from_size([16, 16]));
        field.fill(Vector::new([0.5, 0.0]));
        let config = InversionConfig::default().with_max_iterations(2).with_tolerance(0.0);
        let mut inverse = VectorField::zeros_like(&field);
        let report = invert_field_into(&field, &mut inverse, &config).unwrap();
        assert_eq!(report.iterations, 2);
    }
}
