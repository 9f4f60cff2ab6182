//! Field regularisation settings and dispatch.

use serde::{Deserialize, Serialize};
use super::field_bspline::smooth_field_bspline;
use super::field_gaussian::smooth_field_gaussian;
use super::kernel::{DEFAULT_MAX_ERROR, DEFAULT_MAX_KERNEL_WIDTH};
use crate::error::{FieldError, Result};
use crate::field::VectorField;

/// How a vector field is regularised.
///
/// A non-empty mesh whose first entry is positive selects B-spline
/// smoothing; otherwise the Gaussian variance is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    /// Gaussian variance in voxels.
    pub gaussian_variance: f64,
    /// B-spline mesh size per axis. A single entry applies to every axis.
    pub bspline_mesh: Vec<usize>,
    pub spline_order: usize,
    pub spline_levels: usize,
    pub max_kernel_width: usize,
    pub max_error: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            gaussian_variance: 0.0,
            bspline_mesh: Vec::new(),
            spline_order: 3,
            spline_levels: 1,
            max_kernel_width: DEFAULT_MAX_KERNEL_WIDTH,
            max_error: DEFAULT_MAX_ERROR,
        }
    }
}

impl SmoothingConfig {
    /// Gaussian smoothing with the given variance.
    pub fn gaussian(variance: f64) -> Self {
        Self {
            gaussian_variance: variance,
            ..Self::default()
        }
    }

    /// B-spline smoothing over the given mesh.
    pub fn bspline(mesh: Vec<usize>) -> Self {
        Self {
            bspline_mesh: mesh,
            ..Self::default()
        }
    }

    pub fn with_spline_order(mut self, order: usize) -> Self {
        self.spline_order = order;
        self
    }

    pub fn with_spline_levels(mut self, levels: usize) -> Self {
        self.spline_levels = levels;
        self
    }

    pub fn with_max_kernel_width(mut self, width: usize) -> Self {
        self.max_kernel_width = width;
        self
    }

    pub fn is_bspline(&self) -> bool {
        self.bspline_mesh.first().is_some_and(|&m| m > 0)
    }

    /// True if applying this configuration changes anything.
    pub fn is_active(&self) -> bool {
        self.is_bspline() || self.gaussian_variance > 0.0
    }

    /// Mesh expanded to `D` axes.
    pub fn mesh<const D: usize>(&self) -> Result<[usize; D]> {
        match self.bspline_mesh.len() {
            1 => Ok([self.bspline_mesh[0]; D]),
            n if n == D => Ok(std::array::from_fn(|i| self.bspline_mesh[i])),
            n => Err(FieldError::invalid_geometry(format!(
                "B-spline mesh has {n} entries for a {D}-dimensional field"
            ))),
        }
    }
}

/// Regularise `field` in place according to `config`.
pub fn smooth_field<const D: usize>(field: &mut VectorField<D>, config: &SmoothingConfig) -> Result<()> {
    if config.is_bspline() {
        let mesh = config.mesh::<D>()?;
        smooth_field_bspline(field, &mesh, config.spline_order, config.spline_levels);
    } else {
        smooth_field_gaussian(field, config.gaussian_variance, config.max_error, config.max_kernel_width);
    }
    Ok(())
}
