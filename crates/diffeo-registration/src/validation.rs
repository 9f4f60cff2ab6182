//! Input validation and convergence monitoring.

use burn::tensor::backend::Backend;
use diffeo_core::image::{Image, ImageGeometry};

use crate::error::{RegistrationError, Result};

/// Check that a grid is usable for registration.
pub fn validate_geometry<const D: usize>(geometry: &ImageGeometry<D>, name: &str) -> Result<()> {
    if geometry.size().iter().any(|&s| s == 0) {
        return Err(RegistrationError::image_validation(format!(
            "{} image has an empty axis: {:?}",
            name,
            geometry.size()
        )));
    }
    if geometry
        .spacing()
        .to_array()
        .iter()
        .any(|&s| !(s.is_finite() && s > 0.0)) {
        return Err(RegistrationError::image_validation(format!(
            "{} image spacing must be positive",
            name
        )));
    }
    Ok(())
}

/// Validate a fixed/moving pair.
///
/// Grids may differ; warping resamples the moving image onto the working domain.
pub fn validate_image_pair<B: Backend, const D: usize>(
    fixed: &Image<B, D>,
    moving: &Image<B, D>,
) -> Result<()> {
    validate_geometry(fixed.geometry(), "fixed")?;
    validate_geometry(moving.geometry(), "moving")
}

/// Validate the step taken along each normalized update.
pub fn validate_gradient_step(step: f64) -> Result<()> {
    if !step.is_finite() || step <= 0.0 {
        return Err(RegistrationError::invalid_configuration(format!(
            "Gradient step must be positive, got {}",
            step
        )));
    }
    Ok(())
}

/// Validate an iteration schedule. A zero entry skips its level.
pub fn validate_iterations(iterations: &[usize]) -> Result<()> {
    if iterations.is_empty() {
        return Err(RegistrationError::invalid_configuration(
            "Iteration schedule must name at least one level",
        ));
    }
    if let Some(&too_many) = iterations.iter().find(|&&n| n > 1_000_000) {
        return Err(RegistrationError::invalid_configuration(format!(
            "Iterations too large: {}",
            too_many
        )));
    }
    Ok(())
}

/// Windowed convergence test on an energy history.
#[derive(Debug, Clone)]
pub struct ConvergenceChecker {
    /// Minimum relative improvement across the window.
    pub min_improvement: f64,
    /// Number of iterations in the window.
    pub patience: usize,
    /// Stop once the energy drops below this value.
    pub min_energy: Option<f64>,
}

impl Default for ConvergenceChecker {
    fn default() -> Self {
        Self {
            min_improvement: 1e-6,
            patience: 10,
            min_energy: None,
        }
    }
}

impl ConvergenceChecker {
    pub fn new(min_improvement: f64, patience: usize) -> Self {
        Self {
            min_improvement,
            patience: patience.max(1),
            min_energy: None,
        }
    }

    pub fn with_min_energy(mut self, min_energy: f64) -> Self {
        self.min_energy = Some(min_energy);
        self
    }

    /// True when the last `patience` iterations improved the energy that
    /// preceded them by less than `min_improvement` (relative).
    pub fn check_convergence(&self, history: &[f64]) -> bool {
        let Some(&current) = history.last() else {
            return false;
        };

        if let Some(min_energy) = self.min_energy {
            if current < min_energy {
                return true;
            }
        }

        if history.len() < self.patience + 1 {
            return false;
        }

        let window = &history[history.len() - self.patience - 1..];
        let reference = window[0];
        let best = window[1..].iter().cloned().fold(f64::INFINITY, f64::min);
        let relative_improvement = (reference - best) / (reference.abs() + 1e-10);

        relative_improvement < self.min_improvement
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_gradient_step() {
        assert!(validate_gradient_step(0.25).is_ok());
        assert!(validate_gradient_step(2.0).is_ok());
        assert!(validate_gradient_step(0.0).is_err());
        assert!(validate_gradient_step(-0.1).is_err());
        assert!(validate_gradient_step(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_iterations() {
        assert!(validate_iterations(&[100, 50, 0]).is_ok());
        assert!(validate_iterations(&[]).is_err());
        assert!(validate_iterations(&[2_000_000]).is_err());
    }

    #[test]
    fn test_validate_geometry() {
        assert!(validate_geometry(&ImageGeometry::<2>::from_size([4, 4]), "fixed").is_ok());
        assert!(validate_geometry(&ImageGeometry::<2>::from_size([4, 0]), "fixed").is_err());
    }

    #[test]
    fn test_convergence_on_plateau() {
        let checker = ConvergenceChecker::new(1e-3, 3);
        assert!(!checker.check_convergence(&[]));
        assert!(!checker.check_convergence(&[1.0, 0.9]));

        let decreasing = [1.0, 0.8, 0.6, 0.4, 0.2];
        assert!(!checker.check_convergence(&decreasing));

        let plateau = [1.0, 0.5, 0.5, 0.5, 0.5];
        assert!(checker.check_convergence(&plateau));
    }

    #[test]
    fn test_convergence_negative_energies() {
        let checker = ConvergenceChecker::new(1e-3, 2);
        assert!(!checker.check_convergence(&[-0.5, -0.6, -0.7]));
        assert!(checker.check_convergence(&[-0.9, -0.9, -0.9]));
    }

    #[test]
    fn test_convergence_min_energy() {
        let checker = ConvergenceChecker::new(1e-6, 50).with_min_energy(0.01);
        assert!(checker.check_convergence(&[1.0, 0.005]));
    }
}
