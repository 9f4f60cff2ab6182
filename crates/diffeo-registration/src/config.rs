//! Registration configuration.
//!
//! Everything here derives `serde` so a run can be described in JSON and
//! validated before any image is touched.

use serde::{Deserialize, Serialize};
use diffeo_core::field::InversionConfig;
use diffeo_core::filter::SmoothingConfig;
use crate::error::{RegistrationError, Result};
use crate::validation::{validate_gradient_step, validate_iterations};

/// How the running transformation is parameterised and updated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransformationModel {
    /// One stationary velocity field, exponentiated by repeated composition.
    Exp { gradient_step: f64 },
    /// Symmetric normalisation with static half displacement fields.
    SyN { gradient_step: f64 },
    /// Symmetric normalisation with stationary half velocity fields.
    SyNExp { gradient_step: f64 },
    /// Symmetric normalisation over a two-sample time-varying velocity field.
    SyNTV { gradient_step: f64 },
}

impl TransformationModel {
    pub fn gradient_step(&self) -> f64 {
        match *self {
            Self::Exp { gradient_step }
            | Self::SyN { gradient_step }
            | Self::SyNExp { gradient_step }
            | Self::SyNTV { gradient_step } => gradient_step,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Exp { .. } => "Exp",
            Self::SyN { .. } => "SyN",
            Self::SyNExp { .. } => "SyNExp",
            Self::SyNTV { .. } => "SyNTV",
        }
    }

    /// Whether the model keeps fixed and moving half fields.
    pub fn is_symmetric(&self) -> bool {
        !matches!(self, Self::Exp { .. })
    }
}

impl Default for TransformationModel {
    fn default() -> Self {
        Self::SyN { gradient_step: 0.25 }
    }
}

/// RK4 settings for time-varying velocity integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegrationConfig {
    /// Step in normalised time.
    pub delta_time: f64,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self { delta_time: 0.1 }
    }
}

impl IntegrationConfig {
    pub fn with_delta_time(mut self, delta_time: f64) -> Self {
        self.delta_time = delta_time;
        self
    }

    /// Upper bound on RK4 steps for a single point.
    pub fn max_steps(&self) -> usize {
        (1.0 / self.delta_time).ceil() as usize * 4
    }
}

/// Full description of a registration run.
///
/// The per-level vectors (`iterations`, `shrink_factors`, `image_sigmas`) are
/// ordered coarse to fine and must have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationConfig {
    pub model: TransformationModel,
    /// Composition steps of the constant-velocity exponential.
    pub n_time_steps: usize,
    /// Regularisation of each iteration's update field.
    pub update_smoothing: SmoothingConfig,
    /// Regularisation of the accumulated fields.
    pub total_smoothing: SmoothingConfig,
    /// Iteration budget per level.
    pub iterations: Vec<usize>,
    /// Isotropic shrink factor per level.
    pub shrink_factors: Vec<usize>,
    /// Physical Gaussian sigma applied to the images per level.
    pub image_sigmas: Vec<f64>,
    /// Number of energies the convergence test looks back over.
    pub convergence_window: usize,
    /// Minimum relative energy improvement over the window.
    pub convergence_threshold: f64,
    /// Update with one metric per iteration, round robin.
    pub alternating_min: bool,
    /// Nearest-neighbour instead of linear image warping.
    pub use_nearest_neighbor: bool,
    /// Factor applied to displacements when warping.
    pub scale_factor: f64,
    pub inversion: InversionConfig,
    pub integration: IntegrationConfig,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            model: TransformationModel::default(),
            n_time_steps: 1,
            update_smoothing: SmoothingConfig::gaussian(3.0),
            total_smoothing: SmoothingConfig::gaussian(0.0),
            iterations: vec![100, 100, 50],
            shrink_factors: vec![4, 2, 1],
            image_sigmas: vec![2.0, 1.0, 0.0],
            convergence_window: 10,
            convergence_threshold: 1e-6,
            alternating_min: false,
            use_nearest_neighbor: false,
            scale_factor: 1.0,
            inversion: InversionConfig::default(),
            integration: IntegrationConfig::default(),
        }
    }
}

impl RegistrationConfig {
    pub fn new(model: TransformationModel) -> Self {
        Self {
            model,
            ..Self::default()
        }
    }

    /// Single full-resolution level with `iterations` iterations.
    pub fn with_single_level(mut self, iterations: usize) -> Self {
        self.iterations = vec![iterations];
        self.shrink_factors = vec![1];
        self.image_sigmas = vec![0.0];
        self
    }

    /// Replace the multi-resolution schedule.
    pub fn with_schedule(mut self, iterations: Vec<usize>, shrink_factors: Vec<usize>, image_sigmas: Vec<f64>) -> Self {
        self.iterations = iterations;
        self.shrink_factors = shrink_factors;
        self.image_sigmas = image_sigmas;
        self
    }

    pub fn with_update_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.update_smoothing = smoothing;
        self
    }

    pub fn with_total_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.total_smoothing = smoothing;
        self
    }

    pub fn with_n_time_steps(mut self, n_time_steps: usize) -> Self {
        self.n_time_steps = n_time_steps;
        self
    }

    pub fn with_convergence(mut self, window: usize, threshold: f64) -> Self {
        self.convergence_window = window;
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_alternating_min(mut self, alternating: bool) -> Self {
        self.alternating_min = alternating;
        self
    }

    pub fn with_nearest_neighbor(mut self, nearest: bool) -> Self {
        self.use_nearest_neighbor = nearest;
        self
    }

    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    pub fn with_inversion(mut self, inversion: InversionConfig) -> Self {
        self.inversion = inversion;
        self
    }

    pub fn with_integration(mut self, integration: IntegrationConfig) -> Self {
        self.integration = integration;
        self
    }

    pub fn num_levels(&self) -> usize {
        self.iterations.len()
    }

    /// Per-axis shrink factors of `level`.
    pub fn shrink_factors_for<const D: usize>(&self, level: usize) -> [usize; D] {
        [self.shrink_factors[level]; D]
    }

    /// Per-axis image sigmas of `level`.
    pub fn image_sigmas_for<const D: usize>(&self, level: usize) -> Vec<f64> {
        vec![self.image_sigmas[level]; D]
    }

    /// Reject settings no run can use.
    pub fn validate(&self) -> Result<()> {
        validate_iterations(&self.iterations)?;
        let levels = self.iterations.len();
        if self.shrink_factors.len() != levels || self.image_sigmas.len() != levels {
            return Err(RegistrationError::invalid_configuration(format!(
                "schedule lengths differ: {} iteration counts, {} shrink factors, {} sigmas",
                levels,
                self.shrink_factors.len(),
                self.image_sigmas.len()
            )));
        }
        if self.shrink_factors.iter().any(|&f| f == 0) {
            return Err(RegistrationError::invalid_configuration(
                "shrink factors must be at least 1",
            ));
        }
        if self.image_sigmas.iter().any(|s| !s.is_finite() || *s < 0.0) {
            return Err(RegistrationError::invalid_configuration(
                "image sigmas must be finite and non-negative",
            ));
        }

        validate_gradient_step(self.model.gradient_step())?;
        if self.n_time_steps == 0 {
            return Err(RegistrationError::invalid_configuration(
                "number of time steps must be positive",
            ));
        }
        if !(self.scale_factor > 0.0) {
            return Err(RegistrationError::invalid_configuration(format!(
                "scale factor must be positive, got {}",
                self.scale_factor
            )));
        }
        if self.convergence_window == 0 {
            return Err(RegistrationError::invalid_configuration(
                "convergence window must be positive",
            ));
        }
        let dt = self.integration.delta_time;
        if !(dt > 0.0 && dt <= 1.0) {
            return Err(RegistrationError::invalid_configuration(format!(
                "integration delta time must lie in (0, 1], got {}",
                dt
            )));
        }
        for (name, smoothing) in [("update", &self.update_smoothing), ("total", &self.total_smoothing)] {
            if !(smoothing.gaussian_variance >= 0.0) {
                return Err(RegistrationError::invalid_configuration(format!(
                    "{} smoothing variance must be non-negative",
                    name
                )));
            }
        }
        if self.inversion.max_iterations == 0 {
            return Err(RegistrationError::invalid_configuration(
                "field inversion needs at least one sweep",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RegistrationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_levels(), 3);
        assert_eq!(config.model.name(), "SyN");
    }

    #[test]
    fn test_invalid_gradient_step() {
        let config = RegistrationConfig::new(TransformationModel::SyN { gradient_step: 0.0 });
        assert!(matches!(
            config.validate(),
            Err(RegistrationError::InvalidConfiguration(msg)) if msg.contains("Gradient step")
        ));
        let config = RegistrationConfig::new(TransformationModel::Exp { gradient_step: f64::NAN });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_mismatched_schedule() {
        let config = RegistrationConfig::default().with_schedule(vec![10, 10], vec![2, 1], vec![1.0]);
        assert!(config.validate().is_err());

        let config = RegistrationConfig::default().with_schedule(vec![], vec![], vec![]);
        assert!(config.validate().is_err());

        let config = RegistrationConfig::default().with_single_level(2_000_000);
        assert!(matches!(
            config.validate(),
            Err(RegistrationError::InvalidConfiguration(msg)) if msg.contains("Iterations too large")
        ));
    }

    #[test]
    fn test_zero_time_steps_rejected() {
        let config = RegistrationConfig::default().with_n_time_steps(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_single_level() {
        let config = RegistrationConfig::default().with_single_level(25);
        assert_eq!(config.iterations, vec![25]);
        assert_eq!(config.shrink_factors_for::<3>(0), [1, 1, 1]);
        assert_eq!(config.image_sigmas_for::<2>(0), vec![0.0, 0.0]);
    }

    #[test]
    fn test_max_steps_guard() {
        assert_eq!(IntegrationConfig::default().max_steps(), 40);
        assert_eq!(IntegrationConfig::default().with_delta_time(0.3).max_steps(), 16);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = RegistrationConfig::new(TransformationModel::SyNTV { gradient_step: 0.5 })
            .with_alternating_min(true);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"type\":\"SyNTV\""));
        let back: RegistrationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
