//! Multi-resolution driver for the diffeomorphic models.
//!
//! [`SymmetricOptimizer`] walks the configured resolution schedule coarse to
//! fine, dispatching each iteration to the stage driver of the configured
//! [`TransformationModel`](crate::config::TransformationModel).
//!
//! ```rust,ignore
//! let config = RegistrationConfig::new(TransformationModel::SyN { gradient_step: 0.25 })
//!     .with_single_level(40);
//! let metric = MetricDescriptor::new(Box::new(MeanSquaresMetric::new()), fixed, moving);
//! let result = SymmetricOptimizer::new(config, vec![metric])?.run()?;
//! ```

pub mod result;

pub use result::RegistrationResult;

use std::sync::Arc;
use std::time::Duration;

use burn::tensor::backend::Backend;
use diffeo_core::image::Image;
use diffeo_core::transform::AffineTransform;

use crate::affine::AffineOptimizer;
use crate::config::RegistrationConfig;
use crate::error::{RegistrationError, Result};
use crate::metric::MetricDescriptor;
use crate::point_set::PointSet;
use crate::progress::{ProgressCallback, ProgressInfo, ProgressTracker};
use crate::stage::{self, Landmarks};
use crate::state::OptimizerState;
use crate::update::UpdateFieldBuilder;
use crate::validation::{validate_image_pair, ConvergenceChecker};
use crate::warp::WarpMultiTransform;

/// Deformable registration of one or more fixed/moving pairs.
pub struct SymmetricOptimizer<B: Backend, const D: usize> {
    config: RegistrationConfig,
    metrics: Vec<MetricDescriptor<B, D>>,
    mask: Option<Image<B, D>>,
    affine: Option<AffineTransform<D>>,
    affine_optimizer: Option<Box<dyn AffineOptimizer<B, D>>>,
    tracker: ProgressTracker,
    state: OptimizerState<D>,
}

impl<B: Backend, const D: usize> SymmetricOptimizer<B, D> {
    /// The first metric's fixed image defines the physical domain.
    pub fn new(config: RegistrationConfig, metrics: Vec<MetricDescriptor<B, D>>) -> Result<Self> {
        config.validate()?;
        let Some(first) = metrics.first() else {
            return Err(RegistrationError::invalid_configuration(
                "at least one similarity metric is required",
            ));
        };
        for descriptor in &metrics {
            validate_image_pair(&descriptor.fixed, &descriptor.moving)?;
        }
        let state = OptimizerState::new(first.fixed.geometry().clone(), metrics.len());
        Ok(Self {
            config,
            metrics,
            mask: None,
            affine: None,
            affine_optimizer: None,
            tracker: ProgressTracker::new(),
            state,
        })
    }

    /// Probability mask in the fixed frame.
    pub fn with_mask(mut self, mask: Image<B, D>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Pre-computed affine (fixed → moving physical map).
    pub fn with_affine(mut self, affine: AffineTransform<D>) -> Self {
        self.affine = Some(affine);
        self
    }

    /// Collaborator run before the deformable stage when no affine is given.
    pub fn with_affine_optimizer(mut self, optimizer: Box<dyn AffineOptimizer<B, D>>) -> Self {
        self.affine_optimizer = Some(optimizer);
        self
    }

    pub fn add_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.tracker.add_callback(callback);
        self
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    pub fn state(&self) -> &OptimizerState<D> {
        &self.state
    }

    /// Run the whole schedule and return the total maps.
    pub fn run(&mut self) -> Result<RegistrationResult<D>> {
        self.tracker.start();
        match self.run_schedule() {
            Ok(result) => {
                let final_energy = self.state.level_history.last().copied().unwrap_or(0.0);
                self.tracker
                    .complete(self.config.num_levels().saturating_sub(1), final_energy);
                Ok(result)
            }
            Err(e) => {
                self.tracker.error(&e.to_string());
                Err(e)
            }
        }
    }

    fn initial_affine(&self) -> Result<Option<AffineTransform<D>>> {
        if let Some(affine) = self.affine {
            return Ok(Some(affine));
        }
        match &self.affine_optimizer {
            Some(optimizer) => {
                let first = &self.metrics[0];
                let affine = optimizer.optimize(&first.fixed, &first.moving, self.mask.as_ref())?;
                tracing::info!("Affine stage done: {:?}", affine.matrix());
                Ok(Some(affine))
            }
            None => Ok(None),
        }
    }

    /// Landmarks of the first descriptor that carries any.
    fn landmarks(&self) -> (Option<PointSet<D>>, Option<PointSet<D>>) {
        self.metrics
            .iter()
            .find(|m| m.fixed_points.is_some() || m.moving_points.is_some())
            .map(|m| (m.fixed_points.clone(), m.moving_points.clone()))
            .unwrap_or((None, None))
    }

    fn run_schedule(&mut self) -> Result<RegistrationResult<D>> {
        let affine = self.initial_affine()?;
        self.state.affine = affine;

        let (fixed_points, moving_points) = self.landmarks();
        let landmarks = Landmarks {
            fixed: fixed_points.as_ref(),
            moving: moving_points.as_ref(),
        };

        let reference = self.metrics[0].fixed.geometry().clone();
        let warper = WarpMultiTransform::new(self.config.use_nearest_neighbor, self.config.scale_factor);
        let gradient_step = self.config.model.gradient_step();
        let num_levels = self.config.num_levels();
        let mut iterations_per_level = Vec::with_capacity(num_levels);

        tracing::info!(
            "Deformable registration: model={}, levels={}, metrics={}",
            self.config.model.name(),
            num_levels,
            self.metrics.len()
        );

        for level in 0..num_levels {
            let budget = self.config.iterations[level];
            if budget == 0 {
                iterations_per_level.push(0);
                continue;
            }

            let factors = self.config.shrink_factors_for::<D>(level);
            let domain = reference.shrink(&factors)?;
            let sigmas = self.config.image_sigmas_for::<D>(level);
            for descriptor in &mut self.metrics {
                descriptor.prepare_level(&factors, &sigmas)?;
            }
            self.state.set_domain(domain.clone());
            self.tracker.start_level(level, &domain.size());
            tracing::info!(
                "Starting level {}/{}: shrink={:?}, sigmas={:?}, iters={}",
                level + 1,
                num_levels,
                factors,
                sigmas,
                budget
            );

            let checker = ConvergenceChecker::new(self.config.convergence_threshold, self.config.convergence_window);
            let mut done = 0;
            for iteration in 0..budget {
                let mut builder =
                    UpdateFieldBuilder::new(&mut self.metrics, &domain, &self.config.update_smoothing)
                        .with_mask(self.mask.as_ref())
                        .with_affine(affine)
                        .with_warper(warper);
                if self.config.alternating_min {
                    builder = builder.alternating(self.state.iteration);
                }

                let energy = stage::run_iteration(&mut self.state, &mut builder, &self.config, landmarks)?;
                self.state.iteration += 1;
                done += 1;

                let mut info = ProgressInfo::new(
                    level,
                    iteration + 1,
                    budget,
                    energy.unwrap_or(f64::NAN),
                    Duration::ZERO,
                );
                info.gradient_step = gradient_step;
                for (descriptor, energy) in self.metrics.iter().zip(&self.state.energies) {
                    info.add_metric(descriptor.name(), energy.current);
                }
                self.tracker.update(info);

                if checker.check_convergence(&self.state.level_history) {
                    tracing::info!("Level {} converged after {} iterations", level + 1, done);
                    break;
                }
            }
            iterations_per_level.push(done);
        }

        let totals = stage::total_fields(&mut self.state, &self.config)?;
        Ok(RegistrationResult {
            affine: self.state.affine,
            forward: totals.forward,
            inverse: totals.inverse,
            energies: self.state.energies.clone(),
            iterations_per_level,
        })
    }
}

impl<B: Backend, const D: usize> std::fmt::Debug for SymmetricOptimizer<B, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricOptimizer")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .field("has_mask", &self.mask.is_some())
            .field("affine", &self.affine)
            .field("iteration", &self.state.iteration)
            .finish()
    }
}
