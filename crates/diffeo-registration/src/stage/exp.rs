//! Stationary velocity model.

use burn::tensor::backend::Backend;
use diffeo_core::field::integrate_constant_velocity;
use diffeo_core::filter::smooth_field;
use crate::config::RegistrationConfig;
use crate::error::Result;
use crate::state::OptimizerState;
use crate::update::{UpdateFieldBuilder, UpdateRequest};
use super::{carry_moving_points, Landmarks, TotalFields};

/// One iteration on the stationary velocity held in `state.deformation`.
///
/// The moving images are warped by the exponential of the velocity, the
/// update is taken in the fixed frame and added to the velocity with step
/// `gradient_step / n_time_steps`.
pub fn update<B: Backend, const D: usize>(
    state: &mut OptimizerState<D>,
    builder: &mut UpdateFieldBuilder<'_, B, D>,
    config: &RegistrationConfig,
    gradient_step: f64,
    landmarks: Landmarks<'_, D>,
) -> Result<Option<f64>> {
    let steps = config.n_time_steps;
    let forward_map = integrate_constant_velocity(&state.deformation, steps, 1.0)?;

    let moving_points = match landmarks.moving {
        Some(points) => {
            let inverse_map = integrate_constant_velocity(&state.deformation, steps, -1.0)?;
            Some(carry_moving_points(builder, points, Some(&inverse_map))?)
        }
        None => None,
    };

    let update = builder.compute(&UpdateRequest {
        fixed_warp: Some(&forward_map),
        moving_warp: None,
        fixed_points: landmarks.fixed,
        moving_points: moving_points.as_ref(),
        want_inverse: false,
        update_energy: true,
    })?;

    state
        .deformation
        .add_scaled(&update.forward, gradient_step / steps as f64)?;
    smooth_field(&mut state.deformation, &config.total_smoothing)?;
    Ok(state.record_energies(&update.energies))
}

pub fn total_fields<const D: usize>(state: &OptimizerState<D>, config: &RegistrationConfig) -> Result<TotalFields<D>> {
    Ok(TotalFields {
        forward: integrate_constant_velocity(&state.deformation, config.n_time_steps, 1.0)?,
        inverse: integrate_constant_velocity(&state.deformation, config.n_time_steps, -1.0)?,
    })
}
