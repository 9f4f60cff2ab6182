//! Symmetric model over a two-sample time-varying velocity field.

use burn::tensor::backend::Backend;
use diffeo_core::field::{TimeVaryingVelocityField, VectorField};
use diffeo_core::filter::smooth_field;
use crate::config::RegistrationConfig;
use crate::error::{RegistrationError, Result};
use crate::integrate::VelocityIntegrator;
use crate::state::OptimizerState;
use crate::update::{UpdateFieldBuilder, UpdateFields, UpdateRequest};
use super::syn_exp::add_and_blend;
use super::{carry_moving_points, Landmarks, TotalFields};

/// Weight kept by each half velocity in the geodesic blend.
const GEODESIC_WEIGHT: f64 = 0.95;

/// Normalised time of the midpoint frame.
const MIDPOINT: f64 = 0.5;

/// One iteration on the half velocities, integrated with RK4.
///
/// Slice 0 of the time-varying field is the fixed half velocity and slice 1
/// the negated moving half velocity. The midpoint sits at `t = 0.5`: the
/// fixed half inverse integrates from there back to 0, the moving half
/// inverse forward to 1. Landmarks are integrated toward the midpoint from
/// their own ends of the time axis.
pub fn update<B: Backend, const D: usize>(
    state: &mut OptimizerState<D>,
    builder: &mut UpdateFieldBuilder<'_, B, D>,
    config: &RegistrationConfig,
    gradient_step: f64,
    landmarks: Landmarks<'_, D>,
) -> Result<Option<f64>> {
    state.symmetric_fields();
    state.refresh_velocity()?;
    let velocity = velocity_of(&state.velocity)?;
    let integrator = VelocityIntegrator::new(velocity, config.integration);

    let fixed_inverse = integrator.integrate_field(MIDPOINT, 0.0);
    let moving_inverse = integrator.integrate_field(MIDPOINT, 1.0);

    let moving_points = match landmarks.moving {
        Some(points) => {
            let affine_only = carry_moving_points(builder, points, None)?;
            let to_midpoint = integrator.integrate_landmarks(1.0, MIDPOINT, &affine_only);
            Some(builder.warper().warp_points(&affine_only, None, Some(&to_midpoint)))
        }
        None => None,
    };
    let fixed_points = landmarks.fixed.map(|points| {
        let to_midpoint = integrator.integrate_landmarks(0.0, MIDPOINT, points);
        builder.warper().warp_points(points, None, Some(&to_midpoint))
    });

    let fields = state
        .symmetric
        .as_mut()
        .ok_or_else(|| RegistrationError::transform("half fields were not allocated"))?;
    fields.fixed_inverse = fixed_inverse;
    fields.moving_inverse = moving_inverse;

    let UpdateFields { forward, inverse, energies } = builder.compute(&UpdateRequest {
        fixed_warp: Some(&fields.moving_inverse),
        moving_warp: Some(&fields.fixed_inverse),
        fixed_points: fixed_points.as_ref(),
        moving_points: moving_points.as_ref(),
        want_inverse: true,
        update_energy: true,
    })?;
    let inverse = inverse.unwrap_or_else(|| VectorField::zeros_like(&forward));

    add_and_blend(
        &mut fields.fixed,
        &mut fields.moving,
        &forward,
        &inverse,
        gradient_step,
        GEODESIC_WEIGHT,
    )?;

    if config.total_smoothing.is_active() {
        smooth_field(&mut fields.fixed, &config.total_smoothing)?;
        smooth_field(&mut fields.moving, &config.total_smoothing)?;
    }
    Ok(state.record_energies(&energies))
}

fn velocity_of<const D: usize>(
    velocity: &Option<TimeVaryingVelocityField<D>>,
) -> Result<&TimeVaryingVelocityField<D>> {
    velocity
        .as_ref()
        .ok_or_else(|| RegistrationError::transform("time-varying velocity was not built"))
}

/// Whole-interval integrals of the current velocity.
pub fn total_fields<const D: usize>(state: &mut OptimizerState<D>, config: &RegistrationConfig) -> Result<TotalFields<D>> {
    state.symmetric_fields();
    state.refresh_velocity()?;
    let integrator = VelocityIntegrator::new(velocity_of(&state.velocity)?, config.integration);
    Ok(TotalFields {
        forward: integrator.integrate_field(0.0, 1.0),
        inverse: integrator.integrate_field(1.0, 0.0),
    })
}
