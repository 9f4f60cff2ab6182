//! Symmetric model with static half displacement fields.

use burn::tensor::backend::Backend;
use diffeo_core::field::{compose_fields, compose_in_place, invert_field_into, VectorField};
use diffeo_core::filter::smooth_field;
use crate::config::RegistrationConfig;
use crate::error::Result;
use crate::state::OptimizerState;
use crate::update::{UpdateFieldBuilder, UpdateFields, UpdateRequest};
use super::{carry_moving_points, Landmarks, TotalFields};

/// One symmetric iteration.
///
/// Both images are brought to the midpoint through the inverse half fields,
/// the forward update is composed onto the fixed half and the inverse update
/// onto the moving half. All four fields are then re-inverted in turn, each
/// inversion starting from the field it overwrites.
pub fn update<B: Backend, const D: usize>(
    state: &mut OptimizerState<D>,
    builder: &mut UpdateFieldBuilder<'_, B, D>,
    config: &RegistrationConfig,
    gradient_step: f64,
    landmarks: Landmarks<'_, D>,
) -> Result<Option<f64>> {
    let fields = state.symmetric_fields();

    let moving_points = landmarks
        .moving
        .map(|points| carry_moving_points(builder, points, Some(&fields.moving)))
        .transpose()?;
    let fixed_points = landmarks
        .fixed
        .map(|points| builder.warper().warp_points(points, None, Some(&fields.fixed)));

    let UpdateFields { forward, inverse, energies } = builder.compute(&UpdateRequest {
        fixed_warp: Some(&fields.moving_inverse),
        moving_warp: Some(&fields.fixed_inverse),
        fixed_points: fixed_points.as_ref(),
        moving_points: moving_points.as_ref(),
        want_inverse: true,
        update_energy: true,
    })?;
    let inverse = inverse.unwrap_or_else(|| VectorField::zeros_like(&forward));

    compose_in_place(&mut fields.fixed, &forward, gradient_step)?;
    compose_in_place(&mut fields.moving, &inverse, gradient_step)?;

    if config.total_smoothing.is_active() {
        smooth_field(&mut fields.fixed, &config.total_smoothing)?;
        smooth_field(&mut fields.moving, &config.total_smoothing)?;
    }

    let inversion = &config.inversion;
    invert_field_into(&fields.fixed, &mut fields.fixed_inverse, inversion)?;
    invert_field_into(&fields.moving, &mut fields.moving_inverse, inversion)?;
    invert_field_into(&fields.fixed_inverse, &mut fields.fixed, inversion)?;
    invert_field_into(&fields.moving_inverse, &mut fields.moving, inversion)?;

    Ok(state.record_energies(&energies))
}

/// Fixed → midpoint → moving, and back.
pub fn total_fields<const D: usize>(state: &mut OptimizerState<D>) -> Result<TotalFields<D>> {
    let fields = state.symmetric_fields();
    Ok(TotalFields {
        forward: compose_fields(&fields.fixed, &fields.moving_inverse, 1.0)?,
        inverse: compose_fields(&fields.moving, &fields.fixed_inverse, 1.0)?,
    })
}
