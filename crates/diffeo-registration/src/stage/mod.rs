//! One-iteration drivers, one per transformation model.
//!
//! Every driver follows the same outline: warp the inputs into the working
//! frame, build an update, fold it into the persistent fields, regularise,
//! and for the static symmetric model re-invert.

pub mod exp;
pub mod syn;
pub mod syn_exp;
pub mod syn_tv;

use burn::tensor::backend::Backend;
use diffeo_core::field::VectorField;
use crate::config::{RegistrationConfig, TransformationModel};
use crate::error::{RegistrationError, Result};
use crate::point_set::PointSet;
use crate::state::OptimizerState;
use crate::update::UpdateFieldBuilder;

/// Landmarks driving the point-set metrics, in their own physical frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct Landmarks<'a, const D: usize> {
    pub fixed: Option<&'a PointSet<D>>,
    pub moving: Option<&'a PointSet<D>>,
}

/// Total forward (fixed → moving) and inverse displacement fields.
#[derive(Debug, Clone)]
pub struct TotalFields<const D: usize> {
    pub forward: VectorField<D>,
    pub inverse: VectorField<D>,
}

/// Run one iteration of `config.model`; returns the summed metric energy.
pub fn run_iteration<B: Backend, const D: usize>(
    state: &mut OptimizerState<D>,
    builder: &mut UpdateFieldBuilder<'_, B, D>,
    config: &RegistrationConfig,
    landmarks: Landmarks<'_, D>,
) -> Result<Option<f64>> {
    match config.model {
        TransformationModel::Exp { gradient_step } => exp::update(state, builder, config, gradient_step, landmarks),
        TransformationModel::SyN { gradient_step } => syn::update(state, builder, config, gradient_step, landmarks),
        TransformationModel::SyNExp { gradient_step } => {
            syn_exp::update(state, builder, config, gradient_step, landmarks)
        }
        TransformationModel::SyNTV { gradient_step } => {
            syn_tv::update(state, builder, config, gradient_step, landmarks)
        }
    }
}

/// Total maps implied by the current state.
pub fn total_fields<const D: usize>(state: &mut OptimizerState<D>, config: &RegistrationConfig) -> Result<TotalFields<D>> {
    match config.model {
        TransformationModel::Exp { .. } => exp::total_fields(state, config),
        TransformationModel::SyN { .. } => syn::total_fields(state),
        TransformationModel::SyNExp { .. } => syn_exp::total_fields(state, config),
        TransformationModel::SyNTV { .. } => syn_tv::total_fields(state, config),
    }
}

/// Carry moving-frame landmarks into the domain: inverse affine, then `field`.
pub(crate) fn carry_moving_points<B: Backend, const D: usize>(
    builder: &UpdateFieldBuilder<'_, B, D>,
    points: &PointSet<D>,
    field: Option<&VectorField<D>>,
) -> Result<PointSet<D>> {
    let inverse = builder
        .affine()
        .map(|a| {
            a.try_inverse()
                .ok_or_else(|| RegistrationError::transform("affine transform is not invertible"))
        })
        .transpose()?;
    Ok(builder.warper().warp_points(points, inverse.as_ref(), field))
}
