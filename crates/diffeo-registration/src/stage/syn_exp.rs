//! Symmetric model with stationary half velocities.

use burn::tensor::backend::Backend;
use rayon::prelude::*;
use diffeo_core::field::{compose_fields, integrate_constant_velocity, VectorField};
use diffeo_core::filter::smooth_field;
use crate::config::RegistrationConfig;
use crate::error::Result;
use crate::state::OptimizerState;
use crate::update::{UpdateFieldBuilder, UpdateFields, UpdateRequest};
use super::{carry_moving_points, Landmarks, TotalFields};

/// Weight kept by each half velocity in the geodesic blend.
const GEODESIC_WEIGHT: f64 = 0.99;

/// One iteration on the half velocities.
///
/// The half inverses are exponentials of the negated velocities. Updates are
/// added to the velocities, which are then pulled toward `v_f = -v_m` by the
/// blend `v_f ← w·v_f - (1-w)·v_m`, `v_m ← w·v_m - (1-w)·v_f`.
pub fn update<B: Backend, const D: usize>(
    state: &mut OptimizerState<D>,
    builder: &mut UpdateFieldBuilder<'_, B, D>,
    config: &RegistrationConfig,
    gradient_step: f64,
    landmarks: Landmarks<'_, D>,
) -> Result<Option<f64>> {
    let steps = config.n_time_steps;
    let fields = state.symmetric_fields();
    fields.fixed_inverse = integrate_constant_velocity(&fields.fixed, steps, -1.0)?;
    fields.moving_inverse = integrate_constant_velocity(&fields.moving, steps, -1.0)?;

    let moving_points = match landmarks.moving {
        Some(points) => {
            let moving_map = integrate_constant_velocity(&fields.moving, steps, 1.0)?;
            Some(carry_moving_points(builder, points, Some(&moving_map))?)
        }
        None => None,
    };
    let fixed_points = match landmarks.fixed {
        Some(points) => {
            let fixed_map = integrate_constant_velocity(&fields.fixed, steps, 1.0)?;
            Some(builder.warper().warp_points(points, None, Some(&fixed_map)))
        }
        None => None,
    };

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

/// `f += step·uf`, `m += step·um`, then the geodesic blend with weight `keep`.
pub(crate) fn add_and_blend<const D: usize>(
    fixed: &mut VectorField<D>,
    moving: &mut VectorField<D>,
    forward: &VectorField<D>,
    inverse: &VectorField<D>,
    step: f64,
    keep: f64,
) -> Result<()> {
    fixed.geometry().ensure_same_grid(forward.geometry(), "fixed half update")?;
    moving.geometry().ensure_same_grid(inverse.geometry(), "moving half update")?;
    fixed.geometry().ensure_same_grid(moving.geometry(), "half fields")?;
    let mix = 1.0 - keep;

    fixed
        .values_mut()
        .par_iter_mut()
        .zip(moving.values_mut().par_iter_mut())
        .zip(forward.values().par_iter().zip(inverse.values().par_iter()))
        .for_each(|((f, m), (uf, um))| {
            let vf = *f + *uf * step;
            let vm = *m + *um * step;
            *m = vm * keep - vf * mix;
            *f = vf * keep - vm * mix;
        });
    Ok(())
}

pub fn total_fields<const D: usize>(state: &mut OptimizerState<D>, config: &RegistrationConfig) -> Result<TotalFields<D>> {
    let steps = config.n_time_steps;
    let fields = state.symmetric_fields();
    let fixed_map = integrate_constant_velocity(&fields.fixed, steps, 1.0)?;
    let fixed_inverse = integrate_constant_velocity(&fields.fixed, steps, -1.0)?;
    let moving_map = integrate_constant_velocity(&fields.moving, steps, 1.0)?;
    let moving_inverse = integrate_constant_velocity(&fields.moving, steps, -1.0)?;
    Ok(TotalFields {
        forward: compose_fields(&fixed_map, &moving_inverse, 1.0)?,
        inverse: compose_fields(&moving_map, &fixed_inverse, 1.0)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffeo_core::image::ImageGeometry;
    use diffeo_core::spatial::Vector;

    #[test]
    fn test_blend_uses_post_update_values() {
        let geometry = ImageGeometry::<2>::from_size([3, 3]);
        let mut fixed = VectorField::zeros(geometry.clone());
        let mut moving = VectorField::zeros(geometry.clone());
        fixed.fill(Vector::new([1.0, 0.0]));
        let mut forward = VectorField::zeros(geometry.clone());
        forward.fill(Vector::new([2.0, 0.0]));
        let mut inverse = VectorField::zeros(geometry);
        inverse.fill(Vector::new([0.0, 4.0]));

        add_and_blend(&mut fixed, &mut moving, &forward, &inverse, 0.5, 0.99).unwrap();
        // vf = (2, 0), vm = (0, 2)
        let f = fixed.get(&[1, 1]);
        let m = moving.get(&[1, 1]);
        assert!((f[0] - 1.98).abs() < 1e-12 && (f[1] + 0.02).abs() < 1e-12);
        assert!((m[0] + 0.02).abs() < 1e-12 && (m[1] - 1.98).abs() < 1e-12);
    }
}
