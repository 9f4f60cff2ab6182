//! Runge-Kutta integration through a time-varying velocity field.
//!
//! Times are normalised to `[0, 1]`. Integrating from `start` to `end` moves a
//! particle from its grid position along the velocity and returns the
//! displacement it accumulated.

use rayon::prelude::*;
use diffeo_core::field::{TimeVaryingVelocityField, VectorField};
use diffeo_core::spatial::{Point, Vector};
use crate::config::IntegrationConfig;
use crate::point_set::PointSet;

/// Slack on the time comparison so accumulated rounding cannot add a step.
const TIME_EPSILON: f64 = 1e-9;

/// RK4 integrator over a borrowed velocity field.
#[derive(Debug, Clone, Copy)]
pub struct VelocityIntegrator<'a, const D: usize> {
    velocity: &'a TimeVaryingVelocityField<D>,
    config: IntegrationConfig,
}

impl<'a, const D: usize> VelocityIntegrator<'a, D> {
    pub fn new(velocity: &'a TimeVaryingVelocityField<D>, config: IntegrationConfig) -> Self {
        Self { velocity, config }
    }

    /// Velocity at `(point, time)`, zero outside the space-time buffer.
    fn velocity_at(&self, point: &Point<D>, time: f64) -> Vector<D> {
        let time_index = self.velocity.time_index(time);
        if self.velocity.is_inside_buffer(point, time_index) {
            self.velocity.evaluate(point, time_index)
        } else {
            Vector::zeros()
        }
    }

    /// Displacement of the particle starting at grid `index` at time `start`.
    pub fn integrate_point(&self, start: f64, end: f64, index: &[usize; D]) -> Vector<D> {
        let origin = self.velocity.geometry().index_to_physical(index);
        self.integrate_from(start, end, &origin)
    }

    /// Displacement of the particle starting at physical `origin` at time `start`.
    ///
    /// Stage times lag the current time: the first stage samples at
    /// `t - dt`, the middle two at `t - dt/2` and the last at `t`. A stage
    /// whose sample point leaves the buffer contributes zero.
    pub fn integrate_from(&self, start: f64, end: f64, origin: &Point<D>) -> Vector<D> {
        if start == end {
            return Vector::zeros();
        }
        let start = start.clamp(0.0, 1.0);
        let end = end.clamp(0.0, 1.0);
        let sign = if start > end { -1.0 } else { 1.0 };
        let dt = self.config.delta_time;

        let mut time = start;
        let mut displacement = Vector::<D>::zeros();
        let mut length = 0.0;
        for _ in 0..self.config.max_steps() {
            let lagged = (time - sign * dt).clamp(0.0, 1.0);
            let half = (time - sign * dt * 0.5).clamp(0.0, 1.0);
            let position = *origin + displacement;

            let f1 = self.velocity_at(&position, lagged);
            let f2 = self.velocity_at(&(position + f1 * (dt * 0.5)), half);
            let f3 = self.velocity_at(&(position + f2 * (dt * 0.5)), half);
            let f4 = self.velocity_at(&(position + f3 * dt), time);

            let step = (f1 + f2 * 2.0 + f3 * 2.0 + f4) * (sign * dt / 6.0);
            displacement += step;
            length += step.norm();
            time += sign * dt;

            let done = if sign < 0.0 {
                time <= end + TIME_EPSILON
            } else {
                length == 0.0 || time >= end - TIME_EPSILON
            };
            if done {
                break;
            }
        }
        displacement
    }

    /// Dense displacement field from integrating every voxel.
    pub fn integrate_field(&self, start: f64, end: f64) -> VectorField<D> {
        let geometry = self.velocity.geometry().clone();
        let mut field = VectorField::zeros(geometry);
        if start == end {
            return field;
        }
        field.par_update(|index, value| *value = self.integrate_point(start, end, index));
        field
    }

    /// Field that is zero except at the voxels nearest each landmark.
    ///
    /// Landmarks outside the grid are skipped.
    pub fn integrate_landmarks(&self, start: f64, end: f64, points: &PointSet<D>) -> VectorField<D> {
        let geometry = self.velocity.geometry().clone();
        let mut field = VectorField::zeros(geometry.clone());
        if start == end {
            return field;
        }
        let size = geometry.size();
        let updates: Vec<([usize; D], Vector<D>)> = points
            .points()
            .par_iter()
            .filter_map(|point| {
                let continuous = geometry.physical_to_continuous_index(point);
                let mut index = [0usize; D];
                for i in 0..D {
                    let rounded = continuous[i].round();
                    if rounded < 0.0 || rounded >= size[i] as f64 {
                        return None;
                    }
                    index[i] = rounded as usize;
                }
                Some((index, self.integrate_point(start, end, &index)))
            })
            .collect();
        for (index, displacement) in updates {
            field.set(&index, displacement);
        }
        field
    }
}
