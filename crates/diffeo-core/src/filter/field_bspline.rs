//! Multilevel B-spline approximation of vector fields.
//!
//! Each voxel is a scattered sample at its continuous index. The first level
//! fits a uniform control lattice of `mesh + order` points per axis; every
//! following level doubles the mesh and fits the residual left by the levels
//! before it. Zero vectors carry no data and are filled from the fit.

use rayon::prelude::*;
use crate::field::VectorField;
use crate::spatial::Vector;

/// Replace `field` by its B-spline approximation.
///
/// No-op when `order` is zero, `levels` is zero or any mesh entry is zero.
/// The fit runs in index space, so the direction cosines never enter it.
pub fn smooth_field_bspline<const D: usize>(
    field: &mut VectorField<D>,
    mesh: &[usize; D],
    order: usize,
    levels: usize,
) {
    if order == 0 || levels == 0 || mesh.iter().any(|&m| m == 0) {
        return;
    }
    let size = field.geometry().size();
    let samples: Vec<(usize, Vector<D>)> = field
        .values()
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_zero())
        .collect();
    if samples.is_empty() {
        return;
    }

    let mut residual: Vec<Vector<D>> = samples.iter().map(|(_, v)| *v).collect();
    let mut fitted = vec![Vector::<D>::zeros(); field.len()];
    let mut level_mesh = *mesh;
    for level in 0..levels {
        let lattice = ControlLattice::fit(&size, &level_mesh, order, &samples, &residual);
        residual
            .par_iter_mut()
            .zip(samples.par_iter())
            .for_each(|(r, (offset, _))| *r -= lattice.evaluate(&parametric(&size, &level_mesh, *offset)));
        fitted
            .par_iter_mut()
            .enumerate()
            .for_each(|(offset, v)| *v += lattice.evaluate(&parametric(&size, &level_mesh, offset)));
        tracing::debug!(level, mesh = ?level_mesh, "B-spline level fitted");
        level_mesh.iter_mut().for_each(|m| *m *= 2);
    }

    field.values_mut().copy_from_slice(&fitted);
}

/// Parametric coordinate of a buffer offset, in `[0, mesh]` per axis.
fn parametric<const D: usize>(size: &[usize; D], mesh: &[usize; D], mut offset: usize) -> [f64; D] {
    let mut u = [0.0; D];
    for axis in 0..D {
        let index = offset % size[axis];
        offset /= size[axis];
        if size[axis] > 1 {
            u[axis] = index as f64 / (size[axis] - 1) as f64 * mesh[axis] as f64;
        }
    }
    u
}

/// Uniform B-spline basis values of the given order at local coordinate `t`.
///
/// Returns `order + 1` weights for control points `span..=span + order`.
fn basis(order: usize, t: f64) -> Vec<f64> {
    let mut b = vec![1.0];
    for d in 1..=order {
        let df = d as f64;
        let mut next = vec![0.0; d + 1];
        for (k, n) in next.iter_mut().enumerate() {
            let kf = k as f64;
            let left = if k >= 1 { b[k - 1] } else { 0.0 };
            let right = if k < d { b[k] } else { 0.0 };
            *n = ((t + df - kf) * left + (kf + 1.0 - t) * right) / df;
        }
        b = next;
    }
    b
}

/// Tensor-product support of one parametric point.
struct Support<const D: usize> {
    span: [usize; D],
    weights: [Vec<f64>; D],
}

impl<const D: usize> Support<D> {
    fn new(u: &[f64; D], mesh: &[usize; D], order: usize) -> Self {
        let mut span = [0; D];
        let weights = std::array::from_fn(|axis| {
            let s = (u[axis].floor() as usize).min(mesh[axis] - 1);
            span[axis] = s;
            basis(order, u[axis] - s as f64)
        });
        Self { span, weights }
    }

    /// Visit every control point in the support with its tensor weight.
    fn for_each(&self, order: usize, mut visit: impl FnMut(&[usize; D], f64)) {
        let mut local = [0usize; D];
        let count = (order + 1).pow(D as u32);
        for _ in 0..count {
            let mut w = 1.0;
            let mut control = [0usize; D];
            for axis in 0..D {
                w *= self.weights[axis][local[axis]];
                control[axis] = self.span[axis] + local[axis];
            }
            visit(&control, w);
            for axis in 0..D {
                local[axis] += 1;
                if local[axis] <= order {
                    break;
                }
                local[axis] = 0;
            }
        }
    }
}

struct ControlLattice<const D: usize> {
    dims: [usize; D],
    mesh: [usize; D],
    order: usize,
    points: Vec<Vector<D>>,
}

impl<const D: usize> ControlLattice<D> {
    fn offset(&self, control: &[usize; D]) -> usize {
        let mut offset = 0;
        let mut stride = 1;
        for axis in 0..D {
            offset += control[axis] * stride;
            stride *= self.dims[axis];
        }
        offset
    }

    /// Least-squares-per-point fit with the multilevel B-spline approximation rule.
    fn fit(
        size: &[usize; D],
        mesh: &[usize; D],
        order: usize,
        samples: &[(usize, Vector<D>)],
        values: &[Vector<D>],
    ) -> Self {
        let dims: [usize; D] = std::array::from_fn(|axis| mesh[axis] + order);
        let mut lattice = Self {
            dims,
            mesh: *mesh,
            order,
            points: Vec::new(),
        };
        let n_controls: usize = dims.iter().product();

        let (delta, omega) = samples
            .par_iter()
            .zip(values.par_iter())
            .fold(
                || (vec![Vector::<D>::zeros(); n_controls], vec![0.0; n_controls]),
                |(mut delta, mut omega), ((offset, _), value)| {
                    let support = Support::new(&parametric(size, mesh, *offset), mesh, order);
                    let mut sum_sq = 0.0;
                    support.for_each(order, |_, w| sum_sq += w * w);
                    if sum_sq > 0.0 {
                        support.for_each(order, |control, w| {
                            let k = lattice.offset(control);
                            let phi = *value * (w / sum_sq);
                            delta[k] += phi * (w * w);
                            omega[k] += w * w;
                        });
                    }
                    (delta, omega)
                },
            )
            .reduce(
                || (vec![Vector::<D>::zeros(); n_controls], vec![0.0; n_controls]),
                |(mut da, mut oa), (db, ob)| {
                    da.iter_mut().zip(db).for_each(|(a, b)| *a += b);
                    oa.iter_mut().zip(ob).for_each(|(a, b)| *a += b);
                    (da, oa)
                },
            );

        lattice.points = delta
            .into_iter()
            .zip(omega)
            .map(|(d, o)| if o > 0.0 { d / o } else { Vector::zeros() })
            .collect();
        lattice
    }

    fn evaluate(&self, u: &[f64; D]) -> Vector<D> {
        let support = Support::new(u, &self.mesh, self.order);
        let mut value = Vector::zeros();
        support.for_each(self.order, |control, w| value += self.points[self.offset(control)] * w);
        value
    }
}
