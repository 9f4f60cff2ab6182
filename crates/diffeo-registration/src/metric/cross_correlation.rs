//! Local normalised cross-correlation metric.

use rayon::prelude::*;
use diffeo_core::image::ScalarVolume;
use diffeo_core::spatial::Vector;
use crate::error::{RegistrationError, Result};
use super::trait_::SimilarityMetric;

/// Windowed statistics around one voxel, centred on the window means.
#[derive(Debug, Clone, Copy, Default)]
struct LocalStats {
    fixed: f64,
    moving: f64,
    sff: f64,
    smm: f64,
    sfm: f64,
}

impl LocalStats {
    fn correlation(&self) -> Option<f64> {
        let denominator = self.sff * self.smm;
        (denominator > VARIANCE_EPSILON).then(|| self.sfm * self.sfm / denominator)
    }
}

const VARIANCE_EPSILON: f64 = 1e-5;

/// Local cross-correlation `CC = sfm² / (sff · smm)` over a box window.
///
/// Updates follow the gradient of the local CC with respect to a displacement
/// of the fixed (forward) or moving (inverse) image content.
#[derive(Debug, Clone)]
pub struct CrossCorrelationMetric<const D: usize> {
    radius: usize,
    fixed: Option<ScalarVolume<D>>,
    moving: Option<ScalarVolume<D>>,
    stats: Vec<LocalStats>,
    energy: f64,
}

impl<const D: usize> CrossCorrelationMetric<D> {
    /// Metric over a `(2 * radius + 1)^D` window.
    pub fn new(radius: usize) -> Self {
        Self {
            radius,
            fixed: None,
            moving: None,
            stats: Vec::new(),
            energy: 0.0,
        }
    }

    fn local_stats(fixed: &ScalarVolume<D>, moving: &ScalarVolume<D>, index: &[usize; D], radius: usize) -> LocalStats {
        let size = fixed.geometry().size();
        let lower: [usize; D] = std::array::from_fn(|i| index[i].saturating_sub(radius));
        let upper: [usize; D] = std::array::from_fn(|i| (index[i] + radius).min(size[i] - 1));

        let (mut sf, mut sm, mut sff, mut smm, mut sfm, mut n) = (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let mut cursor = lower;
        loop {
            let f = fixed.value(&cursor) as f64;
            let m = moving.value(&cursor) as f64;
            sf += f;
            sm += m;
            sff += f * f;
            smm += m * m;
            sfm += f * m;
            n += 1.0;

            let mut axis = 0;
            while axis < D {
                if cursor[axis] < upper[axis] {
                    cursor[axis] += 1;
                    break;
                }
                cursor[axis] = lower[axis];
                axis += 1;
            }
            if axis == D {
                break;
            }
        }

        let mean_f = sf / n;
        let mean_m = sm / n;
        LocalStats {
            fixed: fixed.value(index) as f64 - mean_f,
            moving: moving.value(index) as f64 - mean_m,
            sff: sff - sf * mean_f,
            smm: smm - sm * mean_m,
            sfm: sfm - sf * mean_m,
        }
    }

    fn stats_at(&self, index: &[usize; D]) -> Option<(&ScalarVolume<D>, &ScalarVolume<D>, LocalStats)> {
        let fixed = self.fixed.as_ref()?;
        let moving = self.moving.as_ref()?;
        let stats = *self.stats.get(fixed.geometry().offset(index))?;
        Some((fixed, moving, stats))
    }
}

impl<const D: usize> SimilarityMetric<D> for CrossCorrelationMetric<D> {
    fn name(&self) -> &'static str {
        "CrossCorrelation"
    }

    fn radius(&self) -> [usize; D] {
        [self.radius.max(1); D]
    }

    fn set_fixed_image(&mut self, image: ScalarVolume<D>) {
        self.fixed = Some(image);
    }

    fn set_moving_image(&mut self, image: ScalarVolume<D>) {
        self.moving = Some(image);
    }

    fn initialize_iteration(&mut self) -> Result<()> {
        let (fixed, moving) = match (&self.fixed, &self.moving) {
            (Some(f), Some(m)) => (f, m),
            _ => return Err(RegistrationError::metric("cross-correlation metric needs both images")),
        };
        fixed.geometry().ensure_same_grid(moving.geometry(), "cross-correlation images")?;

        let geometry = fixed.geometry();
        let radius = self.radius;
        self.stats = (0..geometry.num_voxels())
            .into_par_iter()
            .map(|offset| Self::local_stats(fixed, moving, &geometry.index_of(offset), radius))
            .collect();

        let (sum, count) = self
            .stats
            .par_iter()
            .filter_map(LocalStats::correlation)
            .map(|cc| (cc, 1usize))
            .reduce(|| (0.0, 0), |a, b| (a.0 + b.0, a.1 + b.1));
        self.energy = if count > 0 { -sum / count as f64 } else { 0.0 };
        Ok(())
    }

    fn compute_update(&self, index: &[usize; D]) -> Vector<D> {
        let Some((fixed, _, s)) = self.stats_at(index) else {
            return Vector::zeros();
        };
        if s.sff * s.smm <= VARIANCE_EPSILON {
            return Vector::zeros();
        }
        let factor = 2.0 * s.sfm / (s.sff * s.smm) * (s.moving - s.sfm / s.sff * s.fixed);
        fixed.gradient(index) * -factor
    }

    fn compute_update_inverse(&self, index: &[usize; D]) -> Vector<D> {
        let Some((_, moving, s)) = self.stats_at(index) else {
            return Vector::zeros();
        };
        if s.sff * s.smm <= VARIANCE_EPSILON {
            return Vector::zeros();
        }
        let factor = 2.0 * s.sfm / (s.sff * s.smm) * (s.fixed - s.sfm / s.smm * s.moving);
        moving.gradient(index) * -factor
    }

    fn energy(&self) -> f64 {
        self.energy
    }
}
