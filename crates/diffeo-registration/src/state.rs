//! Mutable state carried across iterations and resolution levels.

use diffeo_core::field::{resample_field, TimeVaryingVelocityField, VectorField};
use diffeo_core::image::ImageGeometry;
use diffeo_core::transform::AffineTransform;
use crate::error::Result;

/// Energy bookkeeping of one metric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricEnergy {
    pub last: f64,
    pub current: f64,
    pub history: Vec<f64>,
}

impl MetricEnergy {
    pub fn record(&mut self, energy: f64) {
        self.last = self.current;
        self.current = energy;
        self.history.push(energy);
    }
}

/// Half fields of the symmetric models.
///
/// `fixed` maps the fixed frame to the midpoint and `moving` the moving
/// frame to the midpoint; the inverses map back. For `SyNExp` and `SyNTV`
/// `fixed` and `moving` hold velocities instead of displacements.
#[derive(Debug, Clone)]
pub struct SymmetricFields<const D: usize> {
    pub fixed: VectorField<D>,
    pub fixed_inverse: VectorField<D>,
    pub moving: VectorField<D>,
    pub moving_inverse: VectorField<D>,
}

impl<const D: usize> SymmetricFields<D> {
    pub fn zeros(geometry: &ImageGeometry<D>) -> Self {
        let zero = VectorField::zeros(geometry.clone());
        Self {
            fixed: zero.clone(),
            fixed_inverse: zero.clone(),
            moving: zero.clone(),
            moving_inverse: zero,
        }
    }

    fn resample(&self, geometry: &ImageGeometry<D>) -> Self {
        Self {
            fixed: resample_field(&self.fixed, geometry),
            fixed_inverse: resample_field(&self.fixed_inverse, geometry),
            moving: resample_field(&self.moving, geometry),
            moving_inverse: resample_field(&self.moving_inverse, geometry),
        }
    }
}

/// Everything the stage drivers read and write between iterations.
#[derive(Debug, Clone)]
pub struct OptimizerState<const D: usize> {
    domain: ImageGeometry<D>,
    /// Affine part, `None` for identity.
    pub affine: Option<AffineTransform<D>>,
    /// Stationary velocity of the `Exp` model; zero otherwise.
    pub deformation: VectorField<D>,
    /// Lazily allocated by the symmetric drivers.
    pub symmetric: Option<SymmetricFields<D>>,
    /// Two-sample velocity of the `SyNTV` model.
    pub velocity: Option<TimeVaryingVelocityField<D>>,
    pub energies: Vec<MetricEnergy>,
    /// Iterations run so far over all levels.
    pub iteration: usize,
    /// Summed energy per iteration of the current level.
    pub level_history: Vec<f64>,
}

impl<const D: usize> OptimizerState<D> {
    pub fn new(domain: ImageGeometry<D>, num_metrics: usize) -> Self {
        Self {
            deformation: VectorField::zeros(domain.clone()),
            domain,
            affine: None,
            symmetric: None,
            velocity: None,
            energies: vec![MetricEnergy::default(); num_metrics],
            iteration: 0,
            level_history: Vec::new(),
        }
    }

    pub fn domain(&self) -> &ImageGeometry<D> {
        &self.domain
    }

    /// Move to a new resolution level.
    ///
    /// Persistent fields are resampled onto `domain`; the time-varying field
    /// is dropped and rebuilt from the half fields on next use.
    pub fn set_domain(&mut self, domain: ImageGeometry<D>) {
        if !self.domain.same_grid(&domain) {
            self.deformation = resample_field(&self.deformation, &domain);
            self.symmetric = self.symmetric.as_ref().map(|s| s.resample(&domain));
            self.velocity = None;
            self.domain = domain;
        }
        self.level_history.clear();
    }

    /// Half fields, allocated as zero on the domain the first time.
    pub fn symmetric_fields(&mut self) -> &mut SymmetricFields<D> {
        let domain = &self.domain;
        self.symmetric.get_or_insert_with(|| SymmetricFields::zeros(domain))
    }

    /// Store the energies a metric pass reported and the summed energy.
    pub fn record_energies(&mut self, energies: &[Option<f64>]) -> Option<f64> {
        let mut total = None;
        for (slot, energy) in self.energies.iter_mut().zip(energies) {
            if let Some(e) = energy {
                slot.record(*e);
                *total.get_or_insert(0.0) += *e;
            }
        }
        if let Some(t) = total {
            self.level_history.push(t);
        }
        total
    }

    /// Current energy of every metric.
    pub fn current_energies(&self) -> Vec<f64> {
        self.energies.iter().map(|e| e.current).collect()
    }

    /// Refresh the two-sample velocity from the half fields.
    pub fn refresh_velocity(&mut self) -> Result<()> {
        let Some(fields) = self.symmetric.as_ref() else {
            return Ok(());
        };
        match self.velocity.as_mut() {
            Some(velocity) => velocity.refresh_from_half_fields(&fields.fixed, &fields.moving)?,
            None => {
                self.velocity = Some(TimeVaryingVelocityField::from_half_fields(&fields.fixed, &fields.moving)?);
            }
        }
        Ok(())
    }
}
