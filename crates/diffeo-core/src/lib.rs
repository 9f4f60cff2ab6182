//! Core types for diffeomorphic registration.
//!
//! Images live in burn tensors for resampling and smoothing; dense vector
//! fields and the field algebra on them (composition, inversion, velocity
//! exponentials, regularisation) run on the host with rayon.

pub mod error;
pub mod spatial;
pub mod image;
pub mod field;
pub mod interpolation;
pub mod transform;
pub mod filter;

pub use error::{FieldError, Result};
pub use image::{Image, ImageGeometry, ScalarVolume};
pub use field::{TimeVaryingVelocityField, VectorField};
pub use spatial::{Point, Vector, Spacing, Direction};
