//! Dense vector fields and their algebra.
//!
//! Allocation, copying and buffer swaps live on [`VectorField`]; composition,
//! inversion and the constant-velocity exponential are free functions.

pub mod vector_field;
pub mod time_varying;
pub mod compose;
pub mod invert;
pub mod resample;

pub use vector_field::VectorField;
pub use time_varying::TimeVaryingVelocityField;
pub use compose::{compose_fields, compose_in_place, integrate_constant_velocity};
pub use invert::{invert_field, invert_field_into, InversionConfig, InversionReport};
pub use resample::resample_field;
