//! Spatial transforms: affine, displacement field and their chaining.

pub mod trait_;
pub mod affine;
pub mod displacement_field;
pub mod chained;

pub use trait_::{IdentityTransform, Transform};
pub use affine::AffineTransform;
pub use displacement_field::DisplacementFieldTransform;
pub use chained::ChainedTransform;
