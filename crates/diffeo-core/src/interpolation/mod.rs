//! Interpolation of images (tensors) and vector fields (host buffers).

pub mod trait_;
pub mod linear;
pub mod nearest;
pub mod vector_linear;

pub use trait_::Interpolator;
pub use linear::LinearInterpolator;
pub use nearest::NearestNeighborInterpolator;
pub use vector_linear::VectorLinearInterpolator;
