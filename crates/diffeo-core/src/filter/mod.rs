//! Image and field filters.

pub mod kernel;
pub mod gaussian;
pub mod resample;
pub mod pyramid;
pub mod field_gaussian;
pub mod field_bspline;
pub mod smoothing;

pub use kernel::discrete_gaussian_kernel;
pub use gaussian::GaussianFilter;
pub use resample::ResampleImageFilter;
pub use pyramid::MultiResolutionPyramid;
pub use field_gaussian::smooth_field_gaussian;
pub use field_bspline::smooth_field_bspline;
pub use smoothing::{smooth_field, SmoothingConfig};
