//! Image types and operations.
//!
//! `Image` holds tensor data for resampling and smoothing; `ScalarVolume` is the
//! host copy metrics read from. Both share an `ImageGeometry`.

pub mod image;
pub mod geometry;
pub mod volume;
pub mod grid;

pub use image::{index_to_world_tensor, Image};
pub use geometry::ImageGeometry;
pub use volume::ScalarVolume;
pub use grid::generate_grid;
