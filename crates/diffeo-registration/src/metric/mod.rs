//! Similarity metrics.
//!
//! Intensity metrics (mean squares, local cross-correlation) and the landmark
//! metric share the [`SimilarityMetric`] trait; a [`MetricDescriptor`] binds
//! one of them to its images, landmarks and weight.

pub mod trait_;
pub mod descriptor;
pub mod mean_squares;
pub mod cross_correlation;
pub mod landmark;

pub use trait_::SimilarityMetric;
pub use descriptor::MetricDescriptor;
pub use mean_squares::MeanSquaresMetric;
pub use cross_correlation::CrossCorrelationMetric;
pub use landmark::LandmarkMetric;
