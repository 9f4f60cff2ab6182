//! Symmetric diffeomorphic registration.
//!
//! The optimizer evolves either one stationary velocity field (`Exp`) or a
//! pair of half transforms that meet in a midpoint space (`SyN`, `SyNExp`,
//! `SyNTV`). Each iteration warps the inputs, asks every similarity metric
//! for a per-voxel update, fuses the normalised updates and folds them into
//! the persistent fields.

pub mod error;
pub mod config;
pub mod point_set;
pub mod metric;
pub mod warp;
pub mod affine;
pub mod integrate;
pub mod update;
pub mod state;
pub mod stage;
pub mod optimizer;
pub mod validation;
pub mod progress;

pub use error::{RegistrationError, Result};
pub use config::{IntegrationConfig, RegistrationConfig, TransformationModel};
pub use point_set::PointSet;
pub use metric::{CrossCorrelationMetric, LandmarkMetric, MeanSquaresMetric, MetricDescriptor, SimilarityMetric};
pub use warp::WarpMultiTransform;
pub use affine::{AffineOptimizer, IdentityAffineOptimizer, PrecomputedAffine};
pub use integrate::VelocityIntegrator;
pub use update::{UpdateFieldBuilder, UpdateFields, UpdateRequest};
pub use state::{MetricEnergy, OptimizerState, SymmetricFields};
pub use optimizer::{RegistrationResult, SymmetricOptimizer};
pub use validation::ConvergenceChecker;
pub use progress::{ConsoleProgressCallback, HistoryCallback, ProgressCallback, ProgressInfo, ProgressTracker};
