//! Error types for registration operations.

use diffeo_core::FieldError;
use thiserror::Error;

/// Main error type for registration operations.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Error in metric computation.
    #[error("Metric error: {0}")]
    MetricError(String),

    /// Error in transform operation.
    #[error("Transform error: {0}")]
    TransformError(String),

    /// Error in image validation.
    #[error("Image validation error: {0}")]
    ImageValidationError(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Two inputs that must share a grid or dimensionality do not.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error raised by field algebra or image geometry.
    #[error(transparent)]
    Field(#[from] FieldError),
}

/// Result type for registration operations.
pub type Result<T> = std::result::Result<T, RegistrationError>;

impl RegistrationError {
    /// Create a metric error.
    pub fn metric(msg: impl Into<String>) -> Self {
        Self::MetricError(msg.into())
    }

    /// Create a transform error.
    pub fn transform(msg: impl Into<String>) -> Self {
        Self::TransformError(msg.into())
    }

    /// Create an image validation error.
    pub fn image_validation(msg: impl Into<String>) -> Self {
        Self::ImageValidationError(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(msg: impl Into<String>) -> Self {
        Self::DimensionMismatch(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RegistrationError::metric("test error");
        assert!(matches!(err, RegistrationError::MetricError(_)));
    }

    #[test]
    fn test_error_display() {
        let err = RegistrationError::invalid_configuration("gradient step must be positive");
        assert_eq!(err.to_string(), "Invalid configuration: gradient step must be positive");
    }

    #[test]
    fn test_field_error_is_transparent() {
        let err: RegistrationError = FieldError::geometry_mismatch("compose").into();
        assert!(matches!(err, RegistrationError::Field(_)));
        assert_eq!(err.to_string(), "Geometry mismatch: compose");
    }
}
