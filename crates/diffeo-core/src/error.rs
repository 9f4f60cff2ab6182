//! Error types for geometry and field operations.

use thiserror::Error;

/// Error type for images, fields and field algebra.
#[derive(Error, Debug)]
pub enum FieldError {
    /// Two fields or images that must share a grid do not.
    #[error("Geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// The direction cosine matrix cannot be inverted.
    #[error("Direction matrix is not invertible")]
    SingularDirection,

    /// A size, spacing or other grid parameter is unusable.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Buffer length does not match the number of voxels.
    #[error("Buffer length mismatch: expected {expected}, got {actual}")]
    BufferLength { expected: usize, actual: usize },

    /// Tensor shape does not match the geometry.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Tensor data could not be read back to the host.
    #[error("Tensor data error: {0}")]
    TensorData(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, FieldError>;

impl FieldError {
    /// Create a geometry mismatch error.
    pub fn geometry_mismatch(msg: impl Into<String>) -> Self {
        Self::GeometryMismatch(msg.into())
    }

    /// Create an invalid geometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create a tensor data error.
    pub fn tensor_data(msg: impl Into<String>) -> Self {
        Self::TensorData(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FieldError::geometry_mismatch("spacing differs");
        assert_eq!(err.to_string(), "Geometry mismatch: spacing differs");

        let err = FieldError::BufferLength { expected: 8, actual: 7 };
        assert_eq!(err.to_string(), "Buffer length mismatch: expected 8, got 7");
    }
}
