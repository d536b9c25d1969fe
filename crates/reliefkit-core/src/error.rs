//! Error types for ReliefKit.
//!
//! Setup-time conditions (degenerate input, inconsistent shapes, invalid
//! configuration) abort the whole operation and surface here. Numerical
//! non-convergence of the inner smoother is never an error.

use std::io;
use thiserror::Error;

/// Errors that can occur while generating a relief.
#[derive(Error, Debug)]
pub enum ReliefError {
    /// The depth map holds a single value, so there is no relief to compute.
    #[error("Input image is blank: depth range is empty (min == max == {value})")]
    DegenerateInput {
        /// The constant depth value.
        value: f64,
    },

    /// Two user-supplied buffers disagree in size.
    #[error("Shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Which input was inconsistent.
        what: String,
        /// Expected `(width, height)`.
        expected: (usize, usize),
        /// Supplied `(width, height)`.
        actual: (usize, usize),
    },

    /// Invalid parameters were provided.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The operation was cancelled by the caller.
    #[error("Relief generation cancelled")]
    Cancelled,

    /// Image decoding or conversion failed.
    #[error("Image processing error: {0}")]
    ImageError(String),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// TOML parse error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// TOML write error.
    #[error("TOML write error: {0}")]
    TomlWriteError(#[from] toml::ser::Error),

    /// A parameter validation error occurred.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

/// Errors related to relief parameter validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter value is out of the valid range.
    #[error("Parameter '{name}' out of range: {value} (valid: {min}..{max})")]
    OutOfRange {
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A parameter value is invalid.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: String, reason: String },

    /// Dimensions are invalid (zero, negative, or too small to coarsen).
    #[error("Invalid dimensions: {0}")]
    InvalidDimensions(String),
}

/// Result type alias for relief operations.
pub type ReliefResult<T> = Result<T, ReliefError>;

/// Result type alias for parameter validation.
pub type ParameterResult<T> = Result<T, ParameterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relief_error_display() {
        let err = ReliefError::DegenerateInput { value: 0.5 };
        assert_eq!(
            err.to_string(),
            "Input image is blank: depth range is empty (min == max == 0.5)"
        );

        let err = ReliefError::ShapeMismatch {
            what: "gradient mask".to_string(),
            expected: (4, 3),
            actual: (3, 4),
        };
        assert_eq!(
            err.to_string(),
            "Shape mismatch for gradient mask: expected (4, 3), got (3, 4)"
        );

        assert_eq!(
            ReliefError::Cancelled.to_string(),
            "Relief generation cancelled"
        );
    }

    #[test]
    fn test_parameter_error_display() {
        let err = ParameterError::OutOfRange {
            name: "decimate_ratio".to_string(),
            value: -0.5,
            min: 0.0,
            max: 1.0,
        };
        assert_eq!(
            err.to_string(),
            "Parameter 'decimate_ratio' out of range: -0.5 (valid: 0..1)"
        );
    }

    #[test]
    fn test_error_conversion() {
        let param_err = ParameterError::InvalidDimensions("min_gridsize".to_string());
        let err: ReliefError = param_err.into();
        assert!(matches!(err, ReliefError::Parameter(_)));

        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: ReliefError = io_err.into();
        assert!(matches!(err, ReliefError::IoError(_)));
    }
}
