//! Error types for structure voxelization and dose evaluation.

use thiserror::Error;

/// Coarse error taxonomy shared by every stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required input was not supplied.
    NullInput,
    /// Contour topology is invalid, or an index lies outside the grid.
    StructuralValidity,
    /// A parameter is outside its admissible domain.
    InvalidParameter,
    /// A requested value was never computed.
    DataUnavailable,
    /// A configuration value is invalid.
    Config,
}

/// Errors that can occur while building masks or computing dose statistics.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DoseEvalError {
    /// A required input (grid, structure, mask, dose) is missing.
    #[error("missing required input: {0}")]
    NullInput(String),

    /// The structure violates contour topology rules.
    #[error("structure is not valid: {0}")]
    StructuralValidity(String),

    /// A voxel index or slice lies outside the grid.
    #[error("index {index} is outside the grid extent {extent}")]
    IndexOutOfRange { index: String, extent: String },

    /// A parameter is outside its admissible domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested value is not available.
    #[error("data not available: {0}")]
    DataUnavailable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl DoseEvalError {
    /// Create a NullInput error.
    pub fn null_input(msg: impl Into<String>) -> Self {
        Self::NullInput(msg.into())
    }

    /// Create a StructuralValidity error.
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::StructuralValidity(msg.into())
    }

    /// Create an IndexOutOfRange error.
    pub fn out_of_range(index: impl Into<String>, extent: impl Into<String>) -> Self {
        Self::IndexOutOfRange {
            index: index.into(),
            extent: extent.into(),
        }
    }

    /// Create an InvalidParameter error.
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a DataUnavailable error.
    pub fn data_unavailable(msg: impl Into<String>) -> Self {
        Self::DataUnavailable(msg.into())
    }

    /// Taxonomy bucket of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NullInput(_) => ErrorKind::NullInput,
            Self::StructuralValidity(_) | Self::IndexOutOfRange { .. } => {
                ErrorKind::StructuralValidity
            }
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::DataUnavailable(_) => ErrorKind::DataUnavailable,
            Self::ConfigError(_) => ErrorKind::Config,
        }
    }
}

/// Result type for dose evaluation operations.
pub type DoseEvalResult<T> = std::result::Result<T, DoseEvalError>;
