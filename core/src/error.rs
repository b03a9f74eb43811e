use std::path::PathBuf;
use thiserror::Error;

/// Result type for mmstack operations
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Error types for mmstack operations
///
/// Only structural problems surface as a `ConvertError` from a run. Anything that
/// concerns a single case is recorded as an
/// [`ExclusionReason`](crate::evaluation::ExclusionReason) instead.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Source root does not exist or is not a directory
    #[error("Source root not found: {}", .0.display())]
    SourceRootMissing(PathBuf),

    /// Collection finished without a single case
    #[error("No cases found under {}", .0.display())]
    NoCasesFound(PathBuf),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// NIfTI codec error
    #[error("NIfTI error: {0}")]
    Nifti(String),

    /// Volume has an unexpected layout or content
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    /// Array shape error while stacking or reshaping volumes
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Worker pool could not be created
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper conversions
impl From<String> for ConvertError {
    fn from(s: String) -> Self {
        ConvertError::InvalidVolume(s)
    }
}

impl From<&str> for ConvertError {
    fn from(s: &str) -> Self {
        ConvertError::InvalidVolume(s.to_string())
    }
}

// Convert nifti crate errors
impl From<nifti::NiftiError> for ConvertError {
    fn from(e: nifti::NiftiError) -> Self {
        ConvertError::Nifti(format!("{}", e))
    }
}

impl From<rayon::ThreadPoolBuildError> for ConvertError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        ConvertError::WorkerPool(format!("{}", e))
    }
}
