//! Spatial error types.

use thiserror::Error;

use crate::VolumeId;

/// Spatial error type.
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The index was queried before `construct()` was ever called.
    #[error("spatial index has not been constructed")]
    NotConstructed,

    /// A volume was created with a zero or negative extent.
    #[error("invalid {shape} dimensions: {detail}")]
    InvalidDimensions {
        shape: &'static str,
        detail: String,
    },

    /// Volume id not present in the index.
    #[error("volume not found: {0:?}")]
    UnknownVolume(VolumeId),
}

/// Result type for spatial operations.
pub type SpatialResult<T> = Result<T, SpatialError>;
