//! Engine error types.

use thiserror::Error;
use zone_spatial::{DomainId, SpatialError};

use crate::{HostId, ProfileId, SceneId, ValueKind};

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Spatial index error.
    #[error("spatial error: {0}")]
    Spatial(#[from] SpatialError),

    /// No key registered under this id.
    #[error("unknown setting key: {0}")]
    UnknownKey(String),

    #[error("unknown domain: {0}")]
    UnknownDomain(DomainId),

    #[error("unknown scene: {0:?}")]
    UnknownScene(SceneId),

    #[error("unknown profile: {0:?}")]
    UnknownProfile(ProfileId),

    /// A name (or key id) is already taken.
    #[error("name already in use: {0}")]
    DuplicateName(String),

    /// Scenes must have a priority of zero or more.
    #[error("scene priority must be non-negative, got {0}")]
    NegativePriority(i32),

    /// Value kind does not match the key.
    #[error("key {key} expects a {expected:?} value")]
    KindMismatch { key: String, expected: ValueKind },

    /// A host reported a value it could not deliver. Indicates a bug.
    #[error("inconsistent value for key {key} on {host}")]
    Inconsistent { host: HostId, key: String },

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Configuration error type.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cache size must not be negative, got {0}")]
    NegativeCacheSize(i64),

    #[error("cache trim interval must be greater than zero")]
    ZeroInterval,

    #[error("could not parse {var}={value:?}")]
    Parse { var: &'static str, value: String },
}
