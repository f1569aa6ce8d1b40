//! Error types for detector construction and configuration.
//!
//! Platform failures during monitoring never surface here; the engine absorbs
//! them as `Unknown` state.

use thiserror::Error;

/// Invalid detector configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Errors returned by the `CallDetector` facade.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// `start` needs a Tokio runtime to host the engine task.
    #[error("no async runtime available to host the engine")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, DetectError>;
