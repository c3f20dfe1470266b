//! Runtime error types.

use subhook_core::BackendError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that escape the activation loop.
///
/// Per-subscription failures never show up here; they are collected in an
/// [`ActivationReport`](crate::ActivationReport).
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Credential configuration is invalid or unreadable.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The subscriber client could not be built.
    #[error("Failed to construct subscriber client: {0}")]
    ClientConstruction(#[source] BackendError),

    /// The operation needs an activated plugin.
    #[error("Pub/sub plugin is not active")]
    NotActive,
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
