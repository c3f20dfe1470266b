//! Error types for subscription activation.

use std::time::Duration;

use thiserror::Error;

/// Errors reported by a messaging backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The subscription or topic already exists.
    ///
    /// Provisioning treats this as success.
    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    /// The subscription or topic does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The credentials in use may not access the resource.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure.
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    /// Creates a generic backend error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns `true` for the "already exists" provisioning conflict.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Why a single subscription failed to activate.
///
/// These never escape the activation loop; they are collected per descriptor.
#[derive(Debug, Clone, Error)]
pub enum ActivationError {
    /// The handler tag lacks a project or a subscription name.
    #[error("handler '{handler}' is tagged without a project or subscription name")]
    InvalidTag { handler: String },

    /// Creating the subscription failed for a reason other than
    /// "already exists".
    #[error("failed to provision {subscription} on {topic}: {source}")]
    Provision {
        subscription: String,
        topic: String,
        #[source]
        source: BackendError,
    },

    /// Registering the callback failed.
    #[error("failed to subscribe to {subscription}: {source}")]
    Subscribe {
        subscription: String,
        #[source]
        source: BackendError,
    },

    /// A backend call did not finish in time.
    #[error("{operation} for {subscription} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        subscription: String,
        timeout: Duration,
    },
}

/// Result type for a single activation.
pub type ActivationResult<T> = Result<T, ActivationError>;
