//! Configuration for the pub/sub extension.
//!
//! The only option the extension itself recognises is
//! `SERVICE_ACCOUNT_JSON`; activation tuning and logging ride along in the
//! same file.

pub mod credentials;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use credentials::resolve_credentials;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config};
pub use schema::{
    ActivationConfig, CredentialSource, LogFormat, LogLevel, LogOutput, LoggingConfig,
    PubSubConfig, SubhookConfig,
};
pub use validation::{validate_config, validate_pubsub_config};
