//! Subhook Runtime - activation, configuration and logging.
//!
//! This crate provides:
//! - The activation engine (`ActivationEngine`) and its per-descriptor report
//! - The host-facing plugin (`PubSubPlugin`) with `SERVICE_ACCOUNT_JSON` handling
//! - Figment-based configuration loading
//! - Logging setup
//! - An in-memory backend (`MemoryPubSub`) for tests and local runs
//!
//! ```ignore
//! use subhook_runtime::{MemoryPubSub, PubSubPlugin};
//!
//! let pubsub = PubSubPlugin::new(MemoryPubSub::new());
//! pubsub.configure(&serde_json::Value::Null)?;
//! let report = pubsub.activate(&plugins).await?;
//! println!("{report}");
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod memory;
pub mod plugin;
pub mod report;

pub use config::{ConfigError, ConfigLoader, ConfigResult, PubSubConfig, SubhookConfig};
pub use engine::{ActivationEngine, ActivationOptions};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use memory::{MemoryPubSub, PublishReceipt};
pub use plugin::PubSubPlugin;
pub use report::{ActivationEntry, ActivationOutcome, ActivationReport};

pub use tokio_util::sync::CancellationToken;
pub use tracing;

/// Logging macros, re-exported for plugin code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
