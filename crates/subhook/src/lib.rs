//! # Subhook
//!
//! Route pub/sub subscriptions to bot plugin handlers.
//!
//! Plugins tag async methods with the subscription they want to receive from.
//! On activation every loaded plugin is scanned, one descriptor is recorded per
//! tagged handler, and each descriptor is registered with the messaging
//! backend. One bad subscription never keeps the others from starting.
//!
//! ```text
//! ┌──────────────┐  discover  ┌──────────┐  activate_all  ┌──────────────────┐
//! │ #[subhooks]  │───────────▶│ Registry │───────────────▶│ SubscriberClient │──▶ handlers
//! │   plugins    │            │          │                │   (backend)      │
//! └──────────────┘            └──────────┘                └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use subhook::prelude::*;
//!
//! struct Orders;
//!
//! #[subhooks]
//! impl Orders {
//!     #[subhook(project = "proj-1", subscription = "orders-sub")]
//!     async fn on_order(self: Arc<Self>, message: PubSubMessage) -> anyhow::Result<()> {
//!         info!(id = message.message_id(), "order received");
//!         message.ack();
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pubsub = PubSubPlugin::new(MemoryPubSub::new());
//!     pubsub.configure(&serde_json::json!({ "SERVICE_ACCOUNT_JSON": null }))?;
//!
//!     let plugins: Vec<BoxedProvider> = vec![Arc::new(Orders)];
//!     let report = pubsub.activate(&plugins).await?;
//!     println!("{report}");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `subhook.toml` configuration files
//! - `yaml-config`: `subhook.yaml` configuration files
//! - `json-log`: JSON log output

pub use subhook_core as core;
pub use subhook_macros::{subhook, subhooks};
pub use subhook_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use subhook::prelude::*;
/// ```
pub mod prelude {
    pub use std::sync::Arc;

    // Annotation surface
    pub use subhook_core::{Subhook, subhook};
    pub use subhook_macros::{subhook, subhooks};

    // Handlers
    pub use subhook_core::{BoxedProvider, HandlerProvider, Handlers, PubSubMessage, TaggedHandler};

    // Activation
    pub use subhook_runtime::{
        ActivationEngine, ActivationOptions, ActivationOutcome, ActivationReport, MemoryPubSub,
        PubSubPlugin,
    };

    // Backend boundary
    pub use subhook_core::{SubscriberClient, SubscriberClientFactory, SubscriptionHandle};

    // Logging macros
    pub use subhook_runtime::prelude::*;
}
