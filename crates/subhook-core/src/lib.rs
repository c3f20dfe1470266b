//! # Subhook Core
//!
//! Handler discovery and subscription bookkeeping for routing pub/sub
//! messages to bot plugin handlers.
//!
//! ## Building blocks
//!
//! - **Handler tag** ([`Subhook`]): the project / subscription / optional topic
//!   a handler receives from.
//! - **Callbacks** ([`Callback`], [`SubHandler`]): async plugin methods bound to
//!   their instance, identified by [`CallbackId`].
//! - **Discovery** ([`HandlerProvider`], [`discover`]): plugins list their
//!   tagged handlers; discovery turns them into descriptors.
//! - **Descriptors** ([`SubscriptionDescriptor`]): one intended subscription
//!   and its activation state.
//! - **Registry** ([`SubscriptionRegistry`]): descriptors deduplicated by
//!   callback identity.
//! - **Backend boundary** ([`SubscriberClient`], [`SubscriberClientFactory`]).
//!
//! Activation itself lives in `subhook-runtime`.

pub mod backend;
pub mod credentials;
pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod tag;

pub use backend::{BoxedClient, SubscriberClient, SubscriberClientFactory, SubscriptionHandle};
pub use credentials::{Credentials, SUBSCRIBER_AUDIENCE, ServiceAccountKey};
pub use descriptor::{ActivationSlot, ActivationState, SubscriptionDescriptor};
pub use discovery::{BoxedProvider, HandlerProvider, Handlers, TaggedHandler, discover};
pub use error::{ActivationError, ActivationResult, BackendError, BackendResult};
pub use handler::{Callback, CallbackId, HandlerFuture, HandlerOutcome, SubHandler};
pub use message::{Acknowledger, PubSubMessage};
pub use registry::SubscriptionRegistry;
pub use tag::{Subhook, subhook};

// Used by code generated from `#[subhooks]`.
#[doc(hidden)]
pub mod __private {
    pub use std::sync::Arc;
}
