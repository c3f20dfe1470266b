//! Messaging backend boundary.
//!
//! The core never speaks a wire protocol. It needs a [`SubscriberClient`] that
//! can build resource paths, create a subscription bound to a topic, and
//! register a callback against a subscription. Clients are built by a
//! [`SubscriberClientFactory`], optionally with explicit [`Credentials`].
//!
//! ```text
//! ActivationEngine ──► SubscriberClient ──► backend worker pool ──► Callback
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::credentials::Credentials;
use crate::error::BackendResult;
use crate::handler::Callback;

// =============================================================================
// Client
// =============================================================================

/// A connected subscriber client.
///
/// Callbacks passed to [`subscribe`](Self::subscribe) may be invoked
/// concurrently, many times in parallel, from workers the client owns.
#[async_trait]
pub trait SubscriberClient: Send + Sync {
    /// Builds the fully-qualified subscription path.
    fn subscription_path(&self, project: &str, subscription: &str) -> String {
        format!("projects/{project}/subscriptions/{subscription}")
    }

    /// Builds the fully-qualified topic path.
    fn topic_path(&self, project: &str, topic: &str) -> String {
        format!("projects/{project}/topics/{topic}")
    }

    /// Creates a subscription bound to a topic.
    ///
    /// Returns [`BackendError::AlreadyExists`](crate::BackendError::AlreadyExists)
    /// when the subscription is already there.
    async fn create_subscription(
        &self,
        subscription_path: &str,
        topic_path: &str,
    ) -> BackendResult<()>;

    /// Starts delivering messages from `subscription_path` to `callback`.
    ///
    /// Delivery stops once the returned handle is cancelled.
    ///
    /// The returned future may be dropped before it resolves, for example
    /// when the call times out. Implementations must not leave a live
    /// registration behind in that case: register only once the future
    /// resolves, or roll the registration back on drop. Otherwise a retry
    /// subscribes a second listener.
    async fn subscribe(
        &self,
        subscription_path: &str,
        callback: Callback,
    ) -> BackendResult<SubscriptionHandle>;
}

/// A shared subscriber client trait object.
pub type BoxedClient = Arc<dyn SubscriberClient>;

/// Builds subscriber clients.
///
/// `None` credentials means the client falls back to its ambient credential
/// discovery.
#[async_trait]
pub trait SubscriberClientFactory: Send + Sync {
    async fn connect(&self, credentials: Option<&Credentials>) -> BackendResult<BoxedClient>;
}

// =============================================================================
// Handle
// =============================================================================

/// Handle to one live callback registration.
///
/// Clones share the same cancellation state. Dropping a handle does not stop
/// delivery; call [`cancel`](Self::cancel).
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    id: String,
    subscription: String,
    token: CancellationToken,
}

impl SubscriptionHandle {
    /// Creates a handle for a new registration on `subscription`.
    pub fn new(id: impl Into<String>, subscription: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subscription: subscription.into(),
            token: CancellationToken::new(),
        }
    }

    /// Backend-assigned registration id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Fully-qualified path of the subscription this handle listens on.
    pub fn subscription(&self) -> &str {
        &self.subscription
    }

    /// Stops delivery for this registration.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the registration has been cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
