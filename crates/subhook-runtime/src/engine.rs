//! Activation engine.
//!
//! The engine owns the subscription registry and walks it, activating every
//! Pending descriptor against a [`SubscriberClient`]:
//!
//! ```text
//! discover*(plugins) ──► registry ──► activate_all ──► ActivationReport
//!                                         │
//!                                         ├─ Active?          skip
//!                                         ├─ topic set?       create_subscription (AlreadyExists is fine)
//!                                         └─ subscribe        store handle, mark Active
//! ```
//!
//! One descriptor failing never stops the others. Every backend call is bounded
//! by a timeout, and a cancellation token is checked before each descriptor.
//!
//! ```rust,ignore
//! let engine = ActivationEngine::new(client);
//! engine.discover_all(&plugins);
//! let report = engine.activate_all().await;
//! for (entry, error) in report.failed() {
//!     eprintln!("{}: {error}", entry.subscription);
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use parking_lot::RwLock;
use subhook_core::{
    ActivationError, ActivationResult, BackendResult, BoxedClient, BoxedProvider,
    SubscriptionDescriptor, SubscriptionHandle, SubscriptionRegistry, discover,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ActivationConfig;
use crate::report::{ActivationEntry, ActivationOutcome, ActivationReport};

/// Tuning for an [`ActivationEngine`].
#[derive(Debug, Clone)]
pub struct ActivationOptions {
    /// Upper bound for each provisioning or subscribe call.
    pub call_timeout: Duration,
    /// Checked before each descriptor is activated.
    pub cancellation: CancellationToken,
    /// Descriptors activated at once; 1 activates them one after another.
    pub max_concurrency: usize,
}

impl Default for ActivationOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            cancellation: CancellationToken::new(),
            max_concurrency: 1,
        }
    }
}

impl ActivationOptions {
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Values below 1 are treated as 1.
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }
}

impl From<&ActivationConfig> for ActivationOptions {
    fn from(config: &ActivationConfig) -> Self {
        Self::default()
            .with_call_timeout(config.call_timeout())
            .with_max_concurrency(config.max_concurrency)
    }
}

/// Discovers handlers and activates their subscriptions.
pub struct ActivationEngine {
    client: BoxedClient,
    registry: RwLock<SubscriptionRegistry>,
    options: ActivationOptions,
}

impl ActivationEngine {
    pub fn new(client: BoxedClient) -> Self {
        Self {
            client,
            registry: RwLock::new(SubscriptionRegistry::new()),
            options: ActivationOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ActivationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ActivationOptions {
        &self.options
    }

    pub fn client(&self) -> &BoxedClient {
        &self.client
    }

    // ─── Discovery ──────────────────────────────────────────────────────────

    /// Runs discovery on one plugin and registers the results.
    ///
    /// Returns how many descriptors were new; handlers seen before are
    /// skipped.
    pub fn discover(&self, plugin: &BoxedProvider) -> usize {
        let found = discover(plugin);
        let total = found.len();
        let added = self.registry.write().extend(found);
        if added < total {
            debug!(
                plugin  = plugin.plugin_name(),
                skipped = total - added,
                "Handlers already registered"
            );
        }
        added
    }

    /// Runs discovery on every plugin.
    pub fn discover_all<'a, I>(&self, plugins: I) -> usize
    where
        I: IntoIterator<Item = &'a BoxedProvider>,
    {
        plugins.into_iter().map(|p| self.discover(p)).sum()
    }

    /// Snapshot of the registry, in insertion order.
    pub fn descriptors(&self) -> Vec<Arc<SubscriptionDescriptor>> {
        self.registry.read().all()
    }

    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.read().is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.registry.read().active_count()
    }

    // ─── Activation ─────────────────────────────────────────────────────────

    /// Activates every Pending descriptor and reports what happened to each.
    ///
    /// Never fails as a whole. Active descriptors are skipped without a
    /// backend call, so calling this again only retries what failed.
    pub async fn activate_all(&self) -> ActivationReport {
        let snapshot = self.descriptors();
        info!(
            subscriptions = snapshot.len(),
            concurrency   = self.options.max_concurrency,
            "Activating pub/sub subscriptions"
        );

        let entries: Vec<ActivationEntry> = stream::iter(snapshot)
            .map(|descriptor| self.activate_entry(descriptor))
            .buffered(self.options.max_concurrency.max(1))
            .collect()
            .await;

        let report = ActivationReport::new(entries);
        if report.failed_count() > 0 || report.cancelled_count() > 0 {
            warn!(summary = %report, "Pub/sub activation incomplete");
        } else {
            info!(summary = %report, "Pub/sub activation finished");
        }
        report
    }

    async fn activate_entry(&self, descriptor: Arc<SubscriptionDescriptor>) -> ActivationEntry {
        let outcome = if self.options.cancellation.is_cancelled() {
            debug!(handler = %descriptor.id(), "Activation cancelled, leaving Pending");
            ActivationOutcome::Cancelled
        } else {
            self.activate_one(&descriptor).await
        };

        ActivationEntry {
            callback: descriptor.id(),
            subscription: format!("{}/{}", descriptor.project(), descriptor.subscription_name()),
            outcome,
        }
    }

    async fn activate_one(&self, descriptor: &SubscriptionDescriptor) -> ActivationOutcome {
        let slot = descriptor.begin_activation().await;
        if descriptor.is_retired() {
            debug!(handler = %descriptor.id(), "Descriptor reset before activation");
            return ActivationOutcome::Cancelled;
        }
        if slot.is_active() {
            debug!(handler = %descriptor.id(), "Subscription already active");
            return ActivationOutcome::AlreadyActive;
        }

        if !descriptor.tag().is_complete() {
            let err = ActivationError::InvalidTag {
                handler: descriptor.id().to_string(),
            };
            error!(handler = %descriptor.id(), error = %err, "Cannot activate subscription");
            return ActivationOutcome::Failed(err);
        }

        let project = descriptor.project();
        let subscription = self
            .client
            .subscription_path(project, descriptor.subscription_name());
        let topic = match descriptor.topic_name() {
            Some(topic) if descriptor.tag().provisions() => {
                Some(self.client.topic_path(project, topic))
            }
            _ => None,
        };
        slot.resolve_paths(subscription.clone(), topic.clone());

        match self
            .provision_and_subscribe(descriptor, &subscription, topic.as_deref())
            .await
        {
            Ok(handle) => {
                if !slot.complete(handle.clone()) {
                    warn!(
                        handler      = %descriptor.id(),
                        subscription = %subscription,
                        listener     = handle.id(),
                        "Registry reset during activation, cancelled new subscription"
                    );
                    return ActivationOutcome::Cancelled;
                }
                info!(
                    handler      = %descriptor.id(),
                    subscription = %subscription,
                    listener     = handle.id(),
                    "Subscribed"
                );
                ActivationOutcome::Activated(handle)
            }
            Err(err) => {
                error!(
                    handler      = %descriptor.id(),
                    subscription = %subscription,
                    topic        = topic.as_deref().unwrap_or("-"),
                    error        = %err,
                    "Failed to activate subscription"
                );
                ActivationOutcome::Failed(err)
            }
        }
    }

    async fn provision_and_subscribe(
        &self,
        descriptor: &SubscriptionDescriptor,
        subscription: &str,
        topic: Option<&str>,
    ) -> ActivationResult<SubscriptionHandle> {
        if let Some(topic) = topic {
            let created = self
                .bounded(
                    "create_subscription",
                    subscription,
                    self.client.create_subscription(subscription, topic),
                )
                .await?;
            match created {
                Ok(()) => info!(subscription, topic, "Created subscription"),
                Err(e) if e.is_already_exists() => {
                    debug!(subscription, topic, "Subscription already exists")
                }
                Err(source) => {
                    return Err(ActivationError::Provision {
                        subscription: subscription.to_string(),
                        topic: topic.to_string(),
                        source,
                    });
                }
            }
        }

        self.bounded(
            "subscribe",
            subscription,
            self.client
                .subscribe(subscription, descriptor.callback().clone()),
        )
        .await?
        .map_err(|source| ActivationError::Subscribe {
            subscription: subscription.to_string(),
            source,
        })
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        subscription: &str,
        call: impl Future<Output = BackendResult<T>>,
    ) -> ActivationResult<BackendResult<T>> {
        tokio::time::timeout(self.options.call_timeout, call)
            .await
            .map_err(|_| ActivationError::Timeout {
                operation,
                subscription: subscription.to_string(),
                timeout: self.options.call_timeout,
            })
    }

    // ─── Reset ──────────────────────────────────────────────────────────────

    /// Cancels every live subscription and clears the registry.
    ///
    /// Returns how many handles were cancelled. Drained descriptors are
    /// retired, so an activation still in flight cancels the subscription it
    /// obtains instead of keeping it. A following discover and activate cycle
    /// behaves like a fresh start.
    pub fn reset(&self) -> usize {
        let drained = self.registry.write().reset();
        let cancelled = drained
            .iter()
            .filter_map(|d| d.retire())
            .filter(|h| !h.is_cancelled())
            .inspect(SubscriptionHandle::cancel)
            .count();

        info!(
            descriptors = drained.len(),
            cancelled,
            "Pub/sub registry reset"
        );
        cancelled
    }
}
