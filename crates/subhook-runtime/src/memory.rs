//! In-process messaging backend.
//!
//! [`MemoryPubSub`] keeps topics and subscriptions in memory and delivers
//! published messages to registered callbacks on tokio tasks. It implements
//! both [`SubscriberClient`] and [`SubscriberClientFactory`], so it can stand
//! in for a real backend in tests and local runs.
//!
//! ```text
//! publish(topic) ──► one copy per bound subscription
//!                       └─► next live listener (round-robin) ──► tokio::spawn(callback)
//! ```
//!
//! Messages published while a subscription has no live listener are kept and
//! handed to the next listener that subscribes.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use subhook_core::{
    Acknowledger, BackendError, BackendResult, BoxedClient, Callback, Credentials, PubSubMessage,
    SubscriberClient, SubscriberClientFactory, SubscriptionHandle,
};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// In-memory pub/sub backend. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryPubSub {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    state: Mutex<State>,
    faults: Mutex<Faults>,
    ledger: Arc<AckLedger>,
    credentials: Mutex<Option<Credentials>>,
    connect_calls: AtomicUsize,
    create_calls: AtomicUsize,
    subscribe_calls: AtomicUsize,
    next_id: AtomicU64,
}

#[derive(Default)]
struct State {
    topics: HashSet<String>,
    subscriptions: HashMap<String, SubscriptionState>,
}

struct SubscriptionState {
    topic: String,
    listeners: Vec<Listener>,
    cursor: usize,
    backlog: VecDeque<PubSubMessage>,
}

struct Listener {
    handle: SubscriptionHandle,
    callback: Callback,
}

#[derive(Default)]
struct Faults {
    connect: Option<BackendError>,
    create: HashMap<String, BackendError>,
    subscribe: HashMap<String, BackendError>,
    delay: Option<Duration>,
}

/// Records ack / nack decisions by ack id (`<subscription>#<message id>`).
#[derive(Default)]
struct AckLedger {
    acked: Mutex<Vec<String>>,
    nacked: Mutex<Vec<String>>,
}

impl Acknowledger for AckLedger {
    fn ack(&self, ack_id: &str) {
        self.acked.lock().push(ack_id.to_string());
    }

    fn nack(&self, ack_id: &str) {
        self.nacked.lock().push(ack_id.to_string());
    }
}

/// Result of [`MemoryPubSub::publish`].
#[derive(Debug)]
pub struct PublishReceipt {
    message_id: String,
    deliveries: Vec<JoinHandle<()>>,
}

impl PublishReceipt {
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Number of callbacks the message was dispatched to right away.
    pub fn dispatched(&self) -> usize {
        self.deliveries.len()
    }

    /// Waits for every dispatched callback to finish, returning how many ran
    /// to completion.
    pub async fn delivered(self) -> usize {
        futures::future::join_all(self.deliveries)
            .await
            .into_iter()
            .filter(Result::is_ok)
            .count()
    }
}

impl MemoryPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Resources ──────────────────────────────────────────────────────────

    /// Creates a topic. Fails with `AlreadyExists` when it is already there.
    pub fn create_topic(&self, topic_path: &str) -> BackendResult<()> {
        let mut state = self.inner.state.lock();
        if !state.topics.insert(topic_path.to_string()) {
            return Err(BackendError::AlreadyExists(topic_path.to_string()));
        }
        debug!(topic = topic_path, "Created topic");
        Ok(())
    }

    /// Creates the topic and the subscription if missing, without touching
    /// call counters or fault injection.
    pub fn ensure_subscription(&self, subscription_path: &str, topic_path: &str) {
        let mut state = self.inner.state.lock();
        state.topics.insert(topic_path.to_string());
        state
            .subscriptions
            .entry(subscription_path.to_string())
            .or_insert_with(|| SubscriptionState::new(topic_path));
    }

    pub fn has_topic(&self, topic_path: &str) -> bool {
        self.inner.state.lock().topics.contains(topic_path)
    }

    pub fn has_subscription(&self, subscription_path: &str) -> bool {
        self.inner
            .state
            .lock()
            .subscriptions
            .contains_key(subscription_path)
    }

    /// Live (not cancelled) listeners on a subscription.
    pub fn listener_count(&self, subscription_path: &str) -> usize {
        self.inner
            .state
            .lock()
            .subscriptions
            .get(subscription_path)
            .map_or(0, |s| {
                s.listeners
                    .iter()
                    .filter(|l| !l.handle.is_cancelled())
                    .count()
            })
    }

    /// Messages waiting for a listener on a subscription.
    pub fn backlog_len(&self, subscription_path: &str) -> usize {
        self.inner
            .state
            .lock()
            .subscriptions
            .get(subscription_path)
            .map_or(0, |s| s.backlog.len())
    }

    // ─── Publishing ─────────────────────────────────────────────────────────

    /// Publishes `data` to a topic, fanning out one copy per subscription.
    ///
    /// Must be called from within a tokio runtime.
    pub fn publish(
        &self,
        topic_path: &str,
        data: impl Into<Vec<u8>>,
        attributes: HashMap<String, String>,
    ) -> BackendResult<PublishReceipt> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        let data = data.into();
        let message_id = self.next_id("msg");

        let mut state = self.inner.state.lock();
        if !state.topics.contains(topic_path) {
            return Err(BackendError::NotFound(topic_path.to_string()));
        }

        let mut deliveries = Vec::new();
        for (path, sub) in state
            .subscriptions
            .iter_mut()
            .filter(|(_, s)| s.topic == topic_path)
        {
            let message = PubSubMessage::new(message_id.clone(), data.clone())
                .with_attributes(attributes.clone())
                .with_acknowledger(format!("{path}#{message_id}"), self.acknowledger());

            match sub.next_listener() {
                Some(callback) => {
                    trace!(subscription = %path, message_id = %message_id, "Dispatching message");
                    deliveries.push(runtime.spawn(callback.call(message)));
                }
                None => {
                    trace!(subscription = %path, message_id = %message_id, "No listener, queueing");
                    sub.backlog.push_back(message);
                }
            }
        }

        Ok(PublishReceipt {
            message_id,
            deliveries,
        })
    }

    // ─── Acknowledgments ────────────────────────────────────────────────────

    /// Ack ids acknowledged so far, in order.
    pub fn acked(&self) -> Vec<String> {
        self.inner.ledger.acked.lock().clone()
    }

    /// Ack ids negatively acknowledged so far, in order.
    pub fn nacked(&self) -> Vec<String> {
        self.inner.ledger.nacked.lock().clone()
    }

    // ─── Fault injection ────────────────────────────────────────────────────

    /// Makes `connect` fail with `error`.
    pub fn fail_connect(&self, error: BackendError) {
        self.inner.faults.lock().connect = Some(error);
    }

    /// Makes `create_subscription` on this path fail with `error`.
    pub fn fail_create(&self, subscription_path: &str, error: BackendError) {
        self.inner
            .faults
            .lock()
            .create
            .insert(subscription_path.to_string(), error);
    }

    /// Makes `subscribe` on this path fail with `error`.
    pub fn fail_subscribe(&self, subscription_path: &str, error: BackendError) {
        self.inner
            .faults
            .lock()
            .subscribe
            .insert(subscription_path.to_string(), error);
    }

    /// Delays every `create_subscription` and `subscribe` call.
    pub fn delay_calls(&self, delay: Duration) {
        self.inner.faults.lock().delay = Some(delay);
    }

    pub fn clear_faults(&self) {
        *self.inner.faults.lock() = Faults::default();
    }

    // ─── Call counters ──────────────────────────────────────────────────────

    pub fn connect_calls(&self) -> usize {
        self.inner.connect_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.inner.create_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe_calls(&self) -> usize {
        self.inner.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Credentials passed to the most recent `connect`.
    pub fn last_credentials(&self) -> Option<Credentials> {
        self.inner.credentials.lock().clone()
    }

    fn acknowledger(&self) -> Arc<dyn Acknowledger> {
        self.inner.ledger.clone()
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }

    async fn injected_delay(&self) {
        let delay = self.inner.faults.lock().delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl SubscriptionState {
    fn new(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            listeners: Vec::new(),
            cursor: 0,
            backlog: VecDeque::new(),
        }
    }

    /// Drops cancelled listeners and picks the next live one.
    fn next_listener(&mut self) -> Option<Callback> {
        self.listeners.retain(|l| !l.handle.is_cancelled());
        if self.listeners.is_empty() {
            return None;
        }
        let index = self.cursor % self.listeners.len();
        self.cursor = self.cursor.wrapping_add(1);
        Some(self.listeners[index].callback.clone())
    }
}

#[async_trait]
impl SubscriberClient for MemoryPubSub {
    async fn create_subscription(
        &self,
        subscription_path: &str,
        topic_path: &str,
    ) -> BackendResult<()> {
        self.inner.create_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_delay().await;

        if let Some(error) = self.inner.faults.lock().create.get(subscription_path) {
            return Err(error.clone());
        }

        let mut state = self.inner.state.lock();
        if state.subscriptions.contains_key(subscription_path) {
            return Err(BackendError::AlreadyExists(subscription_path.to_string()));
        }
        if !state.topics.contains(topic_path) {
            return Err(BackendError::NotFound(topic_path.to_string()));
        }
        state.subscriptions.insert(
            subscription_path.to_string(),
            SubscriptionState::new(topic_path),
        );
        debug!(subscription = subscription_path, topic = topic_path, "Created subscription");
        Ok(())
    }

    async fn subscribe(
        &self,
        subscription_path: &str,
        callback: Callback,
    ) -> BackendResult<SubscriptionHandle> {
        self.inner.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_delay().await;

        if let Some(error) = self.inner.faults.lock().subscribe.get(subscription_path) {
            return Err(error.clone());
        }

        let handle = SubscriptionHandle::new(self.next_id("listener"), subscription_path);
        let mut state = self.inner.state.lock();
        let sub = state
            .subscriptions
            .get_mut(subscription_path)
            .ok_or_else(|| BackendError::NotFound(subscription_path.to_string()))?;

        if !sub.backlog.is_empty() {
            let runtime = tokio::runtime::Handle::try_current()
                .map_err(|e| BackendError::Unavailable(e.to_string()))?;
            for message in sub.backlog.drain(..) {
                runtime.spawn(callback.call(message));
            }
        }

        sub.listeners.push(Listener {
            handle: handle.clone(),
            callback,
        });
        debug!(
            subscription = subscription_path,
            listener = handle.id(),
            "Registered listener"
        );
        Ok(handle)
    }
}

#[async_trait]
impl SubscriberClientFactory for MemoryPubSub {
    async fn connect(&self, credentials: Option<&Credentials>) -> BackendResult<BoxedClient> {
        self.inner.connect_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.inner.faults.lock().connect.clone() {
            return Err(error);
        }
        *self.inner.credentials.lock() = credentials.cloned();
        Ok(Arc::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    const TOPIC: &str = "projects/p/topics/t";
    const SUB: &str = "projects/p/subscriptions/s";

    struct Counter {
        seen: AtomicUsize,
    }

    impl Counter {
        async fn on_message(self: Arc<Self>, message: PubSubMessage) {
            self.seen.fetch_add(1, Ordering::SeqCst);
            message.ack();
        }

        async fn on_other(self: Arc<Self>, message: PubSubMessage) {
            self.seen.fetch_add(100, Ordering::SeqCst);
            message.nack();
        }
    }

    fn counter() -> Arc<Counter> {
        Arc::new(Counter {
            seen: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_create_subscription_conflicts() {
        let pubsub = MemoryPubSub::new();
        pubsub.create_topic(TOPIC).unwrap();

        pubsub.create_subscription(SUB, TOPIC).await.unwrap();
        let again = pubsub.create_subscription(SUB, TOPIC).await;
        assert!(matches!(again, Err(BackendError::AlreadyExists(_))));

        let missing_topic = pubsub
            .create_subscription("projects/p/subscriptions/x", "projects/p/topics/none")
            .await;
        assert!(matches!(missing_topic, Err(BackendError::NotFound(_))));
        assert_eq!(pubsub.create_calls(), 3);
    }

    #[tokio::test]
    async fn test_publish_round_robin_and_ack() {
        let pubsub = MemoryPubSub::new();
        pubsub.ensure_subscription(SUB, TOPIC);

        let plugin = counter();
        let first = Callback::bind(&plugin, "on_message", Counter::on_message);
        let second = Callback::bind(&plugin, "on_other", Counter::on_other);
        pubsub.subscribe(SUB, first).await.unwrap();
        pubsub.subscribe(SUB, second).await.unwrap();

        for _ in 0..2 {
            let receipt = pubsub.publish(TOPIC, b"hi".to_vec(), HashMap::new()).unwrap();
            assert_eq!(receipt.dispatched(), 1);
            assert_eq!(receipt.delivered().await, 1);
        }

        assert_eq!(plugin.seen.load(Ordering::SeqCst), 101);
        assert_eq!(pubsub.acked().len(), 1);
        assert_eq!(pubsub.nacked().len(), 1);
        assert!(pubsub.acked()[0].starts_with(SUB));
    }

    #[tokio::test]
    async fn test_cancelled_listener_stops_receiving() {
        let pubsub = MemoryPubSub::new();
        pubsub.ensure_subscription(SUB, TOPIC);

        let plugin = counter();
        let handle = pubsub
            .subscribe(SUB, Callback::bind(&plugin, "on_message", Counter::on_message))
            .await
            .unwrap();
        assert_eq!(pubsub.listener_count(SUB), 1);

        handle.cancel();
        assert_eq!(pubsub.listener_count(SUB), 0);

        let receipt = pubsub.publish(TOPIC, b"late".to_vec(), HashMap::new()).unwrap();
        assert_eq!(receipt.dispatched(), 0);
        assert_eq!(pubsub.backlog_len(SUB), 1);
        assert_eq!(plugin.seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backlog_flushed_on_subscribe() {
        let pubsub = MemoryPubSub::new();
        pubsub.ensure_subscription(SUB, TOPIC);
        pubsub.publish(TOPIC, b"early".to_vec(), HashMap::new()).unwrap();

        let plugin = counter();
        pubsub
            .subscribe(SUB, Callback::bind(&plugin, "on_message", Counter::on_message))
            .await
            .unwrap();
        assert_eq!(pubsub.backlog_len(SUB), 0);

        for _ in 0..50 {
            if plugin.seen.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(plugin.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fault_injection() {
        let pubsub = MemoryPubSub::new();
        pubsub.ensure_subscription(SUB, TOPIC);
        pubsub.fail_subscribe(SUB, BackendError::PermissionDenied("nope".into()));

        let plugin = counter();
        let result = pubsub
            .subscribe(SUB, Callback::bind(&plugin, "on_message", Counter::on_message))
            .await;
        assert_eq!(
            result.err(),
            Some(BackendError::PermissionDenied("nope".into()))
        );

        pubsub.clear_faults();
        assert!(
            pubsub
                .subscribe(SUB, Callback::bind(&plugin, "on_message", Counter::on_message))
                .await
                .is_ok()
        );
        assert_eq!(pubsub.subscribe_calls(), 2);
    }

    #[test]
    fn test_publish_outside_runtime() {
        let pubsub = MemoryPubSub::new();
        pubsub.create_topic(TOPIC).unwrap();
        let result = pubsub.publish(TOPIC, b"x".to_vec(), HashMap::new());
        assert!(matches!(result, Err(BackendError::Unavailable(_))));
    }

    #[test]
    fn test_connect_records_credentials() {
        let pubsub = MemoryPubSub::new();
        let client = tokio_test::block_on(pubsub.connect(None));
        tokio_test::assert_ok!(client);
        assert_eq!(pubsub.connect_calls(), 1);
        assert!(pubsub.last_credentials().is_none());

        pubsub.fail_connect(BackendError::Unavailable("down".into()));
        assert!(tokio_test::block_on(pubsub.connect(None)).is_err());
    }
}
