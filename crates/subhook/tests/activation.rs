use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde::Deserialize;
use subhook::core::{ActivationError, ActivationState, BackendError};
use subhook::prelude::*;
use subhook::runtime::CancellationToken;

const ORDERS_TOPIC: &str = "projects/proj-1/topics/orders";
const ORDERS_SUB: &str = "projects/proj-1/subscriptions/orders-sub";
const ARCHIVE_SUB: &str = "projects/proj-1/subscriptions/archive-sub";
const AUDIT_SUB: &str = "projects/proj-1/subscriptions/audit-sub";

#[derive(Deserialize)]
struct Order {
    id: u64,
}

#[derive(Default)]
struct Shop {
    orders: AtomicUsize,
    archived: AtomicUsize,
    audits: AtomicUsize,
}

#[subhooks]
impl Shop {
    #[subhook(project = "proj-1", subscription = "orders-sub")]
    async fn on_order(self: Arc<Self>, message: PubSubMessage) -> anyhow::Result<()> {
        let order: Order = message.json()?;
        anyhow::ensure!(order.id > 0, "order id must be positive");
        self.orders.fetch_add(1, Ordering::SeqCst);
        message.ack();
        Ok(())
    }

    #[subhook(project = "proj-1", subscription = "archive-sub")]
    async fn on_archive(self: Arc<Self>, message: PubSubMessage) {
        self.archived.fetch_add(1, Ordering::SeqCst);
        message.ack();
    }

    #[subhook(project = "proj-1", subscription = "audit-sub", topic = "orders")]
    async fn on_audit(self: Arc<Self>) {
        self.audits.fetch_add(1, Ordering::SeqCst);
    }
}

fn backend() -> MemoryPubSub {
    let pubsub = MemoryPubSub::new();
    pubsub.ensure_subscription(ORDERS_SUB, ORDERS_TOPIC);
    pubsub.ensure_subscription(ARCHIVE_SUB, ORDERS_TOPIC);
    pubsub
}

fn new_engine(pubsub: &MemoryPubSub) -> ActivationEngine {
    ActivationEngine::new(Arc::new(pubsub.clone()))
}

#[tokio::test]
async fn activation_marks_descriptors_active() -> anyhow::Result<()> {
    let pubsub = backend();
    let engine = new_engine(&pubsub);
    let plugin: BoxedProvider = Arc::new(Shop::default());
    engine.discover(&plugin);

    let report = engine.activate_all().await;
    assert!(report.is_complete(), "{report}");

    let descriptors = engine.descriptors();
    let order = descriptors
        .iter()
        .find(|d| d.callback().method() == "on_order")
        .expect("on_order registered");
    assert_eq!(order.state(), ActivationState::Active);
    assert_eq!(order.subscription_path().as_deref(), Some(ORDERS_SUB));
    let handle = order.handle().expect("active descriptor has a handle");
    assert_eq!(handle.subscription(), ORDERS_SUB);
    Ok(())
}

#[tokio::test]
async fn second_activation_makes_no_backend_calls() {
    let pubsub = backend();
    let engine = new_engine(&pubsub);
    engine.discover(&(Arc::new(Shop::default()) as BoxedProvider));

    engine.activate_all().await;
    let (creates, subscribes) = (pubsub.create_calls(), pubsub.subscribe_calls());

    let report = engine.activate_all().await;
    assert_eq!(report.already_active_count(), 3);
    assert_eq!(pubsub.create_calls(), creates);
    assert_eq!(pubsub.subscribe_calls(), subscribes);
}

#[tokio::test]
async fn one_failure_does_not_block_others() {
    let pubsub = backend();
    pubsub.fail_subscribe(ORDERS_SUB, BackendError::PermissionDenied("orders".into()));
    let engine = new_engine(&pubsub);
    engine.discover(&(Arc::new(Shop::default()) as BoxedProvider));

    let report = engine.activate_all().await;
    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.activated_count(), 2);

    for descriptor in engine.descriptors() {
        let expected = descriptor.callback().method() != "on_order";
        assert_eq!(descriptor.is_active(), expected, "{descriptor:?}");
    }
}

#[tokio::test]
async fn existing_subscription_is_not_a_failure() {
    let pubsub = backend();
    pubsub.ensure_subscription(AUDIT_SUB, ORDERS_TOPIC);
    let engine = new_engine(&pubsub);
    engine.discover(&(Arc::new(Shop::default()) as BoxedProvider));

    let report = engine.activate_all().await;
    assert!(report.is_complete(), "{report}");
    assert_eq!(pubsub.create_calls(), 1);

    let audit = engine
        .descriptors()
        .into_iter()
        .find(|d| d.callback().method() == "on_audit")
        .expect("on_audit registered");
    assert!(audit.is_active());
    assert_eq!(audit.topic_path().as_deref(), Some(ORDERS_TOPIC));
}

#[tokio::test]
async fn reset_then_fresh_cycle() {
    let pubsub = backend();
    let engine = new_engine(&pubsub);
    let plugin: BoxedProvider = Arc::new(Shop::default());

    engine.discover(&plugin);
    let first = engine.activate_all().await;

    assert_eq!(engine.reset(), 3);
    assert!(engine.descriptors().is_empty());
    assert_eq!(pubsub.listener_count(ORDERS_SUB), 0);

    engine.discover(&plugin);
    let second = engine.activate_all().await;
    assert_eq!(second.len(), first.len());
    assert_eq!(second.activated_count(), first.activated_count());
    assert_eq!(pubsub.listener_count(ORDERS_SUB), 1);
}

#[tokio::test]
async fn messages_reach_handlers() -> anyhow::Result<()> {
    let pubsub = backend();
    let engine = new_engine(&pubsub);
    let shop = Arc::new(Shop::default());
    engine.discover(&(Arc::clone(&shop) as BoxedProvider));
    engine.activate_all().await;

    let receipt = pubsub.publish(ORDERS_TOPIC, br#"{"id": 7}"#.to_vec(), HashMap::new())?;
    assert_eq!(receipt.dispatched(), 3);
    assert_eq!(receipt.delivered().await, 3);

    assert_eq!(shop.orders.load(Ordering::SeqCst), 1);
    assert_eq!(shop.archived.load(Ordering::SeqCst), 1);
    assert_eq!(shop.audits.load(Ordering::SeqCst), 1);
    assert_eq!(pubsub.acked().len(), 2);
    Ok(())
}

#[tokio::test]
async fn handler_error_is_contained() -> anyhow::Result<()> {
    let pubsub = backend();
    let engine = new_engine(&pubsub);
    let shop = Arc::new(Shop::default());
    engine.discover(&(Arc::clone(&shop) as BoxedProvider));
    engine.activate_all().await;

    let receipt = pubsub.publish(ORDERS_TOPIC, b"not json".to_vec(), HashMap::new())?;
    assert_eq!(receipt.delivered().await, 3);

    assert_eq!(shop.orders.load(Ordering::SeqCst), 0);
    assert_eq!(shop.archived.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn timeouts_and_cancellation_leave_pending() {
    let pubsub = backend();
    pubsub.delay_calls(Duration::from_millis(200));
    let engine = new_engine(&pubsub)
        .with_options(ActivationOptions::default().with_call_timeout(Duration::from_millis(10)));
    engine.discover(&(Arc::new(Shop::default()) as BoxedProvider));

    let report = engine.activate_all().await;
    assert_eq!(report.failed_count(), 3);
    assert!(matches!(
        report.entries()[0].outcome,
        ActivationOutcome::Failed(ActivationError::Timeout { operation: "subscribe", .. })
    ));

    let token = CancellationToken::new();
    token.cancel();
    pubsub.clear_faults();
    let engine = new_engine(&pubsub).with_options(ActivationOptions::default().with_cancellation(token));
    engine.discover(&(Arc::new(Shop::default()) as BoxedProvider));

    let report = engine.activate_all().await;
    assert_eq!(report.cancelled_count(), 3);
    assert_eq!(engine.active_count(), 0);
}

#[tokio::test]
async fn host_plugin_end_to_end() -> anyhow::Result<()> {
    let pubsub = backend();
    let host = PubSubPlugin::new(pubsub.clone());
    host.configure(&PubSubPlugin::configuration_template())?;

    let shop = Arc::new(Shop::default());
    let plugins: Vec<BoxedProvider> = vec![Arc::clone(&shop) as BoxedProvider];
    let report = host.activate(&plugins).await?;
    assert!(report.is_complete(), "{report}");
    assert!(pubsub.last_credentials().is_none());

    pubsub
        .publish(ORDERS_TOPIC, br#"{"id": 1}"#.to_vec(), HashMap::new())?
        .delivered()
        .await;
    assert_eq!(shop.orders.load(Ordering::SeqCst), 1);

    assert_eq!(host.reset_pubsub().await, 3);
    assert_eq!(pubsub.listener_count(ORDERS_SUB), 0);
    Ok(())
}
