use std::sync::Arc;

use subhook::core::{SubscriptionRegistry, discover};
use subhook::prelude::*;

struct Shop;

#[subhooks(name = "shop")]
impl Shop {
    #[subhook(project = "proj-1", subscription = "orders-sub")]
    async fn on_order(self: Arc<Self>, message: PubSubMessage) {
        message.ack();
    }

    #[subhook(project = "proj-1", subscription = "orders-sub")]
    async fn on_order_audit(self: Arc<Self>, _message: PubSubMessage) {}

    #[subhook(project = "proj-1", subscription = "stale-sub")]
    #[subhook(project = "proj-2", subscription = "refunds-sub", topic = "refunds")]
    async fn on_refund(self: Arc<Self>) -> anyhow::Result<()> {
        Ok(())
    }

    // Untagged: bot command, not a subscription handler.
    #[allow(dead_code)]
    async fn status(self: Arc<Self>) -> &'static str {
        "ok"
    }
}

struct NoHooks;

impl HandlerProvider for NoHooks {}

fn shop() -> BoxedProvider {
    Arc::new(Shop)
}

#[test]
fn one_descriptor_per_tagged_handler() {
    let descriptors = discover(&shop());
    let mut methods: Vec<_> = descriptors.iter().map(|d| d.callback().method()).collect();
    methods.sort_unstable();
    assert_eq!(methods, ["on_order", "on_order_audit", "on_refund"]);
}

#[test]
fn plugin_without_hooks_yields_nothing() {
    let plugin: BoxedProvider = Arc::new(NoHooks);
    assert!(discover(&plugin).is_empty());
}

#[test]
fn plugin_name_from_attribute() {
    assert_eq!(shop().plugin_name(), "shop");
}

#[test]
fn order_handler_descriptor_fields() {
    let descriptors = discover(&shop());
    let order = descriptors
        .iter()
        .find(|d| d.callback().method() == "on_order")
        .expect("on_order discovered");

    assert_eq!(order.project(), "proj-1");
    assert_eq!(order.subscription_name(), "orders-sub");
    assert_eq!(order.topic_name(), None);
    assert_eq!(order.id().owner_type(), "Shop");
    assert!(!order.is_active());
    assert!(order.handle().is_none());
}

#[test]
fn last_applied_tag_wins() {
    let descriptors = discover(&shop());
    let refund = descriptors
        .iter()
        .find(|d| d.callback().method() == "on_refund")
        .expect("on_refund discovered");

    assert_eq!(refund.project(), "proj-2");
    assert_eq!(refund.subscription_name(), "refunds-sub");
    assert_eq!(refund.topic_name(), Some("refunds"));
}

#[test]
fn same_path_distinct_callbacks_stay_separate() {
    let mut registry = SubscriptionRegistry::new();
    registry.extend(discover(&shop()));

    let on_orders_sub = registry
        .all()
        .iter()
        .filter(|d| d.subscription_name() == "orders-sub")
        .count();
    assert_eq!(on_orders_sub, 2);
}

#[test]
fn discovering_twice_does_not_grow_registry() {
    let plugin = shop();
    let mut registry = SubscriptionRegistry::new();

    assert_eq!(registry.extend(discover(&plugin)), 3);
    assert_eq!(registry.extend(discover(&plugin)), 0);
    assert_eq!(registry.len(), 3);
}

#[test]
fn separate_instances_are_separate_handlers() {
    let mut registry = SubscriptionRegistry::new();
    registry.extend(discover(&shop()));
    registry.extend(discover(&shop()));
    assert_eq!(registry.len(), 6);
}

#[test]
fn reset_empties_registry() {
    let mut registry = SubscriptionRegistry::new();
    registry.extend(discover(&shop()));

    let drained = registry.reset();
    assert_eq!(drained.len(), 3);
    assert!(registry.all().is_empty());
}
