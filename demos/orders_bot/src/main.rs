//! Orders Bot
//!
//! Wires a plugin with two subscription handlers to the in-memory backend,
//! publishes a few orders and prints the activation report.
//!
//! ```bash
//! SUBHOOK_LOGGING__LEVEL=debug cargo run --package orders-bot
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use subhook::prelude::*;
use subhook::runtime::{ConfigLoader, logging};

const PROJECT: &str = "shop-prod";
const ORDERS_TOPIC: &str = "projects/shop-prod/topics/orders";

#[derive(Default)]
struct OrdersPlugin {
    revenue_cents: AtomicU64,
}

#[subhooks(name = "orders")]
impl OrdersPlugin {
    #[subhook(project = "shop-prod", subscription = "orders-bot", topic = "orders")]
    async fn on_order(self: Arc<Self>, message: PubSubMessage) -> Result<()> {
        let order: serde_json::Value = message.json().context("order payload")?;
        let cents = order["total_cents"].as_u64().context("missing total_cents")?;
        let total = self.revenue_cents.fetch_add(cents, Ordering::SeqCst) + cents;

        info!(
            order   = %order["id"],
            cents,
            running = total,
            "New order"
        );
        message.ack();
        Ok(())
    }

    #[subhook(project = "shop-prod", subscription = "orders-audit", topic = "orders")]
    async fn on_audit(self: Arc<Self>, message: PubSubMessage) {
        debug!(message_id = message.message_id(), "Audited");
        message.ack();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConfigLoader::new().load()?;
    logging::init_from_config(&config.logging);

    let backend = MemoryPubSub::new();
    backend.create_topic(ORDERS_TOPIC)?;

    let host = PubSubPlugin::from_config(backend.clone(), &config)?;

    let plugin = Arc::new(OrdersPlugin::default());
    let plugins: Vec<BoxedProvider> = vec![plugin.clone() as BoxedProvider];
    let report = host.activate(&plugins).await?;
    info!(project = PROJECT, summary = %report, "Subscriptions ready");

    for (id, cents) in [(1, 1250), (2, 399), (3, 10_000)] {
        let payload = serde_json::json!({ "id": id, "total_cents": cents });
        backend
            .publish(ORDERS_TOPIC, payload.to_string(), HashMap::new())?
            .delivered()
            .await;
    }

    println!(
        "revenue: {} cents, {} messages acked",
        plugin.revenue_cents.load(Ordering::SeqCst),
        backend.acked().len()
    );

    host.deactivate().await;
    Ok(())
}
