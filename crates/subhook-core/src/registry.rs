//! Deduplicating collection of subscription descriptors.

use std::collections::HashSet;
use std::sync::Arc;

use crate::descriptor::SubscriptionDescriptor;
use crate::handler::CallbackId;

/// Descriptors accumulated across all discovered plugins.
///
/// Insertion is idempotent by callback identity. Iteration follows insertion
/// order, which keeps activation logs stable within one run.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    entries: Vec<Arc<SubscriptionDescriptor>>,
    index: HashSet<CallbackId>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `descriptor` unless one with the same callback is present.
    ///
    /// Returns `true` when the descriptor was new.
    pub fn insert(&mut self, descriptor: SubscriptionDescriptor) -> bool {
        if !self.index.insert(descriptor.id()) {
            return false;
        }
        self.entries.push(Arc::new(descriptor));
        true
    }

    /// Inserts every descriptor, returning how many were new.
    pub fn extend<I>(&mut self, descriptors: I) -> usize
    where
        I: IntoIterator<Item = SubscriptionDescriptor>,
    {
        let mut added = 0;
        for descriptor in descriptors {
            if self.insert(descriptor) {
                added += 1;
            }
        }
        added
    }

    /// Empties the registry regardless of activation state.
    ///
    /// Live backend registrations are **not** cancelled here; the drained
    /// descriptors are returned so the caller can tear them down.
    pub fn reset(&mut self) -> Vec<Arc<SubscriptionDescriptor>> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }

    /// Snapshot of all descriptors, in insertion order.
    pub fn all(&self) -> Vec<Arc<SubscriptionDescriptor>> {
        self.entries.clone()
    }

    pub fn get(&self, id: CallbackId) -> Option<Arc<SubscriptionDescriptor>> {
        self.entries.iter().find(|d| d.id() == id).cloned()
    }

    pub fn contains(&self, id: CallbackId) -> bool {
        self.index.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of descriptors currently Active.
    pub fn active_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_active()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Callback;
    use crate::message::PubSubMessage;
    use crate::tag::subhook;

    struct Orders;

    impl Orders {
        async fn on_order(self: Arc<Self>, _message: PubSubMessage) {}
        async fn on_audit(self: Arc<Self>, _message: PubSubMessage) {}
    }

    fn order_descriptor(plugin: &Arc<Orders>) -> SubscriptionDescriptor {
        SubscriptionDescriptor::new(
            subhook("proj-1", "orders-sub"),
            Callback::bind(plugin, "on_order", Orders::on_order),
        )
    }

    #[test]
    fn test_insert_is_idempotent_by_callback() {
        let plugin = Arc::new(Orders);
        let mut registry = SubscriptionRegistry::new();

        assert!(registry.insert(order_descriptor(&plugin)));
        assert!(!registry.insert(order_descriptor(&plugin)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_path_distinct_callbacks_are_kept() {
        let plugin = Arc::new(Orders);
        let mut registry = SubscriptionRegistry::new();

        let added = registry.extend([
            order_descriptor(&plugin),
            SubscriptionDescriptor::new(
                subhook("proj-1", "orders-sub"),
                Callback::bind(&plugin, "on_audit", Orders::on_audit),
            ),
            order_descriptor(&plugin),
        ]);

        assert_eq!(added, 2);
        assert_eq!(registry.len(), 2);
        let methods: Vec<_> = registry.all().iter().map(|d| d.id().method()).collect();
        assert_eq!(methods, ["on_order", "on_audit"]);
    }

    #[test]
    fn test_reset_empties_registry() {
        let plugin = Arc::new(Orders);
        let mut registry = SubscriptionRegistry::new();
        registry.insert(order_descriptor(&plugin));

        let drained = registry.reset();
        assert_eq!(drained.len(), 1);
        assert!(registry.all().is_empty());
        assert!(registry.is_empty());

        assert!(registry.insert(order_descriptor(&plugin)));
    }
}
