//! Handler discovery.
//!
//! Plugins advertise their subscription handlers through the
//! [`HandlerProvider`] trait instead of being probed at runtime. The
//! `#[subhooks]` attribute macro writes the impl for you; it can also be
//! written by hand with the [`Handlers`] builder:
//!
//! ```rust,ignore
//! impl HandlerProvider for Orders {
//!     fn plugin_name(&self) -> &str {
//!         "orders"
//!     }
//!
//!     fn subhooks(self: Arc<Self>) -> Vec<TaggedHandler> {
//!         Handlers::new(self)
//!             .add("on_order", subhook("proj-1", "orders-sub"), Self::on_order)
//!             .build()
//!     }
//! }
//! ```
//!
//! Plugins without handlers implement the trait with the defaults and are
//! simply skipped.

use std::sync::Arc;

use tracing::info;

use crate::descriptor::SubscriptionDescriptor;
use crate::handler::{Callback, SubHandler};
use crate::tag::Subhook;

/// A bound handler together with its tag.
#[derive(Debug, Clone)]
pub struct TaggedHandler {
    tag: Subhook,
    callback: Callback,
}

impl TaggedHandler {
    pub fn new(tag: Subhook, callback: Callback) -> Self {
        Self { tag, callback }
    }

    pub fn tag(&self) -> &Subhook {
        &self.tag
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    pub fn into_descriptor(self) -> SubscriptionDescriptor {
        SubscriptionDescriptor::new(self.tag, self.callback)
    }
}

/// Capability implemented by plugins that own subscription handlers.
pub trait HandlerProvider: Send + Sync + 'static {
    /// Name used in logs.
    fn plugin_name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Lists the tagged handlers, bound to this instance.
    fn subhooks(self: Arc<Self>) -> Vec<TaggedHandler> {
        Vec::new()
    }
}

/// A shared plugin trait object.
pub type BoxedProvider = Arc<dyn HandlerProvider>;

/// Builder for a plugin's handler table.
///
/// Adding the same method name twice keeps the last tag.
pub struct Handlers<P> {
    plugin: Arc<P>,
    entries: Vec<TaggedHandler>,
}

impl<P: Send + Sync + 'static> Handlers<P> {
    pub fn new(plugin: Arc<P>) -> Self {
        Self {
            plugin,
            entries: Vec::new(),
        }
    }

    /// Tags `handler` (the method named `method`) with `tag`.
    pub fn add<F, T>(mut self, method: &'static str, tag: Subhook, handler: F) -> Self
    where
        F: SubHandler<P, T>,
        T: 'static,
    {
        let entry = TaggedHandler::new(tag, Callback::bind(&self.plugin, method, handler));
        match self.entries.iter_mut().find(|e| e.callback.method() == method) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
        self
    }

    pub fn build(self) -> Vec<TaggedHandler> {
        self.entries
    }
}

/// Materializes one descriptor per tagged handler on `plugin`.
///
/// Never fails: a plugin with no handlers yields an empty list.
pub fn discover(plugin: &BoxedProvider) -> Vec<SubscriptionDescriptor> {
    let name = plugin.plugin_name().to_string();
    info!(plugin = %name, "Checking plugin for pub/sub hooks");

    Arc::clone(plugin)
        .subhooks()
        .into_iter()
        .map(|handler| {
            info!(
                plugin       = %name,
                handler      = handler.callback.method(),
                project      = handler.tag.project(),
                subscription = handler.tag.subscription(),
                topic        = handler.tag.topic().unwrap_or("-"),
                "Pub/sub routing handler"
            );
            handler.into_descriptor()
        })
        .collect()
}
