//! Subscription descriptors.
//!
//! A [`SubscriptionDescriptor`] records one intended subscription: the tag a
//! handler carries, the bound callback, and its activation state.
//!
//! # Identity
//!
//! Two descriptors are equal exactly when they hold the same callback (same
//! method on the same plugin instance). The resource path plays no part, so
//! two handlers may legitimately share one subscription, while the same
//! handler discovered twice collapses to one entry.
//!
//! # State machine
//!
//! ```text
//! new() ──► Pending ──activate (ok)──► Active
//!              └────activate (err)──► Pending
//! ```
//!
//! There is no way back from `Active`. A descriptor drained out of its
//! registry is *retired*: its handle is handed back for cancellation, and an
//! attempt that completes afterwards cancels its own handle instead of
//! storing it.

use std::fmt;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

use crate::backend::SubscriptionHandle;
use crate::handler::{Callback, CallbackId};
use crate::tag::Subhook;

/// Activation state of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// Not yet registered with the backend, or the last attempt failed.
    Pending,
    /// Registered; the descriptor holds a live [`SubscriptionHandle`].
    Active,
}

#[derive(Debug, Default)]
struct Registration {
    handle: Option<SubscriptionHandle>,
    retired: bool,
}

#[derive(Debug, Clone)]
struct ResolvedPaths {
    subscription: String,
    topic: Option<String>,
}

/// One (resource identity, callback) pair and its activation bookkeeping.
pub struct SubscriptionDescriptor {
    tag: Subhook,
    callback: Callback,
    paths: Mutex<Option<ResolvedPaths>>,
    registration: Mutex<Registration>,
    /// Held for the whole of an activation attempt.
    gate: tokio::sync::Mutex<()>,
}

impl SubscriptionDescriptor {
    /// Creates a pending descriptor.
    pub fn new(tag: Subhook, callback: Callback) -> Self {
        Self {
            tag,
            callback,
            paths: Mutex::new(None),
            registration: Mutex::new(Registration::default()),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn id(&self) -> CallbackId {
        self.callback.id()
    }

    pub fn tag(&self) -> &Subhook {
        &self.tag
    }

    pub fn project(&self) -> &str {
        self.tag.project()
    }

    pub fn subscription_name(&self) -> &str {
        self.tag.subscription()
    }

    pub fn topic_name(&self) -> Option<&str> {
        self.tag.topic()
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    /// Fully-qualified subscription path, once an activation attempt derived it.
    pub fn subscription_path(&self) -> Option<String> {
        self.paths.lock().as_ref().map(|p| p.subscription.clone())
    }

    /// Fully-qualified topic path, once derived and only when a topic is set.
    pub fn topic_path(&self) -> Option<String> {
        self.paths.lock().as_ref().and_then(|p| p.topic.clone())
    }

    pub fn state(&self) -> ActivationState {
        if self.registration.lock().handle.is_some() {
            ActivationState::Active
        } else {
            ActivationState::Pending
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == ActivationState::Active
    }

    /// The live registration handle, present only when Active.
    pub fn handle(&self) -> Option<SubscriptionHandle> {
        self.registration.lock().handle.clone()
    }

    /// Whether the descriptor was drained out of its registry.
    pub fn is_retired(&self) -> bool {
        self.registration.lock().retired
    }

    /// Marks the descriptor retired and takes its live handle, if any.
    ///
    /// Does not wait for an in-flight activation; that attempt sees the
    /// retirement when it completes.
    pub fn retire(&self) -> Option<SubscriptionHandle> {
        let mut registration = self.registration.lock();
        registration.retired = true;
        registration.handle.take()
    }

    /// Waits for exclusive access to this descriptor's activation state.
    ///
    /// Concurrent activation attempts on the same descriptor are serialized;
    /// the second one observes the first one's result.
    pub async fn begin_activation(&self) -> ActivationSlot<'_> {
        let guard = self.gate.lock().await;
        ActivationSlot {
            descriptor: self,
            _guard: guard,
        }
    }
}

impl PartialEq for SubscriptionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for SubscriptionDescriptor {}

impl Hash for SubscriptionDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for SubscriptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionDescriptor")
            .field("callback", &self.id())
            .field("tag", &self.tag)
            .field("state", &self.state())
            .finish()
    }
}

// ─── ActivationSlot ──────────────────────────────────────────────────────────

/// Exclusive access to one descriptor during an activation attempt.
pub struct ActivationSlot<'a> {
    descriptor: &'a SubscriptionDescriptor,
    _guard: tokio::sync::MutexGuard<'a, ()>,
}

impl ActivationSlot<'_> {
    pub fn descriptor(&self) -> &SubscriptionDescriptor {
        self.descriptor
    }

    pub fn is_active(&self) -> bool {
        self.descriptor.is_active()
    }

    /// Records the derived resource paths.
    pub fn resolve_paths(&self, subscription: String, topic: Option<String>) {
        *self.descriptor.paths.lock() = Some(ResolvedPaths {
            subscription,
            topic,
        });
    }

    /// Transitions the descriptor to Active with `handle`.
    ///
    /// Returns `false` and cancels `handle` when the descriptor was retired
    /// while the attempt was in flight.
    pub fn complete(self, handle: SubscriptionHandle) -> bool {
        let mut registration = self.descriptor.registration.lock();
        if registration.retired {
            handle.cancel();
            return false;
        }
        registration.handle = Some(handle);
        true
    }
}
