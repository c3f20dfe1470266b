//! Subscription callbacks.
//!
//! Plugin authors write ordinary async methods with an `Arc<Self>` receiver.
//! [`SubHandler`] is implemented for those shapes, in the same way the
//! framework's event handlers are implemented per arity:
//!
//! ```rust,ignore
//! impl Orders {
//!     // one-argument handler
//!     async fn on_order(self: Arc<Self>, message: PubSubMessage) {
//!         message.ack();
//!     }
//!
//!     // zero-argument handler, fallible
//!     async fn on_tick(self: Arc<Self>) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//! ```
//!
//! [`Callback::bind`] turns such a method plus its plugin instance into a
//! type-erased [`Callback`] with a stable [`CallbackId`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::error;

use crate::message::PubSubMessage;

// ─── HandlerOutcome ──────────────────────────────────────────────────────────

/// Return types a subscription handler may have.
pub trait HandlerOutcome: Send {
    /// Collapses the value into success or a printable error.
    fn into_outcome(self) -> Result<(), String>;
}

impl HandlerOutcome for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: fmt::Display + Send> HandlerOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

// ─── SubHandler ──────────────────────────────────────────────────────────────

/// Future returned by [`SubHandler::invoke`].
pub type HandlerFuture = BoxFuture<'static, Result<(), String>>;

/// An async function that can receive messages on behalf of plugin `P`.
///
/// `T` only disambiguates the arity; it is inferred at the call site.
pub trait SubHandler<P, T>: Clone + Send + Sync + 'static {
    /// Runs the handler for one message.
    fn invoke(&self, plugin: Arc<P>, message: PubSubMessage) -> HandlerFuture;
}

impl<P, F, Fut, Out> SubHandler<P, ()> for F
where
    P: Send + Sync + 'static,
    F: Fn(Arc<P>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send + 'static,
    Out: HandlerOutcome + 'static,
{
    fn invoke(&self, plugin: Arc<P>, _message: PubSubMessage) -> HandlerFuture {
        let fut = (self)(plugin);
        async move { fut.await.into_outcome() }.boxed()
    }
}

impl<P, F, Fut, Out> SubHandler<P, (PubSubMessage,)> for F
where
    P: Send + Sync + 'static,
    F: Fn(Arc<P>, PubSubMessage) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Out> + Send + 'static,
    Out: HandlerOutcome + 'static,
{
    fn invoke(&self, plugin: Arc<P>, message: PubSubMessage) -> HandlerFuture {
        let fut = (self)(plugin, message);
        async move { fut.await.into_outcome() }.boxed()
    }
}

// ─── CallbackId ──────────────────────────────────────────────────────────────

/// Identity of a bound handler: one method on one plugin instance.
///
/// `owner` is the address of the plugin's `Arc` allocation. Every [`Callback`]
/// keeps that allocation alive, so the address cannot be reused by another
/// instance while a callback carrying this id exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId {
    owner: usize,
    owner_type: &'static str,
    method: &'static str,
}

impl CallbackId {
    /// Short type name of the owning plugin.
    pub fn owner_type(&self) -> &'static str {
        self.owner_type
    }

    /// Name of the tagged method.
    pub fn method(&self) -> &'static str {
        self.method
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}@{:#x}", self.owner_type, self.method, self.owner)
    }
}

// ─── Callback ────────────────────────────────────────────────────────────────

type ErasedCallback = dyn Fn(PubSubMessage) -> BoxFuture<'static, ()> + Send + Sync;

/// A handler bound to its plugin instance, ready to be registered with a
/// backend.
///
/// Cloning is cheap and every clone shares the same [`CallbackId`]. The
/// callback may be invoked concurrently from any number of backend workers.
#[derive(Clone)]
pub struct Callback {
    id: CallbackId,
    func: Arc<ErasedCallback>,
}

impl Callback {
    /// Binds `handler` to `plugin` under the method name `method`.
    pub fn bind<P, F, T>(plugin: &Arc<P>, method: &'static str, handler: F) -> Self
    where
        P: Send + Sync + 'static,
        F: SubHandler<P, T>,
        T: 'static,
    {
        let id = CallbackId {
            owner: Arc::as_ptr(plugin) as *const () as usize,
            owner_type: short_type_name::<P>(),
            method,
        };
        let plugin = Arc::clone(plugin);
        let func = move |message: PubSubMessage| {
            let message_id = message.message_id().to_string();
            let fut = handler.invoke(Arc::clone(&plugin), message);
            async move {
                if let Err(e) = fut.await {
                    error!(
                        handler    = %id,
                        message_id = %message_id,
                        error      = %e,
                        "Subscription handler returned an error"
                    );
                }
            }
            .boxed()
        };
        Self {
            id,
            func: Arc::new(func),
        }
    }

    pub fn id(&self) -> CallbackId {
        self.id
    }

    pub fn method(&self) -> &'static str {
        self.id.method
    }

    /// Invokes the handler with one message.
    pub fn call(&self, message: PubSubMessage) -> BoxFuture<'static, ()> {
        (self.func)(message)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callback").field(&self.id).finish()
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
