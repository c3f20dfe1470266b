//! Procedural macros for subhook.
//!
//! - `#[subhooks]` on an `impl` block implements `HandlerProvider` for the
//!   type, listing every method tagged with `#[subhook(...)]`.
//! - `#[subhook(...)]` tags one method. It is only meaningful inside a
//!   `#[subhooks]` block, which strips it.
//!
//! ```rust,ignore
//! use subhook::prelude::*;
//!
//! struct Orders;
//!
//! #[subhooks]
//! impl Orders {
//!     #[subhook(project = "proj-1", subscription = "orders-sub")]
//!     async fn on_order(self: Arc<Self>, message: PubSubMessage) {
//!         message.ack();
//!     }
//!
//!     #[subhook(project = "proj-1", subscription = "audit-sub", topic = "orders")]
//!     async fn on_audit(self: Arc<Self>) {}
//! }
//! ```

mod subhooks;

use proc_macro::TokenStream;
use syn::{ItemImpl, parse_macro_input};

/// Implements `HandlerProvider` for the type of the annotated `impl` block.
///
/// # Arguments
///
/// - `name = "..."`: plugin name used in logs (default: the type as written).
/// - `crate = "..."`: path to the `subhook` crate (default: `::subhook`).
///
/// Methods are emitted unchanged. Applying `#[subhook]` twice to the same
/// method keeps the last one.
#[proc_macro_attribute]
pub fn subhooks(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = subhooks::SubhooksArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);
    let item = parse_macro_input!(item as ItemImpl);

    match subhooks::expand(args, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Tags a method as a subscription handler.
///
/// Accepts `project = "..."`, `subscription = "..."` and optionally
/// `topic = "..."`. Must appear inside a `#[subhooks]` impl block.
#[proc_macro_attribute]
pub fn subhook(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = proc_macro2::TokenStream::from(item);
    let err = syn::Error::new(
        proc_macro2::Span::call_site(),
        "#[subhook] must be used on a method inside an impl block annotated with #[subhooks]",
    )
    .to_compile_error();
    quote::quote!(#err #item).into()
}
