use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::meta::ParseNestedMeta;
use syn::{Attribute, Ident, ImplItem, ItemImpl, LitStr, Path, Type};

// ─── Arguments ───────────────────────────────────────────────────────────────

/// Arguments of `#[subhooks(...)]`.
#[derive(Default)]
pub struct SubhooksArgs {
    name: Option<LitStr>,
    krate: Option<Path>,
}

impl SubhooksArgs {
    pub fn parse(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("name") {
            self.name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("crate") {
            let lit: LitStr = meta.value()?.parse()?;
            self.krate = Some(lit.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported #[subhooks] argument, expected `name` or `crate`"))
        }
    }
}

/// One parsed `#[subhook(...)]`.
struct TagArgs {
    project: LitStr,
    subscription: LitStr,
    topic: Option<LitStr>,
}

struct TaggedMethod {
    ident: Ident,
    tag: TagArgs,
}

// ─── Expansion ───────────────────────────────────────────────────────────────

pub fn expand(args: SubhooksArgs, mut item: ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[subhooks] must be applied to an inherent impl block",
        ));
    }

    let mut tagged = Vec::new();
    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let (tags, rest): (Vec<Attribute>, Vec<Attribute>) = method
            .attrs
            .drain(..)
            .partition(|attr| attr.path().is_ident("subhook"));
        method.attrs = rest;

        // Last applied wins.
        if let Some(attr) = tags.last() {
            tagged.push(TaggedMethod {
                ident: method.sig.ident.clone(),
                tag: parse_tag(attr)?,
            });
        }
    }

    let krate = args.krate.unwrap_or_else(|| syn::parse_quote!(::subhook));
    let self_ty = &item.self_ty;
    let plugin_name = args
        .name
        .unwrap_or_else(|| LitStr::new(&type_display(self_ty), Span::call_site()));
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();

    let adds = tagged.iter().map(|m| {
        let ident = &m.ident;
        let method = LitStr::new(&ident.to_string(), ident.span());
        let project = &m.tag.project;
        let subscription = &m.tag.subscription;
        let with_topic = m.tag.topic.as_ref().map(|t| quote!(.with_topic(#t)));
        quote! {
            .add(
                #method,
                #krate::core::Subhook::new(#project, #subscription) #with_topic,
                Self::#ident,
            )
        }
    });

    Ok(quote! {
        #item

        impl #impl_generics #krate::core::HandlerProvider for #self_ty #where_clause {
            fn plugin_name(&self) -> &str {
                #plugin_name
            }

            fn subhooks(
                self: #krate::core::__private::Arc<Self>,
            ) -> ::std::vec::Vec<#krate::core::TaggedHandler> {
                #krate::core::Handlers::new(self)
                    #(#adds)*
                    .build()
            }
        }
    })
}

fn parse_tag(attr: &Attribute) -> syn::Result<TagArgs> {
    let mut project: Option<LitStr> = None;
    let mut subscription: Option<LitStr> = None;
    let mut topic: Option<LitStr> = None;

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("project") {
            project = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("subscription") || meta.path.is_ident("sub") {
            subscription = Some(meta.value()?.parse()?);
        } else if meta.path.is_ident("topic") {
            topic = Some(meta.value()?.parse()?);
        } else {
            return Err(meta.error(
                "unsupported #[subhook] argument, expected `project`, `subscription` or `topic`",
            ));
        }
        Ok(())
    })?;

    let project = project
        .ok_or_else(|| syn::Error::new_spanned(attr, "#[subhook] requires `project = \"…\"`"))?;
    let subscription = subscription.ok_or_else(|| {
        syn::Error::new_spanned(attr, "#[subhook] requires `subscription = \"…\"`")
    })?;

    for lit in [&project, &subscription] {
        if lit.value().trim().is_empty() {
            return Err(syn::Error::new(lit.span(), "must not be empty"));
        }
    }

    Ok(TagArgs {
        project,
        subscription,
        topic,
    })
}

/// Renders the self type the way it is written, without token spacing.
fn type_display(ty: &Type) -> String {
    quote!(#ty).to_string().replace(' ', "")
}
