//! Procedural macros for **llmbridge**
#![forbid(unsafe_code)]

use proc_macro::TokenStream;
use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro_error::{abort, proc_macro_error};
use proc_macro2::{Ident, Span};
use quote::{ToTokens, quote};
use syn::{
    Attribute, Data, DataEnum, DeriveInput, Expr, ExprLit, ExprPath, Fields, FieldsNamed, FnArg,
    ImplItem, ImplItemFn, ItemImpl, Lit, LitStr, Meta, Pat, PatType, Token, Type,
    ext::IdentExt, meta::ParseNestedMeta, parse_macro_input, punctuated::Punctuated,
};

// ============================================================================
// INPUT SCHEMA DERIVE MACRO
// ============================================================================

/// Describes a struct (or a unit-only enum) as an LLM function input.
///
/// Field doc comments become property descriptions. Understands the serde
/// attributes that change the wire shape: `rename`, `rename_all`, `alias`,
/// `default`, `skip` and `skip_deserializing`.
///
/// Defaults of `Serialize` types are published in the schema; other defaults
/// are still honoured, just not advertised.
#[proc_macro_error]
#[proc_macro_derive(InputSchema)]
pub fn derive_input_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        abort!(input.generics, "InputSchema cannot be derived for generic types");
    }

    match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => generate_struct_schema(&input, fields),
            Fields::Unit => abort!(
                input.ident,
                "unit structs carry no arguments; expose a method without an input instead"
            ),
            Fields::Unnamed(fields) => {
                abort!(fields, "InputSchema needs named fields so each argument has a name")
            }
        },
        Data::Enum(data_enum) => generate_enum_schema(&input, data_enum),
        Data::Union(_) => {
            abort!(input.ident, "Union schemas are not supported");
        }
    }
}

fn generate_struct_schema(input: &DeriveInput, fields: &FieldsNamed) -> TokenStream {
    let name = &input.ident;
    let crate_path = get_crate_path();
    let container = SerdeAttrs::parse(&input.attrs);

    let mut specs = Vec::new();
    for field in &fields.named {
        let attrs = SerdeAttrs::parse(&field.attrs);
        if attrs.skip {
            continue;
        }
        if attrs.flatten {
            abort!(field, "`#[serde(flatten)]` fields are not supported by InputSchema");
        }

        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let ty = &field.ty;
        let wire_name = match (&attrs.rename, &container.rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => rule.apply_to_field(&ident.unraw().to_string()),
            (None, None) => ident.unraw().to_string(),
        };
        let description = docs(&field.attrs);

        let published = quote! {
            (&#crate_path::__private::DefaultOf(&__value)).published_default()
        };
        let explicit_default = match &attrs.default {
            Some(FieldDefault::Trait) => Some(quote! {{
                let __value = <#ty as ::core::default::Default>::default();
                #published
            }}),
            Some(FieldDefault::Path(path)) => Some(quote! {{
                let __value: #ty = #path();
                #published
            }}),
            None if container.default.is_some() => Some(quote! {{
                let __value = &__container_default.#ident;
                (&#crate_path::__private::DefaultOf(__value)).published_default()
            }}),
            None => None,
        };

        let (required, default) = match explicit_default {
            Some(value) => (quote!(false), value),
            None => (
                quote!(!<#ty as #crate_path::SchemaType>::is_optional()),
                quote! {
                    if <#ty as #crate_path::SchemaType>::is_optional() {
                        ::core::option::Option::Some(#crate_path::serde_json::Value::Null)
                    } else {
                        ::core::option::Option::None
                    }
                },
            ),
        };
        let aliases = &attrs.aliases;

        specs.push(quote! {
            #crate_path::FieldSpec {
                name: #wire_name,
                description: #description,
                kind: <#ty as #crate_path::SchemaType>::kind(),
                required: #required,
                default: #default,
                aliases: &[#(#aliases),*],
            }
        });
    }

    let container_default = match &container.default {
        Some(FieldDefault::Trait) => quote! {
            let __container_default = <#name as ::core::default::Default>::default();
        },
        Some(FieldDefault::Path(path)) => quote! {
            let __container_default: #name = #path();
        },
        None => quote!(),
    };

    TokenStream::from(quote! {
        impl #crate_path::SchemaType for #name {
            fn kind() -> #crate_path::FieldKind {
                #crate_path::FieldKind::Object(<Self as #crate_path::InputSchema>::fields)
            }
        }

        impl #crate_path::InputSchema for #name {
            fn fields() -> &'static [#crate_path::FieldSpec] {
                static FIELDS: #crate_path::once_cell::sync::Lazy<::std::vec::Vec<#crate_path::FieldSpec>> =
                    #crate_path::once_cell::sync::Lazy::new(|| {
                        #[allow(unused_imports)]
                        use #crate_path::__private::{SerializedDefault as _, UnpublishedDefault as _};
                        #container_default
                        ::std::vec![#(#specs),*]
                    });
                FIELDS.as_slice()
            }
        }
    })
}

fn generate_enum_schema(input: &DeriveInput, data: &DataEnum) -> TokenStream {
    let name = &input.ident;
    let crate_path = get_crate_path();
    let container = SerdeAttrs::parse(&input.attrs);

    if container.tagged {
        abort!(input.ident, "tagged and untagged enums are not supported by InputSchema");
    }

    let mut choices = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            abort!(variant, "InputSchema enums may only have unit variants");
        }
        let attrs = SerdeAttrs::parse(&variant.attrs);
        if attrs.skip {
            continue;
        }
        let choice = match (&attrs.rename, &container.rename_all) {
            (Some(rename), _) => rename.clone(),
            (None, Some(rule)) => rule.apply_to_variant(&variant.ident.unraw().to_string()),
            (None, None) => variant.ident.unraw().to_string(),
        };
        choices.push(choice);
    }

    if choices.is_empty() {
        abort!(input.ident, "InputSchema enums need at least one variant");
    }

    TokenStream::from(quote! {
        impl #crate_path::SchemaType for #name {
            fn kind() -> #crate_path::FieldKind {
                #crate_path::FieldKind::Enum(&[#(#choices),*])
            }
        }
    })
}

fn get_crate_path() -> proc_macro2::TokenStream {
    // The facade crate re-exports everything the generated code needs.
    if let Ok(found) = crate_name("llmbridge") {
        return match found {
            FoundCrate::Itself => quote!(::llmbridge),
            FoundCrate::Name(name) => {
                let ident = Ident::new(&name, Span::call_site());
                quote!(::#ident)
            }
        };
    }
    match crate_name("llmbridge_core") {
        Ok(FoundCrate::Itself) => quote!(crate),
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::llmbridge),
    }
}

// ============================================================================
// SERDE ATTRIBUTES
// ============================================================================

enum FieldDefault {
    Trait,
    Path(ExprPath),
}

#[derive(Default)]
struct SerdeAttrs {
    rename: Option<String>,
    rename_all: Option<RenameRule>,
    default: Option<FieldDefault>,
    aliases: Vec<String>,
    skip: bool,
    flatten: bool,
    tagged: bool,
}

impl SerdeAttrs {
    /// Reads the subset of `#[serde(...)]` that changes the wire shape.
    fn parse(attrs: &[Attribute]) -> Self {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
            let result = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    out.rename = Some(parse_directional(&meta)?);
                } else if meta.path.is_ident("rename_all") {
                    let rule = parse_directional(&meta)?;
                    out.rename_all = Some(RenameRule::parse(&rule).ok_or_else(|| {
                        meta.error(format!("unknown rename_all rule `{rule}`"))
                    })?);
                } else if meta.path.is_ident("default") {
                    out.default = Some(if meta.input.peek(Token![=]) {
                        let path: LitStr = meta.value()?.parse()?;
                        FieldDefault::Path(path.parse()?)
                    } else {
                        FieldDefault::Trait
                    });
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                    out.skip = true;
                } else if meta.path.is_ident("alias") {
                    let alias: LitStr = meta.value()?.parse()?;
                    out.aliases.push(alias.value());
                } else if meta.path.is_ident("flatten") {
                    out.flatten = true;
                } else if meta.path.is_ident("tag")
                    || meta.path.is_ident("untagged")
                    || meta.path.is_ident("content")
                {
                    out.tagged = true;
                    skip_value(&meta)?;
                } else {
                    skip_value(&meta)?;
                }
                Ok(())
            });
            if let Err(err) = result {
                abort!(err.span(), "{}", err);
            }
        }
        out
    }
}

/// `rename = "x"` or `rename(deserialize = "x")`; the deserialize side wins.
fn parse_directional(meta: &ParseNestedMeta) -> syn::Result<String> {
    if meta.input.peek(Token![=]) {
        let lit: LitStr = meta.value()?.parse()?;
        return Ok(lit.value());
    }

    let mut found = None;
    meta.parse_nested_meta(|inner| {
        let lit: LitStr = inner.value()?.parse()?;
        if inner.path.is_ident("deserialize") {
            found = Some(lit.value());
        }
        Ok(())
    })?;
    found.ok_or_else(|| meta.error("expected a `deserialize` name"))
}

fn skip_value(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        meta.value()?.parse::<Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_value(&inner))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(rule: &str) -> Option<Self> {
        Some(match rule {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        })
    }

    /// Fields are written in snake_case.
    fn apply_to_field(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => field
                .split('_')
                .map(capitalize)
                .collect::<Vec<_>>()
                .concat(),
            Self::Camel => {
                let pascal = Self::Pascal.apply_to_field(field);
                lower_first(&pascal)
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.replace('_', "-").to_ascii_uppercase(),
        }
    }

    /// Variants are written in PascalCase.
    fn apply_to_variant(self, variant: &str) -> String {
        match self {
            Self::Pascal => variant.to_string(),
            Self::Lower => variant.to_ascii_lowercase(),
            Self::Upper => variant.to_ascii_uppercase(),
            Self::Camel => lower_first(variant),
            Self::Snake => snake(variant),
            Self::ScreamingSnake => snake(variant).to_ascii_uppercase(),
            Self::Kebab => snake(variant).replace('_', "-"),
            Self::ScreamingKebab => snake(variant).replace('_', "-").to_ascii_uppercase(),
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn lower_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn snake(pascal: &str) -> String {
    let mut out = String::with_capacity(pascal.len() + 4);
    for (i, ch) in pascal.char_indices() {
        if ch.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(ch.to_ascii_lowercase());
    }
    out
}

// ============================================================================
// SERVICE ATTRIBUTE MACRO
// ============================================================================

/// Gather `///` doc-comments into a single string, trimming the leading space after `///`.
fn docs(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter_map(|a| match &a.meta {
            Meta::NameValue(nv) if a.path().is_ident("doc") => {
                if let Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) = &nv.value
                {
                    Some(s.value().trim_start().to_owned())
                } else {
                    None
                }
            }
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Turns an inherent `impl` block into a `Service`.
///
/// Every method marked `#[expose]` (optionally `#[expose(name = "..")]`)
/// becomes an LLM-callable function described by its doc comment. Accepts
/// `name = ".."` and `system_message = <expr>`.
#[proc_macro_error]
#[proc_macro_attribute]
pub fn service(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr with Punctuated::<Meta, Token![,]>::parse_terminated);
    let mut item_impl: ItemImpl = parse_macro_input!(item);

    if let Some((_, path, _)) = &item_impl.trait_ {
        abort!(path, "`#[service]` goes on an inherent impl block, not a trait impl");
    }
    if !item_impl.generics.params.is_empty() {
        abort!(item_impl.generics, "`#[service]` does not support generic services");
    }

    // ───────── Service arguments ─────────
    let self_ty = item_impl.self_ty.clone();
    let mut service_name = type_name(&self_ty);
    let mut system_message: Option<Expr> = None;

    for arg in &args {
        match arg {
            Meta::NameValue(nv) if nv.path.is_ident("name") => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => service_name = s.value(),
                other => abort!(other, "`name` expects a string literal"),
            },
            Meta::NameValue(nv) if nv.path.is_ident("system_message") => {
                system_message = Some(nv.value.clone());
            }
            other => abort!(other, "unknown `#[service]` argument; expected `name` or `system_message`"),
        }
    }

    // ───────── Exposed methods → table entries ─────────
    let crate_path = get_crate_path();
    let mut entries = Vec::new();

    for impl_item in &mut item_impl.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let Some(position) = method.attrs.iter().position(|a| a.path().is_ident("expose")) else {
            continue;
        };
        let expose_attr = method.attrs.remove(position);
        entries.push(exposed_entry(&crate_path, method, &expose_attr));
    }

    let system_message_fn = system_message.map(|expr| {
        quote! {
            fn system_message(&self) -> ::core::option::Option<&str> {
                ::core::option::Option::Some(#expr)
            }
        }
    });

    // ───────── Macro expansion ─────────
    TokenStream::from(quote! {
        #item_impl

        impl #crate_path::Service for #self_ty {
            fn name(&self) -> &str {
                #service_name
            }

            fn methods() -> ::std::vec::Vec<#crate_path::ExposedMethod<Self>> {
                ::std::vec![#(#entries),*]
            }

            #system_message_fn
        }
    })
}

fn exposed_entry(
    crate_path: &proc_macro2::TokenStream,
    method: &ImplItemFn,
    expose_attr: &Attribute,
) -> proc_macro2::TokenStream {
    let sig = &method.sig;
    let fn_ident = &sig.ident;

    if sig.asyncness.is_some() {
        abort!(sig.asyncness, "exposed methods must be synchronous");
    }

    let mut function_name = fn_ident.unraw().to_string();
    if let Meta::List(_) = &expose_attr.meta {
        let result = expose_attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                function_name = lit.value();
                Ok(())
            } else {
                Err(meta.error("expected `name = \"...\"`"))
            }
        });
        if let Err(err) = result {
            abort!(err.span(), "{}", err);
        }
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        Some(other) => abort!(other, "exposed methods must take `&self`"),
        None => abort!(sig, "exposed methods must take `&self`"),
    }

    let input_ty: Option<&Type> = match inputs.next() {
        None => None,
        Some(FnArg::Typed(PatType { pat, ty, .. })) => {
            if !matches!(**pat, Pat::Ident(_) | Pat::Wild(_)) {
                abort!(pat, "`#[expose]` supports only identifier patterns");
            }
            if let Type::Reference(_) = **ty {
                abort!(ty, "take the input structure by value");
            }
            Some(ty)
        }
        Some(other) => abort!(other, "unexpected receiver"),
    };

    if let Some(extra) = inputs.next() {
        abort!(
            extra,
            "exposed methods take at most one input structure; group the arguments into a struct deriving `InputSchema`"
        );
    }

    let description = LitStr::new(&docs(&method.attrs), Span::call_site());

    match input_ty {
        Some(ty) => quote! {
            #crate_path::ExposedMethod::new::<#ty, _, _>(#function_name, #description, Self::#fn_ident)
        },
        None => quote! {
            #crate_path::ExposedMethod::no_input(#function_name, #description, Self::#fn_ident)
        },
    }
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.unraw().to_string())
            .unwrap_or_else(|| ty.to_token_stream().to_string()),
        other => other.to_token_stream().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn rename_rules_for_fields() {
        let field = "max_results";
        assert_eq!(RenameRule::Camel.apply_to_field(field), "maxResults");
        assert_eq!(RenameRule::Pascal.apply_to_field(field), "MaxResults");
        assert_eq!(RenameRule::Kebab.apply_to_field(field), "max-results");
        assert_eq!(RenameRule::ScreamingSnake.apply_to_field(field), "MAX_RESULTS");
        assert_eq!(RenameRule::ScreamingKebab.apply_to_field(field), "MAX-RESULTS");
        assert_eq!(RenameRule::Snake.apply_to_field(field), "max_results");
    }

    #[test]
    fn rename_rules_for_variants() {
        let variant = "SafeSearch";
        assert_eq!(RenameRule::Lower.apply_to_variant(variant), "safesearch");
        assert_eq!(RenameRule::Snake.apply_to_variant(variant), "safe_search");
        assert_eq!(RenameRule::Camel.apply_to_variant(variant), "safeSearch");
        assert_eq!(RenameRule::Kebab.apply_to_variant(variant), "safe-search");
        assert_eq!(RenameRule::ScreamingSnake.apply_to_variant(variant), "SAFE_SEARCH");
    }

    #[test]
    fn unknown_rename_rule_is_rejected() {
        assert_eq!(RenameRule::parse("Title Case"), None);
        assert_eq!(RenameRule::parse("camelCase"), Some(RenameRule::Camel));
    }

    #[test]
    fn serde_attributes_are_collected() {
        let input: DeriveInput = parse_quote! {
            #[serde(rename_all = "camelCase", deny_unknown_fields)]
            struct SearchInput {
                #[serde(rename = "q")]
                query: String,
                #[serde(default = "default_limit", alias = "limit")]
                max_results: u32,
                #[serde(skip)]
                cache: (),
            }
        };

        let container = SerdeAttrs::parse(&input.attrs);
        assert_eq!(container.rename_all, Some(RenameRule::Camel));

        let Data::Struct(data) = &input.data else {
            panic!("expected struct");
        };
        let fields: Vec<_> = data.fields.iter().map(|f| SerdeAttrs::parse(&f.attrs)).collect();

        assert_eq!(fields[0].rename.as_deref(), Some("q"));
        assert!(matches!(fields[1].default, Some(FieldDefault::Path(_))));
        assert_eq!(fields[1].aliases, ["limit"]);
        assert!(fields[2].skip);
    }

    #[test]
    fn directional_rename_prefers_deserialize() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[serde(rename(serialize = "out", deserialize = "in"))])];
        assert_eq!(SerdeAttrs::parse(&attrs).rename.as_deref(), Some("in"));
    }

    #[test]
    fn docs_are_joined_and_trimmed() {
        let method: ImplItemFn = parse_quote! {
            /// Creates an issue.
            ///
            /// Returns the new key.
            fn create_issue(&self) -> String { String::new() }
        };
        assert_eq!(docs(&method.attrs), "Creates an issue.\n\nReturns the new key.");
    }

    #[test]
    fn type_name_uses_last_segment() {
        let ty: Type = parse_quote!(crate::services::JiraService);
        assert_eq!(type_name(&ty), "JiraService");
    }
}
