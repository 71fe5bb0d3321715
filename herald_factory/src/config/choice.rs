use convert_case::{Case, Casing};
use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};
use std::collections::BTreeSet;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Data, DeriveInput, Error as SynError, Expr, ExprLit, ExprPath, Fields, Lit, Meta,
    MetaNameValue, Path, Result as SynResult, Token,
};

/// The recognized helper attribute name.
const ATTR_NAME: &str = "herald";

/// The recognized argument keys.
const ARG_EQ_FN: &str = "eq_fn";
const ARG_ALIAS: &str = "alias";

/// A comma-delimited list of helper attribute arguments.
type Args = Punctuated<Meta, Token![,]>;

/// Generates an `impl<'de> Deserialize<'de>` block for the given unit-only
/// enum.
pub(crate) fn config_choice(input: DeriveInput) -> SynResult<TokenStream> {
    let variants = require_unit_enum(&input)?;
    let name = &input.ident;
    let visitor_name = format_ident!("{}Visitor", name);
    let eq_fn = extract_eq_fn(&input.attrs)?;

    let mut arms = Vec::new();
    let mut all_aliases = BTreeSet::new();

    for UnitVariant {
        ident,
        aliases,
        cfgs,
    } in variants
    {
        all_aliases.extend(aliases.iter().cloned());
        let aliases = aliases.into_iter().collect::<Vec<_>>();

        let condition = match eq_fn {
            Some(ref eq_fn) => quote! { #(#eq_fn(value, #aliases))||* },
            None => quote! { #(value.eq_ignore_ascii_case(#aliases))||* },
        };

        arms.push(quote! {
            #(#cfgs)*
            if #condition {
                return Ok(#name::#ident);
            }
        });
    }

    let all_aliases = all_aliases.into_iter().collect::<Vec<_>>();

    Ok(quote! {
        const _: () = {
            impl<'de> ::serde::de::Deserialize<'de> for #name {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: ::serde::de::Deserializer<'de>,
                {
                    deserializer.deserialize_str(#visitor_name)
                }
            }

            struct #visitor_name;

            impl<'de> ::serde::de::Visitor<'de> for #visitor_name {
                type Value = #name;

                fn expecting(&self, formatter: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                    formatter.write_str("a string value")
                }

                fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
                where
                    E: ::serde::de::Error,
                {
                    #(#arms)*

                    Err(::serde::de::Error::unknown_variant(value, &[#(#all_aliases),*]))
                }
            }
        };
    })
}

/// A unit variant with its accepted spellings and the `#[cfg(...)]`
/// attributes that gate it.
struct UnitVariant {
    ident: Ident,
    aliases: BTreeSet<String>,
    cfgs: Vec<Attribute>,
}

/// Ensures the input is a non-generic, non-empty enum of unit variants, and
/// returns every variant with its set of accepted spellings.
fn require_unit_enum(input: &DeriveInput) -> SynResult<Vec<UnitVariant>> {
    let Data::Enum(ref data) = input.data else {
        return Err(SynError::new_spanned(input, "this macro only supports enums"));
    };

    if !input.generics.params.is_empty() {
        return Err(SynError::new_spanned(
            &input.generics,
            "this macro only supports non-generic types",
        ));
    }

    if data.variants.is_empty() {
        return Err(SynError::new_spanned(
            input,
            "this macro only supports non-empty enums",
        ));
    }

    let mut variants = Vec::with_capacity(data.variants.len());

    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(SynError::new_spanned(
                variant,
                "this macro only supports unit variants",
            ));
        }

        let mut aliases = BTreeSet::new();
        aliases.insert(variant.ident.to_string().to_case(Case::Snake));

        for arg in helper_args(&variant.attrs)? {
            if !arg.path().is_ident(ARG_ALIAS) {
                return Err(SynError::new_spanned(arg, "this argument is not supported"));
            }

            match string_value(&arg) {
                Some(alias) => aliases.insert(alias.to_case(Case::Snake)),
                None => {
                    return Err(SynError::new_spanned(arg, "expected `alias = \"...\"`"));
                }
            };
        }

        let cfgs = variant
            .attrs
            .iter()
            .filter(|attr| attr.path().is_ident("cfg"))
            .cloned()
            .collect();

        variants.push(UnitVariant {
            ident: variant.ident.clone(),
            aliases,
            cfgs,
        });
    }

    Ok(variants)
}

/// Extracts the optional `eq_fn = some::path` argument from the enum-level
/// helper attribute.
fn extract_eq_fn(attrs: &[Attribute]) -> SynResult<Option<Path>> {
    let mut eq_fn = None;

    for arg in helper_args(attrs)? {
        if !arg.path().is_ident(ARG_EQ_FN) {
            return Err(SynError::new_spanned(arg, "this argument is not supported"));
        }

        match arg {
            Meta::NameValue(MetaNameValue {
                value: Expr::Path(ExprPath { path, .. }),
                ..
            }) => eq_fn = Some(path),
            other => {
                return Err(SynError::new_spanned(other, "expected `eq_fn = some::path`"));
            }
        }
    }

    Ok(eq_fn)
}

/// Collects the arguments of every `#[herald(...)]` attribute in the list.
fn helper_args(attrs: &[Attribute]) -> SynResult<Vec<Meta>> {
    let mut args = Vec::new();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident(ATTR_NAME)) {
        args.extend(attr.parse_args_with(Args::parse_terminated)?);
    }

    Ok(args)
}

/// Returns the string literal of a `key = "value"` argument.
fn string_value(arg: &Meta) -> Option<String> {
    match arg {
        Meta::NameValue(MetaNameValue {
            value: Expr::Lit(ExprLit {
                lit: Lit::Str(lit_str),
                ..
            }),
            ..
        }) => Some(lit_str.value()),
        _ => None,
    }
}
