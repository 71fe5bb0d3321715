#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![cfg_attr(test, deny(warnings))]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Code generators for configuration-related macros.
mod config {
    pub mod choice;
    pub mod field {
        pub mod generator;
        pub mod input;
    }
}

/// Derives `serde::Deserialize` for a unit-only enum, so that it can be
/// deserialized from a human-typed string.
///
/// Every variant is matched by the `snake_case` form of its name, plus any
/// number of extra aliases declared with `#[herald(alias = "...")]`. The
/// string comparison function may be replaced on the enum level with
/// `#[herald(eq_fn = some::path)]`; by default, ASCII case is ignored.
///
/// ```
/// #[derive(Debug, PartialEq, herald_factory::Deserialize)]
/// #[herald(eq_fn = herald_deserialize::Slug::eq_as_slugs)]
/// enum Policy {
///     #[herald(alias = "oldest")]
///     DropOldest,
///     RejectNew,
/// }
///
/// let policy: Policy = serde_yml::from_str("Drop-Oldest").unwrap();
/// assert_eq!(policy, Policy::DropOldest);
/// ```
#[proc_macro_derive(Deserialize, attributes(herald))]
pub fn deserialize_choice(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    config::choice::config_choice(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Generates a private enum of recognized configuration keys, used inside
/// hand-written `serde::de::Visitor::visit_map` implementations.
///
/// The invocation takes the enum name, the key comparison function, and a
/// comma-separated list of keys, each optionally followed by `| alias`
/// alternatives:
///
/// ```ignore
/// impl_deserialize_field!(
///     NotifierConfigField,
///     herald_deserialize::Slug::eq_as_slugs,
///     endpoint | url,
///     max_retries | retries,
/// );
/// ```
///
/// The generated enum carries an extra `__ignore` variant for unknown keys
/// and the `poll`/`take` helpers that fill `Option` slots from a `MapAccess`.
#[proc_macro]
pub fn impl_deserialize_field(input: TokenStream) -> TokenStream {
    config::field::generator::impl_deserialize_field(input)
}
