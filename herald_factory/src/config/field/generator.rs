use super::input::DeserializeFieldInput;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::parse_macro_input;

pub fn impl_deserialize_field(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeserializeFieldInput);
    let enum_name = &input.enum_name;
    let visitor_name = format_ident!("{}Visitor", enum_name);

    let primaries = input
        .variants
        .iter()
        .map(|variant| &variant.primary)
        .collect::<Vec<_>>();
    let primary_names = primaries
        .iter()
        .map(|ident| ident.to_string())
        .collect::<Vec<_>>();
    let lookup = compose_lookup(&input);

    let expanded = quote! {
        #[allow(non_camel_case_types)]
        enum #enum_name {
            #(#primaries,)*
            __ignore,
        }

        impl #enum_name {
            /// Resolves a user-provided key into a known variant, or into
            /// `__ignore` when nothing matches.
            fn from_str(value: &str) -> Self {
                #lookup
            }

            /// The primary name of the key, for error messages.
            fn as_str(&self) -> &'static str {
                match self {
                    #(Self::#primaries => #primary_names,)*
                    Self::__ignore => "__ignore",
                }
            }

            /// Reads the next map value into the given slot, rejecting keys
            /// that were already seen.
            fn poll<'de, A, T>(
                &self,
                from: &mut A,
                into: &mut Option<T>,
            ) -> Result<::serde::de::IgnoredAny, A::Error>
            where
                A: ::serde::de::MapAccess<'de>,
                T: ::serde::de::Deserialize<'de>,
            {
                if into.is_some() {
                    return Err(::serde::de::Error::duplicate_field(self.as_str()));
                }
                *into = Some(from.next_value()?);
                Ok(::serde::de::IgnoredAny)
            }

            /// Unwraps a required slot, reporting a missing field otherwise.
            #[allow(dead_code)]
            fn take<T, E>(&self, from: Option<T>) -> Result<T, E>
            where
                E: ::serde::de::Error,
            {
                from.ok_or_else(|| ::serde::de::Error::missing_field(self.as_str()))
            }
        }

        impl<'de> ::serde::de::Deserialize<'de> for #enum_name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: ::serde::de::Deserializer<'de>,
            {
                deserializer.deserialize_identifier(#visitor_name)
            }
        }

        struct #visitor_name;

        impl ::serde::de::Visitor<'_> for #visitor_name {
            type Value = #enum_name;

            fn expecting(&self, formatter: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                formatter.write_str("a configuration key")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: ::serde::de::Error,
            {
                Ok(#enum_name::from_str(value))
            }
        }
    };

    TokenStream::from(expanded)
}

/// Builds an `if / else if / else` ladder that tries every spelling of every
/// key with the configured comparison function.
fn compose_lookup(input: &DeserializeFieldInput) -> TokenStream2 {
    let eq = &input.key_eq_function;

    let arms = input.variants.iter().map(|variant| {
        let primary = &variant.primary;
        let spellings = variant.spellings();

        quote! {
            if #(#eq(value, #spellings))||* {
                Self::#primary
            }
        }
    });

    quote! {
        #(#arms)else* else {
            Self::__ignore
        }
    }
}
