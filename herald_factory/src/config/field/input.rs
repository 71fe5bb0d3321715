use syn::parse::{Parse, ParseStream, Result};
use syn::punctuated::Punctuated;
use syn::token::{Comma, Or};
use syn::{Ident, Path};

/// Parsed arguments of an `impl_deserialize_field!` invocation.
pub struct DeserializeFieldInput {
    pub enum_name: Ident,
    pub key_eq_function: Path,
    pub variants: Vec<DeserializeFieldVariant>,
}

/// A single recognized key: the primary name plus its `|`-separated aliases.
pub struct DeserializeFieldVariant {
    pub primary: Ident,
    pub aliases: Vec<Ident>,
}

impl DeserializeFieldVariant {
    /// All spellings of this key, primary first.
    pub fn spellings(&self) -> Vec<String> {
        std::iter::once(&self.primary)
            .chain(self.aliases.iter())
            .map(Ident::to_string)
            .collect()
    }
}

impl Parse for DeserializeFieldInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let enum_name = input.parse()?;
        input.parse::<Comma>()?;
        let key_eq_function = input.parse()?;
        input.parse::<Comma>()?;

        let variants = Punctuated::<DeserializeFieldVariant, Comma>::parse_terminated(input)?
            .into_iter()
            .collect::<Vec<_>>();

        if variants.is_empty() {
            return Err(input.error("at least one key is required"));
        }

        Ok(Self {
            enum_name,
            key_eq_function,
            variants,
        })
    }
}

impl Parse for DeserializeFieldVariant {
    fn parse(input: ParseStream) -> Result<Self> {
        let primary = input.parse()?;
        let mut aliases = Vec::new();

        while input.peek(Or) {
            input.parse::<Or>()?;
            aliases.push(input.parse()?);
        }

        Ok(Self { primary, aliases })
    }
}
