//! # Treecode Derive Macros
//!
//! This crate provides `#[derive(Encode)]` for `treecode`.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Fields, Generics, Ident, Index, LitStr, parse_macro_input,
    parse_quote,
};

/// Derives `treecode::Encode` for a struct.
///
/// * Named fields are written into a keyed container, in declaration order.
/// * Tuple structs are written into an unkeyed container; a single-field tuple struct
///   encodes exactly like its inner value.
/// * Unit structs encode as null.
///
/// Field attributes (`#[treecode(...)]`):
/// * `rename = "key"`: use `key` instead of the field name.
/// * `skip`: leave the field out.
/// * `skip_none`: leave an `Option` field out when it is `None`.
/// * `base`: encode the field in its own scope under the key `"super"`.
#[proc_macro_derive(Encode, attributes(treecode))]
pub fn derive_encode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = input.ident;
    let data_struct = match input.data {
        Data::Struct(ds) => ds,
        _ => {
            return Err(syn::Error::new(
                name.span(),
                "Encode can only be derived for structs",
            ));
        }
    };

    let generics = add_encode_bounds(input.generics);
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let body = match &data_struct.fields {
        Fields::Named(fields) => {
            let mut parsed = Vec::new();
            for field in &fields.named {
                let attrs = parse_attributes(&field.attrs)?;
                if let Some(ident) = &field.ident {
                    parsed.push(NamedField {
                        ident: ident.clone(),
                        attrs,
                    });
                }
            }
            generate_keyed(&parsed)?
        }
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            reject_attributes(fields.unnamed.iter().map(|f| &f.attrs))?;
            generate_newtype()
        }
        Fields::Unnamed(fields) => {
            let mut indices = Vec::new();
            for (i, field) in fields.unnamed.iter().enumerate() {
                let attrs = parse_attributes(&field.attrs)?;
                if attrs.rename.is_some() || attrs.skip_none || attrs.base {
                    return Err(syn::Error::new_spanned(
                        &field.ty,
                        "tuple struct fields only support `skip`",
                    ));
                }
                if !attrs.skip {
                    indices.push(Index::from(i));
                }
            }
            generate_unkeyed(&indices)
        }
        Fields::Unit => quote! {
            fn encode(&self, encoder: &mut ::treecode::Encoder<'_, '_>) -> ::treecode::Result<()> {
                encoder.single_value_container()?.encode_nil()
            }
        },
    };

    Ok(quote! {
        impl #impl_generics ::treecode::encode::Encode for #name #ty_generics #where_clause {
            #body
        }
    })
}

fn add_encode_bounds(mut generics: Generics) -> Generics {
    let params: Vec<Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    let where_clause = generics.make_where_clause();
    for ident in params {
        where_clause
            .predicates
            .push(parse_quote!(#ident: ::treecode::encode::Encode));
    }
    generics
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    skip: bool,
    skip_none: bool,
    base: bool,
}

struct NamedField {
    ident: Ident,
    attrs: FieldAttrs,
}

impl NamedField {
    fn key(&self) -> String {
        match &self.attrs.rename {
            Some(key) => key.clone(),
            None => {
                let raw = self.ident.to_string();
                raw.strip_prefix("r#").map(str::to_owned).unwrap_or(raw)
            }
        }
    }
}

fn parse_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("treecode") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    return Ok(());
                }

                if meta.path.is_ident("skip_none") {
                    parsed.skip_none = true;
                    return Ok(());
                }

                if meta.path.is_ident("base") {
                    parsed.base = true;
                    return Ok(());
                }

                if meta.path.is_ident("rename") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    parsed.rename = Some(s.value());
                    return Ok(());
                }
                Err(meta.error(
                    "Unknown treecode attribute key. Supported: rename, skip, skip_none, base",
                ))
            })?;
        }
    }
    Ok(parsed)
}

fn reject_attributes<'a>(attrs: impl Iterator<Item = &'a Vec<Attribute>>) -> syn::Result<()> {
    for attr in attrs.flatten() {
        if attr.path().is_ident("treecode") {
            return Err(syn::Error::new_spanned(
                attr,
                "newtype structs encode as their inner value and take no field attributes",
            ));
        }
    }
    Ok(())
}

// --- Generators ---

fn generate_keyed(fields: &[NamedField]) -> syn::Result<TokenStream2> {
    let mut bases = fields.iter().filter(|f| f.attrs.base && !f.attrs.skip);
    if let (Some(_), Some(second)) = (bases.next(), bases.next()) {
        return Err(syn::Error::new(
            second.ident.span(),
            "only one field can be marked `base`",
        ));
    }

    let writes = fields.iter().filter(|f| !f.attrs.skip).map(|f| {
        let ident = &f.ident;
        let key = f.key();
        if f.attrs.base {
            if f.attrs.rename.is_some() {
                quote! {
                    container.super_encoder_for_key(#key, |encoder| {
                        encoder.single_value_container()?.encode(&self.#ident)
                    })?;
                }
            } else {
                quote! {
                    container.super_encoder(|encoder| {
                        encoder.single_value_container()?.encode(&self.#ident)
                    })?;
                }
            }
        } else if f.attrs.skip_none {
            quote! { container.encode_if_present(#key, &self.#ident)?; }
        } else {
            quote! { container.encode(#key, &self.#ident)?; }
        }
    });

    Ok(quote! {
        fn encode(&self, encoder: &mut ::treecode::Encoder<'_, '_>) -> ::treecode::Result<()> {
            #[allow(unused_mut, unused_variables)]
            let mut container = encoder.keyed_container()?;
            #(#writes)*
            Ok(())
        }
    })
}

fn generate_unkeyed(indices: &[Index]) -> TokenStream2 {
    quote! {
        fn encode(&self, encoder: &mut ::treecode::Encoder<'_, '_>) -> ::treecode::Result<()> {
            #[allow(unused_mut, unused_variables)]
            let mut container = encoder.unkeyed_container()?;
            #(container.encode(&self.#indices)?;)*
            Ok(())
        }
    }
}

fn generate_newtype() -> TokenStream2 {
    quote! {
        fn encode(&self, encoder: &mut ::treecode::Encoder<'_, '_>) -> ::treecode::Result<()> {
            ::treecode::encode::Encode::encode(&self.0, encoder)
        }

        fn shape(&self) -> ::treecode::encode::Shape<'_> {
            ::treecode::encode::Encode::shape(&self.0)
        }
    }
}
