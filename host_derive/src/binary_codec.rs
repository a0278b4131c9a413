//! Derive macro for the deterministic binary codec.
//!
//! Fields are written in declaration order using the `Encode`/`Decode`
//! implementations in `crate::types::encoding`. Enums are prefixed with a
//! `u8` discriminant that honors explicit `Variant = n` values.
//!
//! Persisted records (code and contract metadata, history entries) are the
//! main users, so the layout must never depend on anything but field order.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, Data, DataEnum, DeriveInput, Fields};

pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (encode_body, decode_body) = match &input.data {
        Data::Struct(data_struct) => struct_bodies(&data_struct.fields),
        Data::Enum(data_enum) => enum_bodies(data_enum)?,
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "BinaryCodec derive does not support unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #encode_body
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn decode(input: &mut &[u8]) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                #decode_body
            }
        }
    })
}

/// Encode and decode bodies for a struct with any field shape.
fn struct_bodies(fields: &Fields) -> (TokenStream2, TokenStream2) {
    match fields {
        Fields::Named(named) => {
            let idents: Vec<_> = named.named.iter().map(|f| &f.ident).collect();
            (
                quote! { #(crate::types::encoding::Encode::encode(&self.#idents, out);)* },
                quote! {
                    Ok(Self { #(#idents: crate::types::encoding::Decode::decode(input)?,)* })
                },
            )
        }
        Fields::Unnamed(unnamed) => {
            let indices: Vec<_> = (0..unnamed.unnamed.len()).map(syn::Index::from).collect();
            let decodes = indices
                .iter()
                .map(|_| quote! { crate::types::encoding::Decode::decode(input)? });
            (
                quote! { #(crate::types::encoding::Encode::encode(&self.#indices, out);)* },
                quote! { Ok(Self(#(#decodes),*)) },
            )
        }
        Fields::Unit => (quote! {}, quote! { Ok(Self) }),
    }
}

fn enum_bodies(data_enum: &DataEnum) -> syn::Result<(TokenStream2, TokenStream2)> {
    let discriminants = compute_discriminants(data_enum)?;
    let mut encode_arms = Vec::with_capacity(discriminants.len());
    let mut decode_arms = Vec::with_capacity(discriminants.len());

    for (variant, tag) in data_enum.variants.iter().zip(discriminants) {
        let variant_name = &variant.ident;
        let (pattern, bound, construct) = match &variant.fields {
            Fields::Unit => (quote! {}, Vec::new(), quote! {}),
            Fields::Unnamed(fields) => {
                let bound: Vec<_> = (0..fields.unnamed.len())
                    .map(|i| format_ident!("f{}", i))
                    .collect();
                let decodes = bound
                    .iter()
                    .map(|_| quote! { crate::types::encoding::Decode::decode(input)? });
                (
                    quote! { (#(#bound),*) },
                    bound.clone(),
                    quote! { (#(#decodes),*) },
                )
            }
            Fields::Named(fields) => {
                let bound: Vec<_> = fields
                    .named
                    .iter()
                    .filter_map(|f| f.ident.clone())
                    .collect();
                (
                    quote! { { #(#bound),* } },
                    bound.clone(),
                    quote! { { #(#bound: crate::types::encoding::Decode::decode(input)?),* } },
                )
            }
        };

        encode_arms.push(quote! {
            Self::#variant_name #pattern => {
                crate::types::encoding::Encode::encode(&#tag, out);
                #(crate::types::encoding::Encode::encode(#bound, out);)*
            }
        });
        decode_arms.push(quote! {
            #tag => Ok(Self::#variant_name #construct),
        });
    }

    Ok((
        quote! {
            match self {
                #(#encode_arms)*
            }
        },
        quote! {
            let tag: u8 = crate::types::encoding::Decode::decode(input)?;
            match tag {
                #(#decode_arms)*
                _ => Err(crate::types::encoding::DecodeError::InvalidValue),
            }
        },
    ))
}

/// Discriminants follow Rust's rules: explicit values win, others count up.
fn compute_discriminants(data_enum: &DataEnum) -> syn::Result<Vec<u8>> {
    let mut discriminants = Vec::with_capacity(data_enum.variants.len());
    let mut next: u16 = 0;

    for variant in &data_enum.variants {
        let value = match &variant.discriminant {
            Some((_, expr)) => parse_discriminant(expr)?,
            None => u8::try_from(next).map_err(|_| {
                syn::Error::new_spanned(variant, "enum has more than 256 variants")
            })?,
        };
        discriminants.push(value);
        next = u16::from(value) + 1;
    }
    Ok(discriminants)
}

fn parse_discriminant(expr: &syn::Expr) -> syn::Result<u8> {
    if let syn::Expr::Lit(syn::ExprLit {
        lit: syn::Lit::Int(lit_int),
        ..
    }) = expr
    {
        return lit_int.base10_parse::<u8>();
    }
    Err(syn::Error::new_spanned(
        expr,
        "discriminant must be an integer literal that fits in a u8",
    ))
}
