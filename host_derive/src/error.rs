//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//!
//! # Usage
//!
//! ```ignore
//! use host_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum HostError {
//!     #[error("not found: {0}")]
//!     NotFound(String),
//!
//!     #[error("payload too large: limit {limit}")]
//!     PayloadTooLarge { limit: u64, actual: u64 },
//!
//!     #[error("out of gas")]
//!     OutOfGas,
//! }
//! ```
//!
//! Only the fields a message names are handed to `write!`, so a variant may
//! carry context that its message does not print.

use proc_macro::TokenStream;
use quote::{format_ident, quote, ToTokens};
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let display_body = match &input.data {
        Data::Enum(data_enum) => {
            let arms = data_enum
                .variants
                .iter()
                .map(|variant| {
                    let variant_name = &variant.ident;
                    let message = extract_error_message(
                        &variant.attrs,
                        &variant.ident,
                        &format!("variant `{}`", variant.ident),
                    )?;
                    let used = referenced_args(&message);

                    let arm = match &variant.fields {
                        Fields::Unit => quote! {
                            Self::#variant_name => write!(f, #message),
                        },
                        Fields::Unnamed(fields) => {
                            let count = fields.unnamed.len();
                            let bindings = (0..count).map(|i| {
                                if used.contains(&i.to_string()) {
                                    format_ident!("f{}", i).to_token_stream()
                                } else {
                                    quote!(_)
                                }
                            });
                            let args = (0..count)
                                .filter(|i| used.contains(&i.to_string()))
                                .map(|i| {
                                    let ident = format_ident!("f{}", i);
                                    quote!(#ident = #ident)
                                });
                            let format_str = positional_to_named(&message, count);
                            quote! {
                                Self::#variant_name(#(#bindings),*) => write!(f, #format_str #(, #args)*),
                            }
                        }
                        Fields::Named(fields) => {
                            let named: Vec<_> = fields
                                .named
                                .iter()
                                .filter_map(|field| field.ident.as_ref())
                                .filter(|ident| used.contains(&ident.to_string()))
                                .collect();
                            quote! {
                                Self::#variant_name { #(#named,)* .. } => write!(f, #message #(, #named = #named)*),
                            }
                        }
                    };
                    Ok(arm)
                })
                .collect::<syn::Result<Vec<_>>>()?;

            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data_struct) => {
            let message = extract_error_message(
                &input.attrs,
                &input.ident,
                &format!("type `{}`", input.ident),
            )?;
            let used = referenced_args(&message);

            match &data_struct.fields {
                Fields::Unit => quote! { write!(f, #message) },
                Fields::Named(fields) => {
                    let named: Vec<_> = fields
                        .named
                        .iter()
                        .filter_map(|field| field.ident.as_ref())
                        .filter(|ident| used.contains(&ident.to_string()))
                        .collect();
                    quote! { write!(f, #message #(, #named = self.#named)*) }
                }
                Fields::Unnamed(fields) => {
                    let count = fields.unnamed.len();
                    let args = (0..count)
                        .filter(|i| used.contains(&i.to_string()))
                        .map(|i| {
                            let ident = format_ident!("f{}", i);
                            let index = syn::Index::from(i);
                            quote!(#ident = self.#index)
                        });
                    let format_str = positional_to_named(&message, count);
                    quote! { write!(f, #format_str #(, #args)*) }
                }
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #display_body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Reads the message from an `#[error("...")]` attribute.
fn extract_error_message<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    for attr in attrs {
        if !attr.path().is_ident("error") {
            continue;
        }
        if let Meta::List(meta_list) = &attr.meta {
            let lit = syn::parse2::<Lit>(meta_list.tokens.clone()).map_err(|_| {
                syn::Error::new_spanned(
                    &attr.meta,
                    "expected a string literal like #[error(\"contract not found: {0}\")]",
                )
            })?;
            if let Lit::Str(lit_str) = lit {
                return Ok(lit_str.value());
            }
        }
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "invalid #[error] attribute; use #[error(\"message\")]",
        ));
    }

    Err(syn::Error::new_spanned(
        target,
        format!("missing #[error(\"...\")] attribute on {}", target_desc),
    ))
}

/// Names of the arguments a format string refers to, e.g. `{0}` or `{limit:?}`.
fn referenced_args(format_str: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = format_str.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
            }
            '{' => {
                let mut name = String::new();
                for inner in chars.by_ref() {
                    if inner == '}' || inner == ':' {
                        break;
                    }
                    name.push(inner);
                }
                let name = name.trim().to_string();
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
            _ => {}
        }
    }
    names
}

/// Rewrites positional arguments `{0}`, `{1:?}` to named ones `{f0}`, `{f1:?}`.
fn positional_to_named(format_str: &str, field_count: usize) -> String {
    let mut result = format_str.to_string();
    for i in (0..field_count).rev() {
        result = result
            .replace(&format!("{{{}}}", i), &format!("{{f{}}}", i))
            .replace(&format!("{{{}:", i), &format!("{{f{}:", i));
    }
    result
}
