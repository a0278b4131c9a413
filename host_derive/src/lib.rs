//! Derive macros for the contract host crate.
//!
//! Provides:
//! - `#[derive(BinaryCodec)]` - deterministic binary encoding for persisted records
//! - `#[derive(Error)]` - `Display` and `Error` implementations for error enums

mod binary_codec;
mod error;

use proc_macro::TokenStream;

/// Implements `Encode` and `Decode` from `crate::types::encoding`.
#[proc_macro_derive(BinaryCodec, attributes(binary_codec))]
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    binary_codec::derive_binary_codec(input)
}

/// Implements `Display` and `Error` from `#[error("...")]` messages.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
