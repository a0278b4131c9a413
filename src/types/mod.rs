//! Primitive types shared across the host.
//!
//! - `Hash`: 32-byte SHA3-256 hashes, also the code checksum
//! - `Address`: 20-byte account and contract addresses
//! - `Coin`: denominated token amounts
//! - `encoding`: deterministic binary codec for persisted records

pub mod address;
pub mod coin;
pub mod encoding;
pub mod hash;
