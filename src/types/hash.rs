//! 32-byte SHA3-256 hash, used as the content hash (checksum) of stored code.

use crate::types::encoding::EncodeSink;
use host_derive::BinaryCodec;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};
use std::fmt;

/// SHA3-256 hash length in bytes.
pub const HASH_LEN: usize = 32;

/// Fixed-size 32-byte hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, BinaryCodec, Default, Hash, Ord, PartialOrd)]
pub struct Hash(pub [u8; HASH_LEN]);

/// Content hash the execution engine returns for compiled code.
pub type Checksum = Hash;

impl Hash {
    pub const fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Creates a builder for incremental hashing.
    pub fn sha3() -> HashBuilder {
        HashBuilder::new()
    }

    /// Hashes a single byte slice.
    pub fn digest(data: &[u8]) -> Hash {
        let mut h = Hash::sha3();
        h.update(data);
        h.finalize()
    }

    /// Parses a 64 character hex string.
    pub fn from_hex(s: &str) -> Option<Hash> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; HASH_LEN] = bytes.try_into().ok()?;
        Some(Hash(arr))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).ok_or_else(|| D::Error::custom(format!("invalid hash: {s}")))
    }
}

/// Incremental SHA3-256 hash builder.
///
/// Implements [`EncodeSink`] so encodable values can be hashed directly.
pub struct HashBuilder {
    hasher: Sha3_256,
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HashBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha3_256::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Feeds data and returns the builder, for domain-separated one-liners.
    pub fn chain(mut self, data: &[u8]) -> Self {
        self.hasher.update(data);
        self
    }

    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl EncodeSink for HashBuilder {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}
