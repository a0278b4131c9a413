//! 20-byte account and contract addresses.

use crate::types::hash::Hash;
use host_derive::BinaryCodec;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Address length in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Fixed-size 20-byte address identifying accounts and contract instances.
///
/// Human-readable form is lowercase hex, which is also how it is serialized
/// for the execution engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, BinaryCodec)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Takes the last 20 bytes of a hash.
    pub fn from_hash(hash: &Hash) -> Address {
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&hash.0[hash.0.len() - ADDRESS_LEN..]);
        Address(out)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Address> {
        let arr: [u8; ADDRESS_LEN] = bytes.try_into().ok()?;
        Some(Address(arr))
    }

    pub fn from_hex(s: &str) -> Option<Address> {
        Address::from_slice(&hex::decode(s).ok()?)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_hex(&s).ok_or_else(|| D::Error::custom(format!("invalid address: {s}")))
    }
}
