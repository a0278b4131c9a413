//! Permission descriptors for restricted actions.

use crate::types::address::Address;
use host_derive::BinaryCodec;
use serde::{Deserialize, Serialize};

/// Who may perform a restricted action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BinaryCodec)]
#[serde(rename_all = "snake_case")]
pub enum AccessConfig {
    Nobody,
    OnlyAddress(Address),
    Everybody,
}

impl AccessConfig {
    pub fn allowed(&self, actor: &Address) -> bool {
        match self {
            AccessConfig::Nobody => false,
            AccessConfig::OnlyAddress(addr) => addr == actor,
            AccessConfig::Everybody => true,
        }
    }
}

/// Chain-wide default from which a code's instantiate permission is derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, BinaryCodec)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    Nobody,
    OnlyAddress,
    Everybody,
}

impl AccessType {
    /// Binds the access type to a concrete address where it needs one.
    pub fn with(self, addr: Address) -> AccessConfig {
        match self {
            AccessType::Nobody => AccessConfig::Nobody,
            AccessType::OnlyAddress => AccessConfig::OnlyAddress(addr),
            AccessType::Everybody => AccessConfig::Everybody,
        }
    }
}
