//! Error taxonomy of the contract host.

use crate::types::address::Address;
use crate::types::encoding::DecodeError;
use host_derive::Error;
use std::fmt;

/// Errors returned by host operations.
///
/// Engine failures are wrapped with the operation that triggered them and
/// keep the engine's message. [`HostError::OutOfGas`] is the only fatal
/// kind: it unwinds the whole operation and is never converted, except by
/// the sub-message sandbox which reports a limited sub-meter running dry as
/// [`HostError::SubMsgOutOfGas`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("unauthorized: {0}")]
    Unauthorized(&'static str),
    #[error("not found: {0}")]
    NotFound(Missing),
    #[error("duplicate: {0}")]
    Duplicate(Duplicate),
    #[error("create wasm contract failed: {0}")]
    CreateFailed(String),
    #[error("instantiate wasm contract failed: {0}")]
    InstantiateFailed(String),
    #[error("execute wasm contract failed: {0}")]
    ExecuteFailed(String),
    #[error("migrate wasm contract failed: {0}")]
    MigrationFailed(String),
    #[error("query wasm contract failed: {0}")]
    QueryFailed(String),
    #[error("pin contract failed: {0}")]
    PinFailed(String),
    #[error("unpin contract failed: {0}")]
    UnpinFailed(String),
    #[error("invalid: {0}")]
    Invalid(Invalid),
    #[error("account already exists: {0}")]
    AccountAlreadyExists(Address),
    #[error("out of gas in location: {0}")]
    OutOfGas(String),
    #[error("submessage hit gas limit {0}")]
    SubMsgOutOfGas(u64),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("send disabled for denom {0}")]
    SendDisabled(String),
    #[error("unsupported message: {0}")]
    UnsupportedMessage(&'static str),
    #[error("corrupt record under key {key}: {reason}")]
    Corrupt { key: String, reason: DecodeError },
    #[error("{0}")]
    External(String),
}

impl HostError {
    /// True for errors that must abort the entire calling operation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HostError::OutOfGas(_))
    }

    pub(crate) fn corrupt(key: &[u8], reason: DecodeError) -> Self {
        HostError::Corrupt {
            key: hex::encode(key),
            reason,
        }
    }
}

/// What a [`HostError::NotFound`] refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Missing {
    Code(u64),
    Contract(Address),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Code(id) => write!(f, "code {}", id),
            Missing::Contract(addr) => write!(f, "contract {}", addr),
        }
    }
}

/// What a [`HostError::Duplicate`] refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Duplicate {
    CodeId(u64),
    Contract(Address),
    AutoIncrement(String),
    StateKey(String),
}

impl fmt::Display for Duplicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Duplicate::CodeId(id) => write!(f, "code id {}", id),
            Duplicate::Contract(addr) => write!(f, "contract {}", addr),
            Duplicate::AutoIncrement(key) => write!(f, "autoincrement id {}", key),
            Duplicate::StateKey(key) => write!(f, "state key {}", key),
        }
    }
}

/// What a [`HostError::Invalid`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalid {
    InactiveContract,
    PortMismatch,
    CodeHashMismatch,
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Invalid::InactiveContract => "inactive contract",
            Invalid::PortMismatch => "ibc port mismatch: code requires ibc callbacks",
            Invalid::CodeHashMismatch => "code hashes not same",
        })
    }
}
