//! Contract instance metadata, history and address derivation.

use crate::types::address::Address;
use crate::types::hash::Hash;
use host_derive::BinaryCodec;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, BinaryCodec)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active = 1,
    Inactive = 2,
}

/// Block height plus index of the transaction inside the block.
///
/// Ordering follows chain order, which the byte form preserves.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, BinaryCodec,
)]
pub struct AbsoluteTxPosition {
    pub block_height: u64,
    pub tx_index: u64,
}

impl AbsoluteTxPosition {
    pub const LEN: usize = 16;

    /// Big-endian form used inside store keys.
    pub fn bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        out[..8].copy_from_slice(&self.block_height.to_be_bytes());
        out[8..].copy_from_slice(&self.tx_index.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::LEN {
            return None;
        }
        let mut height = [0u8; 8];
        let mut index = [0u8; 8];
        height.copy_from_slice(&bytes[..8]);
        index.copy_from_slice(&bytes[8..]);
        Some(Self {
            block_height: u64::from_be_bytes(height),
            tx_index: u64::from_be_bytes(index),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, BinaryCodec)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOperation {
    Init = 1,
    Migrate = 2,
    Genesis = 3,
}

/// One code change in a contract's life.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BinaryCodec)]
pub struct ContractCodeHistoryEntry {
    pub operation: HistoryOperation,
    pub code_id: u64,
    pub updated: AbsoluteTxPosition,
    pub msg: Vec<u8>,
}

/// Metadata of a contract instance, keyed by its address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BinaryCodec)]
pub struct ContractInfo {
    pub code_id: u64,
    pub creator: Address,
    pub admin: Option<Address>,
    pub label: String,
    pub created: AbsoluteTxPosition,
    pub status: ContractStatus,
    pub ibc_port_id: Option<String>,
}

impl ContractInfo {
    pub fn new(
        code_id: u64,
        creator: Address,
        admin: Option<Address>,
        label: String,
        created: AbsoluteTxPosition,
    ) -> Self {
        Self {
            code_id,
            creator,
            admin,
            label,
            created,
            status: ContractStatus::Active,
            ibc_port_id: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ContractStatus::Active
    }

    pub fn initial_history(&self, init_msg: &[u8]) -> ContractCodeHistoryEntry {
        ContractCodeHistoryEntry {
            operation: HistoryOperation::Init,
            code_id: self.code_id,
            updated: self.created,
            msg: init_msg.to_vec(),
        }
    }

    /// Points the contract at `new_code_id` and returns the history entry.
    pub fn add_migration(
        &mut self,
        position: AbsoluteTxPosition,
        new_code_id: u64,
        msg: &[u8],
    ) -> ContractCodeHistoryEntry {
        self.code_id = new_code_id;
        ContractCodeHistoryEntry {
            operation: HistoryOperation::Migrate,
            code_id: new_code_id,
            updated: position,
            msg: msg.to_vec(),
        }
    }

    /// Drops the creation position (it refers to another chain) and
    /// returns the single entry that replaces the imported history.
    pub fn reset_from_genesis(&mut self, position: AbsoluteTxPosition) -> ContractCodeHistoryEntry {
        self.created = position;
        ContractCodeHistoryEntry {
            operation: HistoryOperation::Genesis,
            code_id: self.code_id,
            updated: position,
            msg: Vec::new(),
        }
    }
}

/// A raw entry of a contract's storage partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    #[serde(with = "hex::serde")]
    pub key: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub value: Vec<u8>,
}

/// Deterministic address for the `instance_id`-th contract, made from `code_id`.
///
/// The pair is packed as `code_id << 32 + instance_id`, written as an
/// unsigned varint after a `'C'` marker into a 20-byte buffer and hashed.
pub fn contract_address(code_id: u64, instance_id: u64) -> Address {
    let mut buf = [0u8; 20];
    buf[0] = b'C';
    put_uvarint(&mut buf[1..], (code_id << 32).wrapping_add(instance_id));
    Address::from_hash(&Hash::digest(&buf))
}

/// Writes `value` as a LEB128 varint; `out` must hold at least 10 bytes.
fn put_uvarint(out: &mut [u8], mut value: u64) -> usize {
    let mut i = 0;
    while value >= 0x80 {
        out[i] = (value as u8) | 0x80;
        value >>= 7;
        i += 1;
    }
    out[i] = value as u8;
    i + 1
}

/// IBC port bound for a contract with IBC entry points.
pub fn ibc_port_id(contract: &Address) -> String {
    format!("wasm.{}", contract)
}
