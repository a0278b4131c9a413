//! Persisted key layout.
//!
//! Numeric segments are big-endian so that ordered iteration follows
//! numeric order.

use crate::core::contract::AbsoluteTxPosition;
use crate::types::address::{Address, ADDRESS_LEN};

pub const CODE_KEY_PREFIX: &[u8] = &[0x01];
pub const CONTRACT_KEY_PREFIX: &[u8] = &[0x02];
pub const CONTRACT_STORE_PREFIX: &[u8] = &[0x03];
pub const CONTRACT_HISTORY_PREFIX: &[u8] = &[0x04];
pub const CONTRACT_BY_CODE_PREFIX: &[u8] = &[0x05];
pub const PINNED_CODE_PREFIX: &[u8] = &[0x06];
pub const SEQUENCE_PREFIX: &[u8] = &[0x07];

pub const LAST_CODE_ID: &str = "lastCodeId";
pub const LAST_INSTANCE_ID: &str = "lastContractId";

fn join(prefix: &[u8], parts: &[&[u8]]) -> Vec<u8> {
    let len = prefix.len() + parts.iter().map(|p| p.len()).sum::<usize>();
    let mut key = Vec::with_capacity(len);
    key.extend_from_slice(prefix);
    for part in parts {
        key.extend_from_slice(part);
    }
    key
}

/// Key of the named sequence counter.
pub fn sequence_key(name: &str) -> Vec<u8> {
    join(SEQUENCE_PREFIX, &[name.as_bytes()])
}

pub fn code_key(code_id: u64) -> Vec<u8> {
    join(CODE_KEY_PREFIX, &[&code_id.to_be_bytes()])
}

pub fn contract_key(addr: &Address) -> Vec<u8> {
    join(CONTRACT_KEY_PREFIX, &[addr.as_slice()])
}

/// Prefix of a contract's storage partition.
pub fn contract_store_prefix(addr: &Address) -> Vec<u8> {
    join(CONTRACT_STORE_PREFIX, &[addr.as_slice()])
}

pub fn history_prefix(addr: &Address) -> Vec<u8> {
    join(CONTRACT_HISTORY_PREFIX, &[addr.as_slice()])
}

pub fn history_key(addr: &Address, pos: u64) -> Vec<u8> {
    join(CONTRACT_HISTORY_PREFIX, &[addr.as_slice(), &pos.to_be_bytes()])
}

/// Position encoded at the end of a history key.
pub fn history_position(key: &[u8]) -> Option<u64> {
    let tail = key.len().checked_sub(8)?;
    let bytes: [u8; 8] = key[tail..].try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

pub fn contract_by_code_prefix(code_id: u64) -> Vec<u8> {
    join(CONTRACT_BY_CODE_PREFIX, &[&code_id.to_be_bytes()])
}

pub fn contract_by_code_key(code_id: u64, created: &AbsoluteTxPosition, addr: &Address) -> Vec<u8> {
    join(
        CONTRACT_BY_CODE_PREFIX,
        &[&code_id.to_be_bytes(), &created.bytes(), addr.as_slice()],
    )
}

/// Contract address at the end of a secondary index key.
pub fn address_from_index_key(key: &[u8]) -> Option<Address> {
    let tail = key.len().checked_sub(ADDRESS_LEN)?;
    Address::from_slice(&key[tail..])
}

pub fn pinned_code_key(code_id: u64) -> Vec<u8> {
    join(PINNED_CODE_PREFIX, &[&code_id.to_be_bytes()])
}

/// Trailing big-endian id of a code or pinned-code key.
pub fn code_id_from_key(key: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = key.get(1..)?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}
