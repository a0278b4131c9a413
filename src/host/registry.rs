//! Reading and writing the host's persisted records.
//!
//! Records use the binary codec; a record that fails to decode is reported
//! as [`HostError::Corrupt`] rather than treated as absent.

use crate::core::code::CodeInfo;
use crate::core::contract::{ContractCodeHistoryEntry, ContractInfo};
use crate::core::errors::HostError;
use crate::core::keys;
use crate::storage::kv_store::KvStore;
use crate::types::address::Address;
use crate::types::encoding::{Decode, DecodeError, Encode};

const PINNED_MARKER: &[u8] = &[1];

fn load<T: Decode>(store: &dyn KvStore, key: &[u8]) -> Result<Option<T>, HostError> {
    store
        .get(key)
        .map(|raw| T::from_bytes(&raw).map_err(|e| HostError::corrupt(key, e)))
        .transpose()
}

pub fn load_code_info(store: &dyn KvStore, code_id: u64) -> Result<Option<CodeInfo>, HostError> {
    load(store, &keys::code_key(code_id))
}

pub fn store_code_info(store: &dyn KvStore, code_id: u64, info: &CodeInfo) {
    store.set(&keys::code_key(code_id), info.to_bytes());
}

pub fn has_code(store: &dyn KvStore, code_id: u64) -> bool {
    store.has(&keys::code_key(code_id))
}

/// All code infos ordered by code id.
pub fn code_infos(store: &dyn KvStore) -> Result<Vec<(u64, CodeInfo)>, HostError> {
    store
        .prefix_range(keys::CODE_KEY_PREFIX)
        .into_iter()
        .map(|(key, raw)| {
            let id = keys::code_id_from_key(&key)
                .ok_or_else(|| HostError::corrupt(&key, DecodeError::InvalidValue))?;
            let info = CodeInfo::from_bytes(&raw).map_err(|e| HostError::corrupt(&key, e))?;
            Ok((id, info))
        })
        .collect()
}

pub fn load_contract_info(
    store: &dyn KvStore,
    addr: &Address,
) -> Result<Option<ContractInfo>, HostError> {
    load(store, &keys::contract_key(addr))
}

pub fn has_contract(store: &dyn KvStore, addr: &Address) -> bool {
    store.has(&keys::contract_key(addr))
}

/// Writes the contract record and its entry in the by-code index.
pub fn store_contract_info(store: &dyn KvStore, addr: &Address, info: &ContractInfo) {
    store.set(&keys::contract_key(addr), info.to_bytes());
    store.set(
        &keys::contract_by_code_key(info.code_id, &info.created, addr),
        Vec::new(),
    );
}

/// Removes the by-code index entry for the contract's current code.
pub fn remove_contract_index(store: &dyn KvStore, addr: &Address, info: &ContractInfo) {
    store.delete(&keys::contract_by_code_key(info.code_id, &info.created, addr));
}

/// All contract infos ordered by address.
pub fn contract_infos(store: &dyn KvStore) -> Result<Vec<(Address, ContractInfo)>, HostError> {
    store
        .prefix_range(keys::CONTRACT_KEY_PREFIX)
        .into_iter()
        .map(|(key, raw)| {
            let addr = Address::from_slice(&key[keys::CONTRACT_KEY_PREFIX.len()..])
                .ok_or_else(|| HostError::corrupt(&key, DecodeError::InvalidValue))?;
            let info = ContractInfo::from_bytes(&raw).map_err(|e| HostError::corrupt(&key, e))?;
            Ok((addr, info))
        })
        .collect()
}

/// Addresses of the instances of `code_id` in creation order.
pub fn contracts_by_code(store: &dyn KvStore, code_id: u64) -> Vec<Address> {
    store
        .prefix_range(&keys::contract_by_code_prefix(code_id))
        .into_iter()
        .filter_map(|(key, _)| keys::address_from_index_key(&key))
        .collect()
}

/// Appends entries after the last recorded position (positions start at 1).
pub fn append_history(store: &dyn KvStore, addr: &Address, entries: &[ContractCodeHistoryEntry]) {
    let mut pos = store
        .prefix_range(&keys::history_prefix(addr))
        .last()
        .and_then(|(key, _)| keys::history_position(key))
        .unwrap_or(0);
    for entry in entries {
        pos += 1;
        store.set(&keys::history_key(addr, pos), entry.to_bytes());
    }
}

pub fn load_history(
    store: &dyn KvStore,
    addr: &Address,
) -> Result<Vec<ContractCodeHistoryEntry>, HostError> {
    store
        .prefix_range(&keys::history_prefix(addr))
        .into_iter()
        .map(|(key, raw)| {
            ContractCodeHistoryEntry::from_bytes(&raw).map_err(|e| HostError::corrupt(&key, e))
        })
        .collect()
}

fn read_sequence(store: &dyn KvStore, key: &[u8]) -> Result<Option<u64>, HostError> {
    match store.get(key) {
        None => Ok(None),
        Some(raw) => {
            let bytes: [u8; 8] = raw
                .as_slice()
                .try_into()
                .map_err(|_| HostError::corrupt(key, DecodeError::InvalidValue))?;
            Ok(Some(u64::from_be_bytes(bytes)))
        }
    }
}

/// Next value of a sequence without advancing it. Sequences start at 1.
pub fn peek_id(store: &dyn KvStore, name: &str) -> Result<u64, HostError> {
    Ok(read_sequence(store, &keys::sequence_key(name))?.unwrap_or(1))
}

/// Returns the next value of a sequence and advances it.
pub fn next_id(store: &dyn KvStore, name: &str) -> Result<u64, HostError> {
    let key = keys::sequence_key(name);
    let id = read_sequence(store, &key)?.unwrap_or(1);
    store.set(&key, (id + 1).to_be_bytes().to_vec());
    Ok(id)
}

/// Sets a sequence that has never been used. Returns false if it is set.
pub fn init_sequence(store: &dyn KvStore, name: &str, value: u64) -> bool {
    let key = keys::sequence_key(name);
    if store.has(&key) {
        return false;
    }
    store.set(&key, value.to_be_bytes().to_vec());
    true
}

pub fn set_pinned(store: &dyn KvStore, code_id: u64) {
    store.set(&keys::pinned_code_key(code_id), PINNED_MARKER.to_vec());
}

pub fn remove_pinned(store: &dyn KvStore, code_id: u64) {
    store.delete(&keys::pinned_code_key(code_id));
}

pub fn is_pinned(store: &dyn KvStore, code_id: u64) -> bool {
    store.has(&keys::pinned_code_key(code_id))
}

pub fn pinned_code_ids(store: &dyn KvStore) -> Vec<u64> {
    store
        .prefix_range(keys::PINNED_CODE_PREFIX)
        .into_iter()
        .filter_map(|(key, _)| keys::code_id_from_key(&key))
        .collect()
}
