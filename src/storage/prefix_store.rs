//! Per-contract storage partition.
//!
//! A [`PrefixStore`] prepends a fixed prefix to every key and strips it from
//! iteration results, so a contract can only ever address keys inside its own
//! partition. Query execution opens the partition read-only; any write
//! attempt is then rejected with [`StorageError::ReadOnly`].

use crate::storage::kv_store::{prefix_end, KvStore};
use host_derive::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("write rejected: contract storage is read-only")]
    ReadOnly,
}

pub struct PrefixStore<'a> {
    store: &'a dyn KvStore,
    prefix: Vec<u8>,
    read_only: bool,
}

impl<'a> PrefixStore<'a> {
    pub fn new(store: &'a dyn KvStore, prefix: Vec<u8>) -> Self {
        Self {
            store,
            prefix,
            read_only: false,
        }
    }

    pub fn read_only(store: &'a dyn KvStore, prefix: Vec<u8>) -> Self {
        Self {
            store,
            prefix,
            read_only: true,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        let mut full = Vec::with_capacity(self.prefix.len() + key.len());
        full.extend_from_slice(&self.prefix);
        full.extend_from_slice(key);
        full
    }

    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.store.get(&self.full_key(key))
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.store.has(&self.full_key(key))
    }

    pub fn set(&self, key: &[u8], value: Vec<u8>) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        self.store.set(&self.full_key(key), value);
        Ok(())
    }

    pub fn remove(&self, key: &[u8]) -> Result<(), StorageError> {
        if self.read_only {
            return Err(StorageError::ReadOnly);
        }
        self.store.delete(&self.full_key(key));
        Ok(())
    }

    /// Entries with `start <= key < end` inside the partition, with the
    /// prefix stripped from the returned keys.
    pub fn range(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
        let full_start = self.full_key(start.unwrap_or_default());
        let full_end = match end {
            Some(end) => Some(self.full_key(end)),
            None => prefix_end(&self.prefix),
        };
        let prefix_len = self.prefix.len();
        self.store
            .range(&full_start, full_end.as_deref())
            .into_iter()
            .map(|(k, v)| (k[prefix_len..].to_vec(), v))
            .collect()
    }

    /// Every entry of the partition in key order.
    pub fn entries(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.range(None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keys::contract_store_prefix;
    use crate::storage::kv_store::MemStore;
    use crate::types::address::Address;
    use proptest::prelude::*;

    #[test]
    fn keys_are_prefixed_in_the_shared_store() {
        let store = MemStore::new();
        let partition = PrefixStore::new(&store, vec![0x03, 0xaa]);
        partition.set(b"k", b"v".to_vec()).unwrap();
        assert_eq!(store.get(&[0x03, 0xaa, b'k']), Some(b"v".to_vec()));
        assert_eq!(partition.get(b"k"), Some(b"v".to_vec()));
    }

    #[test]
    fn read_only_rejects_writes_but_reads() {
        let store = MemStore::new();
        PrefixStore::new(&store, vec![9]).set(b"k", vec![1]).unwrap();

        let view = PrefixStore::read_only(&store, vec![9]);
        assert_eq!(view.set(b"k", vec![2]), Err(StorageError::ReadOnly));
        assert_eq!(view.remove(b"k"), Err(StorageError::ReadOnly));
        assert_eq!(view.get(b"k"), Some(vec![1]));
    }

    #[test]
    fn range_strips_prefix_and_respects_bounds() {
        let store = MemStore::new();
        let partition = PrefixStore::new(&store, vec![7]);
        for key in [b"a", b"b", b"c"] {
            partition.set(key, key.to_vec()).unwrap();
        }
        store.set(&[8, b'a'], vec![]);

        let keys: Vec<_> = partition
            .range(Some(b"b"), None)
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(partition.entries().len(), 3);
        assert_eq!(partition.range(None, Some(b"b")).len(), 1);
    }

    proptest! {
        #[test]
        fn partitions_never_see_each_other(
            a in any::<[u8; 20]>(),
            b in any::<[u8; 20]>(),
            writes in proptest::collection::vec(
                (proptest::collection::vec(any::<u8>(), 0..24), proptest::collection::vec(any::<u8>(), 0..8)),
                1..32,
            ),
        ) {
            prop_assume!(a != b);
            let store = MemStore::new();
            let first = PrefixStore::new(&store, contract_store_prefix(&Address(a)));
            let second = PrefixStore::new(&store, contract_store_prefix(&Address(b)));

            for (key, value) in &writes {
                first.set(key, value.clone()).unwrap();
            }
            prop_assert!(second.entries().is_empty());
            for (key, _) in &writes {
                prop_assert_eq!(second.get(key), None);
            }
        }
    }
}
