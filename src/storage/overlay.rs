//! Copy-on-write overlay over a base store.
//!
//! Sub-messages run against an [`OverlayStore`]: reads fall through to the
//! base for keys the overlay has not touched, writes stay in the overlay
//! until [`OverlayStore::commit`] replays them onto the base. Dropping the
//! overlay discards every write at once.

use crate::storage::kv_store::{bounds, KvStore};
use std::cell::RefCell;
use std::collections::BTreeMap;

pub struct OverlayStore<'a> {
    /// Underlying storage for read-through on cache misses.
    base: &'a dyn KvStore,
    /// Pending writes: `Some(value)` for insertions, `None` for deletions.
    writes: RefCell<BTreeMap<Vec<u8>, Option<Vec<u8>>>>,
}

impl<'a> OverlayStore<'a> {
    pub fn new(base: &'a dyn KvStore) -> Self {
        Self {
            base,
            writes: RefCell::new(BTreeMap::new()),
        }
    }

    /// Consumes the overlay and returns the pending writes in key order.
    pub fn into_writes(self) -> Vec<(Vec<u8>, Option<Vec<u8>>)> {
        self.writes.into_inner().into_iter().collect()
    }

    /// Replays all pending writes onto the base store.
    pub fn commit(self) {
        let base = self.base;
        base.apply_batch(self.into_writes());
    }

    pub fn pending(&self) -> usize {
        self.writes.borrow().len()
    }
}

impl<'a> KvStore for OverlayStore<'a> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(v) = self.writes.borrow().get(key) {
            return v.clone();
        }
        self.base.get(key)
    }

    fn set(&self, key: &[u8], value: Vec<u8>) {
        self.writes.borrow_mut().insert(key.to_vec(), Some(value));
    }

    fn delete(&self, key: &[u8]) {
        self.writes.borrow_mut().insert(key.to_vec(), None);
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
        if end.is_some_and(|e| e <= start) {
            return Vec::new();
        }
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.range(start, end).into_iter().collect();
        for (key, value) in self.writes.borrow().range::<[u8], _>(bounds(start, end)) {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }
}
