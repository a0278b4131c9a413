//! Ordered key-value store abstraction shared by every part of the host.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ops::Bound;

/// Ordered byte-keyed storage.
///
/// All methods take `&self`; implementations use interior mutability so a
/// store can be shared by the host, its collaborators and nested contexts
/// while a call is in progress. Execution is single-threaded.
pub trait KvStore {
    /// Retrieves a value by key, returning `None` if the key does not exist.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }

    /// Stores a key-value pair, overwriting any existing value.
    fn set(&self, key: &[u8], value: Vec<u8>);

    fn delete(&self, key: &[u8]);

    /// Returns entries with `start <= key < end` in ascending key order.
    /// `None` as `end` means unbounded.
    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)>;

    /// Applies a batch of writes. `None` values are deletions.
    fn apply_batch(&self, writes: Vec<(Vec<u8>, Option<Vec<u8>>)>) {
        for (key, value) in writes {
            match value {
                Some(v) => self.set(&key, v),
                None => self.delete(&key),
            }
        }
    }

    /// All entries whose key starts with `prefix`.
    fn prefix_range(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let end = prefix_end(prefix);
        self.range(prefix, end.as_deref())
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Returns `None` when no such key exists (empty or all-`0xff` prefix).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

pub(crate) fn bounds<'a>(start: &'a [u8], end: Option<&'a [u8]>) -> (Bound<&'a [u8]>, Bound<&'a [u8]>) {
    (
        Bound::Included(start),
        end.map_or(Bound::Unbounded, Bound::Excluded),
    )
}

/// In-memory store backed by a `BTreeMap`.
#[derive(Default)]
pub struct MemStore {
    data: RefCell<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.borrow().get(key).cloned()
    }

    fn has(&self, key: &[u8]) -> bool {
        self.data.borrow().contains_key(key)
    }

    fn set(&self, key: &[u8], value: Vec<u8>) {
        self.data.borrow_mut().insert(key.to_vec(), value);
    }

    fn delete(&self, key: &[u8]) {
        self.data.borrow_mut().remove(key);
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
        if end.is_some_and(|e| e <= start) {
            return Vec::new();
        }
        self.data
            .borrow()
            .range::<[u8], _>(bounds(start, end))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
