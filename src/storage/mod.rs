//! Storage layer of the contract host.
//!
//! - [`kv_store`]: the ordered [`KvStore`](kv_store::KvStore) abstraction and
//!   the in-memory [`MemStore`](kv_store::MemStore)
//! - [`overlay`]: copy-on-write layer used as the sub-message sandbox
//! - [`prefix_store`]: per-contract partitions with a read-only mode

pub mod kv_store;
pub mod overlay;
pub mod prefix_store;
