//! Execution context threaded through every host operation.

use crate::core::contract::AbsoluteTxPosition;
use crate::core::gas::GasMeter;
use crate::storage::kv_store::KvStore;
use crate::virtual_machine::types::{BlockEnv, Event};
use std::cell::RefCell;

/// Block the current transaction is executed in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockInfo {
    pub height: u64,
    /// Nanoseconds since the Unix epoch.
    pub time: u64,
    pub chain_id: String,
}

impl BlockInfo {
    pub fn to_env(&self) -> BlockEnv {
        BlockEnv {
            height: self.height,
            time: self.time,
            chain_id: self.chain_id.clone(),
        }
    }
}

/// Collects events emitted during an operation.
#[derive(Debug, Default)]
pub struct EventManager {
    events: RefCell<Vec<Event>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    pub fn emit_all(&self, events: impl IntoIterator<Item = Event>) {
        self.events.borrow_mut().extend(events);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    pub fn into_events(self) -> Vec<Event> {
        self.events.into_inner()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

/// Store, gas meter, event sink and block position of the running operation.
///
/// A context is a bundle of borrows and is `Copy`. Nested scopes derive a new
/// context with one part swapped (an overlay store for a sub-message, a
/// limited gas meter, a fresh event sink) and leave the parent untouched.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    store: &'a dyn KvStore,
    gas_meter: &'a GasMeter,
    events: &'a EventManager,
    block: &'a BlockInfo,
    tx_index: u64,
}

impl<'a> Context<'a> {
    pub fn new(
        store: &'a dyn KvStore,
        gas_meter: &'a GasMeter,
        events: &'a EventManager,
        block: &'a BlockInfo,
    ) -> Self {
        Self {
            store,
            gas_meter,
            events,
            block,
            tx_index: 0,
        }
    }

    pub fn with_tx_index(self, tx_index: u64) -> Self {
        Self { tx_index, ..self }
    }

    pub fn with_store<'b>(&self, store: &'b dyn KvStore) -> Context<'b>
    where
        'a: 'b,
    {
        Context {
            store,
            gas_meter: self.gas_meter,
            events: self.events,
            block: self.block,
            tx_index: self.tx_index,
        }
    }

    pub fn with_gas_meter<'b>(&self, gas_meter: &'b GasMeter) -> Context<'b>
    where
        'a: 'b,
    {
        Context {
            store: self.store,
            gas_meter,
            events: self.events,
            block: self.block,
            tx_index: self.tx_index,
        }
    }

    pub fn with_event_manager<'b>(&self, events: &'b EventManager) -> Context<'b>
    where
        'a: 'b,
    {
        Context {
            store: self.store,
            gas_meter: self.gas_meter,
            events,
            block: self.block,
            tx_index: self.tx_index,
        }
    }

    pub fn store(&self) -> &'a dyn KvStore {
        self.store
    }

    pub fn gas_meter(&self) -> &'a GasMeter {
        self.gas_meter
    }

    pub fn events(&self) -> &'a EventManager {
        self.events
    }

    pub fn block(&self) -> &'a BlockInfo {
        self.block
    }

    pub fn tx_index(&self) -> u64 {
        self.tx_index
    }

    /// Position of the current transaction on the chain.
    pub fn tx_position(&self) -> AbsoluteTxPosition {
        AbsoluteTxPosition {
            block_height: self.block.height,
            tx_index: self.tx_index,
        }
    }
}
