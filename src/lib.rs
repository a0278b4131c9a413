//! Smart-contract execution host.
//!
//! Stores contract bytecode, manages contract instances and their isolated
//! storage, meters gas, routes contract-emitted messages and queries, and
//! imports and exports chain state. Bytecode execution itself is delegated
//! to an [`Engine`](virtual_machine::engine::Engine).

pub mod core;
pub mod host;
pub mod storage;
pub mod types;
pub mod utils;
pub mod virtual_machine;
