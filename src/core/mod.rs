//! Host-side data model and the primitives every operation is built on.
//!
//! - `Context`: store, gas meter, event sink and block of the running call
//! - `GasMeter`: host gas accounting and the engine gas conversion
//! - `CodeInfo` / `ContractInfo`: persisted metadata and history
//! - `AuthorizationPolicy`: pluggable permission checks

pub mod access;
pub mod authz;
pub mod code;
pub mod context;
pub mod contract;
pub mod errors;
pub mod events;
pub mod gas;
pub mod keys;
pub mod params;
