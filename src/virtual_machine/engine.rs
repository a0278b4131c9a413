//! Capability contract between the host and the execution engine.
//!
//! The engine owns bytecode validation, compilation, caching and
//! interpretation. The host hands it a checksum, the environment, the
//! contract's storage partition, an address [`Api`], a [`Querier`] and a gas
//! view, and gets back a [`Metered`] result. Every entry point reports the
//! gas it used, successful or not, so the host can charge it.

use crate::storage::prefix_store::{PrefixStore, StorageError};
use crate::types::address::{Address, ADDRESS_LEN};
use crate::types::hash::Checksum;
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::types::{Env, MessageInfo, QueryRequest, Reply, Response};

/// Static facts about a compiled code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalysisReport {
    /// The code exports the IBC channel and packet entry points.
    pub has_ibc_entry_points: bool,
}

/// Result of an engine call together with the engine gas it consumed.
#[derive(Debug)]
pub struct Metered<T> {
    pub result: Result<T, VmError>,
    pub gas_used: u64,
}

impl<T> Metered<T> {
    pub fn new(result: Result<T, VmError>, gas_used: u64) -> Self {
        Self { result, gas_used }
    }
}

/// Storage handle a contract sees: its own partition only.
pub trait ContractStorage {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;
    fn remove(&mut self, key: &[u8]) -> Result<(), StorageError>;
    /// Entries with `start <= key < end`, ascending.
    fn scan(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)>;
}

impl ContractStorage for PrefixStore<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        PrefixStore::get(self, key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        PrefixStore::set(self, key, value.to_vec())
    }

    fn remove(&mut self, key: &[u8]) -> Result<(), StorageError> {
        PrefixStore::remove(self, key)
    }

    fn scan(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.range(start, end)
    }
}

/// Address conversions offered to contracts.
pub trait Api {
    fn canonicalize_address(&self, human: &str) -> Result<Vec<u8>, VmError>;
    fn humanize_address(&self, canonical: &[u8]) -> Result<String, VmError>;
}

/// [`Api`] whose human-readable form is lowercase hex.
#[derive(Clone, Copy, Debug, Default)]
pub struct HexApi;

impl Api for HexApi {
    fn canonicalize_address(&self, human: &str) -> Result<Vec<u8>, VmError> {
        Address::from_hex(human)
            .map(|addr| addr.0.to_vec())
            .ok_or_else(|| VmError::InvalidAddress(human.to_string()))
    }

    fn humanize_address(&self, canonical: &[u8]) -> Result<String, VmError> {
        if canonical.len() != ADDRESS_LEN {
            return Err(VmError::InvalidAddress(format!(
                "expected {} bytes, got {}",
                ADDRESS_LEN,
                canonical.len()
            )));
        }
        Ok(hex::encode(canonical))
    }
}

/// Answers the contract's chain queries. `gas_limit` is in engine units.
pub trait Querier {
    fn query(&self, request: &QueryRequest, gas_limit: u64) -> Result<Vec<u8>, VmError>;
}

/// Host gas consumption expressed in engine units.
pub trait VmGasMeter {
    fn gas_consumed(&self) -> u64;
}

/// Everything an engine call may touch besides its arguments.
pub struct VmContext<'a> {
    pub store: &'a mut dyn ContractStorage,
    pub api: &'a dyn Api,
    pub querier: &'a dyn Querier,
    pub gas_meter: &'a dyn VmGasMeter,
    /// Budget for this call in engine units.
    pub gas_limit: u64,
}

/// The execution engine collaborator.
///
/// Implementations must be deterministic: the same code, environment,
/// message and storage always produce the same response and gas.
pub trait Engine {
    /// Validates and compiles `code`, returning its checksum.
    fn create(&self, code: &[u8]) -> Result<Checksum, VmError>;
    fn analyze_code(&self, checksum: &Checksum) -> Result<AnalysisReport, VmError>;
    /// Original bytecode for a checksum.
    fn get_code(&self, checksum: &Checksum) -> Result<Vec<u8>, VmError>;
    /// Keeps the compiled module in the engine's in-memory cache.
    fn pin(&self, checksum: &Checksum) -> Result<(), VmError>;
    fn unpin(&self, checksum: &Checksum) -> Result<(), VmError>;

    fn instantiate(
        &self,
        checksum: &Checksum,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        vm: VmContext<'_>,
    ) -> Metered<Response>;

    fn execute(
        &self,
        checksum: &Checksum,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        vm: VmContext<'_>,
    ) -> Metered<Response>;

    fn migrate(&self, checksum: &Checksum, env: &Env, msg: &[u8], vm: VmContext<'_>) -> Metered<Response>;

    fn sudo(&self, checksum: &Checksum, env: &Env, msg: &[u8], vm: VmContext<'_>) -> Metered<Response>;

    fn reply(&self, checksum: &Checksum, env: &Env, reply: &Reply, vm: VmContext<'_>) -> Metered<Response>;

    /// Read-only entry point: no messages, no events.
    fn query(&self, checksum: &Checksum, env: &Env, msg: &[u8], vm: VmContext<'_>) -> Metered<Vec<u8>>;
}
