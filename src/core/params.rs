//! Chain parameters and node-local host configuration.

use crate::core::access::{AccessConfig, AccessType};
use host_derive::Error;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_WASM_CODE_SIZE: u64 = 600 * 1024;
pub const DEFAULT_GAS_MULTIPLIER: u64 = 100;
/// Host gas charged for loading a module that is not pinned.
pub const DEFAULT_INSTANCE_COST: u64 = 40_000;
/// Host gas per byte of uploaded (decompressed) code.
pub const DEFAULT_COMPILE_COST: u64 = 2;
pub const DEFAULT_SMART_QUERY_GAS_LIMIT: u64 = 3_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("gas multiplier must be positive")]
    ZeroGasMultiplier,
    #[error("max wasm code size must be positive")]
    ZeroMaxCodeSize,
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

/// Chain parameters, identical on every node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub code_upload_access: AccessConfig,
    pub instantiate_default_permission: AccessType,
    pub contract_status_access: AccessConfig,
    pub max_wasm_code_size: u64,
    pub gas_multiplier: u64,
    pub instance_cost: u64,
    pub compile_cost: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            code_upload_access: AccessConfig::Everybody,
            instantiate_default_permission: AccessType::Everybody,
            contract_status_access: AccessConfig::Nobody,
            max_wasm_code_size: DEFAULT_MAX_WASM_CODE_SIZE,
            gas_multiplier: DEFAULT_GAS_MULTIPLIER,
            instance_cost: DEFAULT_INSTANCE_COST,
            compile_cost: DEFAULT_COMPILE_COST,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.gas_multiplier == 0 {
            return Err(ParamsError::ZeroGasMultiplier);
        }
        if self.max_wasm_code_size == 0 {
            return Err(ParamsError::ZeroMaxCodeSize);
        }
        Ok(())
    }
}

/// Node-local settings; they never influence consensus results.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Gas limit for smart queries arriving from outside a transaction.
    pub smart_query_gas_limit: u64,
    /// Log contract failures delivered to replies at info instead of debug.
    pub contract_debug_mode: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            smart_query_gas_limit: DEFAULT_SMART_QUERY_GAS_LIMIT,
            contract_debug_mode: false,
        }
    }
}

impl HostConfig {
    pub fn from_json(raw: &str) -> Result<Self, ParamsError> {
        serde_json::from_str(raw).map_err(|e| ParamsError::InvalidConfig(e.to_string()))
    }
}
