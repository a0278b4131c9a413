use crate::storage::prefix_store::StorageError;
use host_derive::Error;

/// Errors reported by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// Bytecode failed validation or compilation.
    #[error("compile error: {0}")]
    Compile(String),
    /// No compiled code is cached under the checksum.
    #[error("no code for checksum {0}")]
    CodeNotFound(String),
    /// The contract itself returned an error.
    #[error("{0}")]
    Contract(String),
    #[error("storage: {0}")]
    Storage(StorageError),
    #[error("querier: {0}")]
    Query(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("serialization: {0}")]
    Serialization(String),
    /// The engine exhausted the budget it was given.
    #[error("ran out of gas during contract execution")]
    OutOfGas,
}

impl From<StorageError> for VmError {
    fn from(err: StorageError) -> Self {
        VmError::Storage(err)
    }
}
