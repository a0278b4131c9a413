//! Stored code metadata and upload decompression.

use crate::core::access::AccessConfig;
use crate::types::address::Address;
use crate::types::hash::Checksum;
use flate2::read::GzDecoder;
use host_derive::{BinaryCodec, Error};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Metadata of an uploaded code, keyed by code id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BinaryCodec)]
pub struct CodeInfo {
    pub code_hash: Checksum,
    pub creator: Address,
    /// Where the source can be found (usually a URL).
    pub source: String,
    /// Docker image used to build the code, for reproducible builds.
    pub builder: String,
    pub instantiate_config: AccessConfig,
}

impl CodeInfo {
    pub fn new(
        code_hash: Checksum,
        creator: Address,
        source: String,
        builder: String,
        instantiate_config: AccessConfig,
    ) -> Self {
        Self {
            code_hash,
            creator,
            source,
            builder,
            instantiate_config,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecompressError {
    #[error("payload exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("corrupt gzip stream: {0}")]
    Corrupt(String),
}

const GZIP_IDENT: [u8; 3] = [0x1f, 0x8b, 0x08];

pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= GZIP_IDENT.len() && data[..GZIP_IDENT.len()] == GZIP_IDENT
}

/// Inflates gzip-compressed code; anything else is returned as is.
///
/// Both the compressed input and the inflated output are bounded by `limit`.
pub fn uncompress(data: &[u8], limit: u64) -> Result<Vec<u8>, DecompressError> {
    if data.len() < GZIP_IDENT.len() {
        return Ok(data.to_vec());
    }
    if data.len() as u64 > limit {
        return Err(DecompressError::PayloadTooLarge { limit });
    }
    if !is_gzip(data) {
        return Ok(data.to_vec());
    }

    // Read one byte past the limit to tell "exactly at limit" from "over".
    let mut out = Vec::new();
    GzDecoder::new(data)
        .take(limit.saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| DecompressError::Corrupt(e.to_string()))?;
    if out.len() as u64 > limit {
        return Err(DecompressError::PayloadTooLarge { limit });
    }
    Ok(out)
}
