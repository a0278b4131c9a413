//! Code upload, import and pinning.

use super::{registry, ContractHost};
use crate::core::access::AccessConfig;
use crate::core::authz::AuthorizationPolicy;
use crate::core::code::{uncompress, CodeInfo};
use crate::core::context::Context;
use crate::core::errors::{Duplicate, HostError, Invalid, Missing};
use crate::core::keys;
use crate::info;
use crate::types::address::Address;
use crate::virtual_machine::engine::Engine;

impl<E: Engine> ContractHost<E> {
    /// Uploads code and returns its new code id.
    ///
    /// Without an explicit instantiate permission the code gets the chain's
    /// default access type bound to the uploader.
    pub fn create(
        &self,
        ctx: Context<'_>,
        creator: &Address,
        wasm_code: &[u8],
        source: &str,
        builder: &str,
        instantiate_permission: Option<AccessConfig>,
    ) -> Result<u64, HostError> {
        self.create_with(
            self.authz.as_ref(),
            ctx,
            creator,
            wasm_code,
            source,
            builder,
            instantiate_permission,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn create_with(
        &self,
        authz: &dyn AuthorizationPolicy,
        ctx: Context<'_>,
        creator: &Address,
        wasm_code: &[u8],
        source: &str,
        builder: &str,
        instantiate_permission: Option<AccessConfig>,
    ) -> Result<u64, HostError> {
        if !authz.can_create_code(&self.params.code_upload_access, creator) {
            return Err(HostError::Unauthorized("can not create code"));
        }
        let wasm = uncompress(wasm_code, self.params.max_wasm_code_size)
            .map_err(|e| HostError::CreateFailed(e.to_string()))?;
        ctx.gas_meter().consume(
            self.params.compile_cost.saturating_mul(wasm.len() as u64),
            "Compiling wasm bytecode",
        )?;
        let checksum = self
            .engine
            .create(&wasm)
            .map_err(|e| HostError::CreateFailed(e.to_string()))?;

        let code_id = registry::next_id(ctx.store(), keys::LAST_CODE_ID)?;
        let instantiate_config = instantiate_permission
            .unwrap_or_else(|| self.params.instantiate_default_permission.with(*creator));
        let code_info = CodeInfo::new(
            checksum,
            *creator,
            source.to_string(),
            builder.to_string(),
            instantiate_config,
        );
        registry::store_code_info(ctx.store(), code_id, &code_info);
        info!("stored code {} with checksum {}", code_id, checksum);
        Ok(code_id)
    }

    /// Stores code under an id chosen by the caller, as genesis does.
    ///
    /// The recompiled checksum must match the one in `code_info`.
    pub fn import_code(
        &self,
        ctx: Context<'_>,
        code_id: u64,
        code_info: CodeInfo,
        wasm_code: &[u8],
    ) -> Result<(), HostError> {
        let wasm = uncompress(wasm_code, self.params.max_wasm_code_size)
            .map_err(|e| HostError::CreateFailed(e.to_string()))?;
        let checksum = self
            .engine
            .create(&wasm)
            .map_err(|e| HostError::CreateFailed(e.to_string()))?;
        if checksum != code_info.code_hash {
            return Err(HostError::Invalid(Invalid::CodeHashMismatch));
        }
        if registry::has_code(ctx.store(), code_id) {
            return Err(HostError::Duplicate(Duplicate::CodeId(code_id)));
        }
        registry::store_code_info(ctx.store(), code_id, &code_info);
        Ok(())
    }

    pub fn get_code_info(&self, ctx: Context<'_>, code_id: u64) -> Result<Option<CodeInfo>, HostError> {
        registry::load_code_info(ctx.store(), code_id)
    }

    /// Original bytecode of a code, `None` for an unknown code id.
    pub fn get_byte_code(&self, ctx: Context<'_>, code_id: u64) -> Result<Option<Vec<u8>>, HostError> {
        let Some(code_info) = registry::load_code_info(ctx.store(), code_id)? else {
            return Ok(None);
        };
        self.engine
            .get_code(&code_info.code_hash)
            .map(Some)
            .map_err(|e| HostError::External(e.to_string()))
    }

    /// Visits code infos in id order until `cb` returns true.
    pub fn iterate_code_infos(
        &self,
        ctx: Context<'_>,
        mut cb: impl FnMut(u64, CodeInfo) -> bool,
    ) -> Result<(), HostError> {
        for (code_id, info) in registry::code_infos(ctx.store())? {
            if cb(code_id, info) {
                break;
            }
        }
        Ok(())
    }

    /// Id the next uploaded code will get.
    pub fn get_next_code_id(&self, ctx: Context<'_>) -> Result<u64, HostError> {
        registry::peek_id(ctx.store(), keys::LAST_CODE_ID)
    }

    /// Keeps a code in the engine's memory cache; pinned code skips the
    /// module-load surcharge.
    pub fn pin_code(&self, ctx: Context<'_>, code_id: u64) -> Result<(), HostError> {
        let code_info = registry::load_code_info(ctx.store(), code_id)?
            .ok_or(HostError::NotFound(Missing::Code(code_id)))?;
        self.engine
            .pin(&code_info.code_hash)
            .map_err(|e| HostError::PinFailed(e.to_string()))?;
        registry::set_pinned(ctx.store(), code_id);
        info!("pinned code {}", code_id);
        Ok(())
    }

    pub fn unpin_code(&self, ctx: Context<'_>, code_id: u64) -> Result<(), HostError> {
        let code_info = registry::load_code_info(ctx.store(), code_id)?
            .ok_or(HostError::NotFound(Missing::Code(code_id)))?;
        self.engine
            .unpin(&code_info.code_hash)
            .map_err(|e| HostError::UnpinFailed(e.to_string()))?;
        registry::remove_pinned(ctx.store(), code_id);
        info!("unpinned code {}", code_id);
        Ok(())
    }

    pub fn is_pinned_code(&self, ctx: Context<'_>, code_id: u64) -> bool {
        registry::is_pinned(ctx.store(), code_id)
    }

    /// Loads every pinned code into the engine cache. Run at node start-up.
    pub fn initialize_pinned_codes(&self, ctx: Context<'_>) -> Result<(), HostError> {
        for code_id in registry::pinned_code_ids(ctx.store()) {
            let code_info = registry::load_code_info(ctx.store(), code_id)?
                .ok_or(HostError::NotFound(Missing::Code(code_id)))?;
            self.engine
                .pin(&code_info.code_hash)
                .map_err(|e| HostError::PinFailed(e.to_string()))?;
        }
        Ok(())
    }
}
