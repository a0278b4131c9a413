//! Chain state import and export.

use super::{registry, ContractHost};
use crate::core::code::CodeInfo;
use crate::core::context::Context;
use crate::core::contract::{ContractInfo, Model};
use crate::core::errors::{Duplicate, HostError, Missing};
use crate::core::keys;
use crate::core::params::Params;
use crate::info;
use crate::storage::prefix_store::PrefixStore;
use crate::types::address::Address;
use crate::virtual_machine::engine::Engine;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisCode {
    pub code_id: u64,
    pub code_info: CodeInfo,
    #[serde(with = "hex::serde")]
    pub code_bytes: Vec<u8>,
    pub pinned: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisContract {
    pub contract_address: Address,
    pub contract_info: ContractInfo,
    pub contract_state: Vec<Model>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub id_key: String,
    pub value: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub codes: Vec<GenesisCode>,
    pub contracts: Vec<GenesisContract>,
    pub sequences: Vec<Sequence>,
}

impl<E: Engine> ContractHost<E> {
    /// Registers a contract exported from another chain.
    ///
    /// Its history is replaced by a single genesis entry.
    pub fn import_contract(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        mut info: ContractInfo,
        state: &[Model],
    ) -> Result<(), HostError> {
        if !registry::has_code(ctx.store(), info.code_id) {
            return Err(HostError::NotFound(Missing::Code(info.code_id)));
        }
        if registry::has_contract(ctx.store(), contract) {
            return Err(HostError::Duplicate(Duplicate::Contract(*contract)));
        }
        let entry = info.reset_from_genesis(ctx.tx_position());
        registry::append_history(ctx.store(), contract, &[entry]);
        registry::store_contract_info(ctx.store(), contract, &info);

        let partition = PrefixStore::new(ctx.store(), keys::contract_store_prefix(contract));
        for model in state {
            if partition.has(&model.key) {
                return Err(HostError::Duplicate(Duplicate::StateKey(hex::encode(&model.key))));
            }
            partition
                .set(&model.key, model.value.clone())
                .map_err(|e| HostError::External(e.to_string()))?;
        }
        Ok(())
    }

    /// Sets a sequence counter that has not been used yet.
    pub fn import_auto_increment_id(
        &self,
        ctx: Context<'_>,
        name: &str,
        value: u64,
    ) -> Result<(), HostError> {
        if !registry::init_sequence(ctx.store(), name, value) {
            return Err(HostError::Duplicate(Duplicate::AutoIncrement(name.to_string())));
        }
        Ok(())
    }

    /// Loads an exported state into an empty store.
    pub fn init_genesis(&mut self, ctx: Context<'_>, state: &GenesisState) -> Result<(), HostError> {
        self.set_params(state.params.clone())
            .map_err(|e| HostError::External(e.to_string()))?;

        let mut max_code_id = 0;
        for code in &state.codes {
            self.import_code(ctx, code.code_id, code.code_info.clone(), &code.code_bytes)?;
            if code.pinned {
                self.pin_code(ctx, code.code_id)?;
            }
            max_code_id = max_code_id.max(code.code_id);
        }
        for contract in &state.contracts {
            self.import_contract(
                ctx,
                &contract.contract_address,
                contract.contract_info.clone(),
                &contract.contract_state,
            )?;
        }
        for seq in &state.sequences {
            self.import_auto_increment_id(ctx, &seq.id_key, seq.value)?;
        }

        let next_code_id = registry::peek_id(ctx.store(), keys::LAST_CODE_ID)?;
        if next_code_id <= max_code_id {
            return Err(HostError::External(format!(
                "sequence {} must be greater than max code id {}",
                keys::LAST_CODE_ID,
                max_code_id
            )));
        }
        let next_instance_id = registry::peek_id(ctx.store(), keys::LAST_INSTANCE_ID)?;
        if next_instance_id <= state.contracts.len() as u64 {
            return Err(HostError::External(format!(
                "sequence {} must be greater than contract count {}",
                keys::LAST_INSTANCE_ID,
                state.contracts.len()
            )));
        }
        info!(
            "imported {} codes and {} contracts from genesis",
            state.codes.len(),
            state.contracts.len()
        );
        Ok(())
    }

    pub fn export_genesis(&self, ctx: Context<'_>) -> Result<GenesisState, HostError> {
        let mut codes = Vec::new();
        for (code_id, code_info) in registry::code_infos(ctx.store())? {
            let code_bytes = self
                .engine
                .get_code(&code_info.code_hash)
                .map_err(|e| HostError::External(e.to_string()))?;
            codes.push(GenesisCode {
                code_id,
                pinned: registry::is_pinned(ctx.store(), code_id),
                code_info,
                code_bytes,
            });
        }

        let contracts = registry::contract_infos(ctx.store())?
            .into_iter()
            .map(|(contract_address, contract_info)| GenesisContract {
                contract_state: self.get_contract_state(ctx, &contract_address),
                contract_address,
                contract_info,
            })
            .collect();

        let mut sequences = Vec::new();
        for name in [keys::LAST_CODE_ID, keys::LAST_INSTANCE_ID] {
            sequences.push(Sequence {
                id_key: name.to_string(),
                value: registry::peek_id(ctx.store(), name)?,
            });
        }

        Ok(GenesisState {
            params: self.get_params(),
            codes,
            contracts,
            sequences,
        })
    }
}
