//! Contract lifecycle: instantiate, execute, migrate, sudo, reply and the
//! admin and status changes.

use super::{registry, ContractHost};
use crate::core::authz::AuthorizationPolicy;
use crate::core::context::Context;
use crate::core::contract::{
    contract_address, ibc_port_id, ContractCodeHistoryEntry, ContractInfo, ContractStatus,
};
use crate::core::errors::{HostError, Invalid, Missing};
use crate::core::events::parse_events;
use crate::core::keys;
use crate::info;
use crate::types::address::Address;
use crate::types::coin::{coins_are_zero, Coin};
use crate::virtual_machine::engine::Engine;
use crate::virtual_machine::types::{MessageInfo, Reply, Response};

impl<E: Engine> ContractHost<E> {
    /// Creates a new instance of `code_id` and returns its address and the
    /// data the contract returned.
    ///
    /// The contract is registered before its messages are dispatched, so a
    /// message calling back into it finds it.
    #[allow(clippy::too_many_arguments)]
    pub fn instantiate(
        &self,
        ctx: Context<'_>,
        code_id: u64,
        creator: &Address,
        admin: Option<Address>,
        init_msg: &[u8],
        label: &str,
        deposit: &[Coin],
    ) -> Result<(Address, Option<Vec<u8>>), HostError> {
        self.instantiate_with(
            self.authz.as_ref(),
            ctx,
            code_id,
            creator,
            admin,
            init_msg,
            label,
            deposit,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn instantiate_with(
        &self,
        authz: &dyn AuthorizationPolicy,
        ctx: Context<'_>,
        code_id: u64,
        creator: &Address,
        admin: Option<Address>,
        init_msg: &[u8],
        label: &str,
        deposit: &[Coin],
    ) -> Result<(Address, Option<Vec<u8>>), HostError> {
        self.charge_instance_cost(ctx, code_id, "instantiate")?;

        let instance_id = registry::next_id(ctx.store(), keys::LAST_INSTANCE_ID)?;
        let contract = contract_address(code_id, instance_id);
        if self.keepers.accounts.has_account(ctx, &contract) {
            return Err(HostError::AccountAlreadyExists(contract));
        }
        if coins_are_zero(deposit) {
            self.keepers.accounts.create_account(ctx, &contract)?;
        } else {
            self.keepers
                .transferrer
                .transfer_coins(ctx, creator, &contract, deposit)?;
        }

        let code_info = registry::load_code_info(ctx.store(), code_id)?
            .ok_or(HostError::NotFound(Missing::Code(code_id)))?;
        if !authz.can_instantiate_contract(&code_info.instantiate_config, creator) {
            return Err(HostError::Unauthorized("can not instantiate"));
        }

        let env = self.env(ctx, &contract);
        let info = MessageInfo {
            sender: *creator,
            funds: deposit.to_vec(),
        };
        let response = self
            .vm_call(ctx, &contract, false, |vm| {
                self.engine
                    .instantiate(&code_info.code_hash, &env, &info, init_msg, vm)
            })?
            .map_err(|e| HostError::InstantiateFailed(e.to_string()))?;
        ctx.events().emit_all(parse_events(&response.attributes, &contract));

        let mut contract_info =
            ContractInfo::new(code_id, *creator, admin, label.to_string(), ctx.tx_position());
        let report = self
            .engine
            .analyze_code(&code_info.code_hash)
            .map_err(|e| HostError::InstantiateFailed(e.to_string()))?;
        if report.has_ibc_entry_points {
            contract_info.ibc_port_id = Some(self.ensure_ibc_port(ctx, &contract)?);
        }
        registry::store_contract_info(ctx.store(), &contract, &contract_info);
        registry::append_history(
            ctx.store(),
            &contract,
            &[contract_info.initial_history(init_msg)],
        );
        info!("instantiated contract {} from code {}", contract, code_id);

        let data = self.handle_dispatch(ctx, &contract, contract_info.ibc_port_id.as_deref(), response)?;
        Ok((contract, data))
    }

    /// Runs the contract's execute entry point with `coins` sent along.
    pub fn execute(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        msg: &[u8],
        coins: &[Coin],
    ) -> Result<Option<Vec<u8>>, HostError> {
        let (info, code_info) = self.contract_instance(ctx, contract)?;
        if !info.is_active() {
            return Err(HostError::Invalid(Invalid::InactiveContract));
        }
        self.charge_instance_cost(ctx, info.code_id, "execute")?;
        if !coins_are_zero(coins) {
            self.keepers
                .transferrer
                .transfer_coins(ctx, caller, contract, coins)?;
        }

        let env = self.env(ctx, contract);
        let msg_info = MessageInfo {
            sender: *caller,
            funds: coins.to_vec(),
        };
        let response = self
            .vm_call(ctx, contract, false, |vm| {
                self.engine
                    .execute(&code_info.code_hash, &env, &msg_info, msg, vm)
            })?
            .map_err(|e| HostError::ExecuteFailed(e.to_string()))?;
        ctx.events().emit_all(parse_events(&response.attributes, contract));
        self.handle_dispatch(ctx, contract, info.ibc_port_id.as_deref(), response)
    }

    /// Moves a contract to `new_code_id`, keeping its storage.
    pub fn migrate(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        new_code_id: u64,
        msg: &[u8],
    ) -> Result<Option<Vec<u8>>, HostError> {
        self.migrate_with(self.authz.as_ref(), ctx, contract, caller, new_code_id, msg)
    }

    pub(crate) fn migrate_with(
        &self,
        authz: &dyn AuthorizationPolicy,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        new_code_id: u64,
        msg: &[u8],
    ) -> Result<Option<Vec<u8>>, HostError> {
        self.charge_instance_cost(ctx, new_code_id, "migrate")?;

        let mut info = registry::load_contract_info(ctx.store(), contract)?
            .ok_or(HostError::NotFound(Missing::Contract(*contract)))?;
        if !info.is_active() {
            return Err(HostError::Invalid(Invalid::InactiveContract));
        }
        if !authz.can_modify_contract(info.admin.as_ref(), caller) {
            return Err(HostError::Unauthorized("can not migrate"));
        }
        let new_code = registry::load_code_info(ctx.store(), new_code_id)?
            .ok_or(HostError::NotFound(Missing::Code(new_code_id)))?;

        let report = self
            .engine
            .analyze_code(&new_code.code_hash)
            .map_err(|e| HostError::MigrationFailed(e.to_string()))?;
        match (report.has_ibc_entry_points, info.ibc_port_id.is_some()) {
            (false, true) => return Err(HostError::Invalid(Invalid::PortMismatch)),
            (true, false) => info.ibc_port_id = Some(self.ensure_ibc_port(ctx, contract)?),
            _ => {}
        }

        let env = self.env(ctx, contract);
        let response = self
            .vm_call(ctx, contract, false, |vm| {
                self.engine.migrate(&new_code.code_hash, &env, msg, vm)
            })?
            .map_err(|e| HostError::MigrationFailed(e.to_string()))?;
        ctx.events().emit_all(parse_events(&response.attributes, contract));

        registry::remove_contract_index(ctx.store(), contract, &info);
        let old_code_id = info.code_id;
        let entry = info.add_migration(ctx.tx_position(), new_code_id, msg);
        registry::append_history(ctx.store(), contract, &[entry]);
        registry::store_contract_info(ctx.store(), contract, &info);
        info!(
            "migrated contract {} from code {} to code {}",
            contract, old_code_id, new_code_id
        );

        self.handle_dispatch(ctx, contract, info.ibc_port_id.as_deref(), response)
    }

    /// Privileged entry point for trusted modules. Skips authorization and
    /// the status check.
    pub fn sudo(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        msg: &[u8],
    ) -> Result<Option<Vec<u8>>, HostError> {
        let (info, code_info) = self.contract_instance(ctx, contract)?;
        self.charge_instance_cost(ctx, info.code_id, "sudo")?;

        let env = self.env(ctx, contract);
        let response = self
            .vm_call(ctx, contract, false, |vm| {
                self.engine.sudo(&code_info.code_hash, &env, msg, vm)
            })?
            .map_err(|e| HostError::ExecuteFailed(e.to_string()))?;
        ctx.events().emit_all(parse_events(&response.attributes, contract));
        self.handle_dispatch(ctx, contract, info.ibc_port_id.as_deref(), response)
    }

    /// Delivers a sub-message outcome to the contract that sent it.
    pub fn reply(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        reply: &Reply,
    ) -> Result<Option<Vec<u8>>, HostError> {
        let (info, code_info) = self.contract_instance(ctx, contract)?;
        self.charge_instance_cost(ctx, info.code_id, "reply")?;

        let env = self.env(ctx, contract);
        let response = self
            .vm_call(ctx, contract, false, |vm| {
                self.engine.reply(&code_info.code_hash, &env, reply, vm)
            })?
            .map_err(|e| HostError::ExecuteFailed(e.to_string()))?;
        ctx.events().emit_all(parse_events(&response.attributes, contract));
        self.handle_dispatch(ctx, contract, info.ibc_port_id.as_deref(), response)
    }

    pub fn update_contract_admin(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        new_admin: Address,
    ) -> Result<(), HostError> {
        self.set_contract_admin_with(self.authz.as_ref(), ctx, contract, caller, Some(new_admin))
    }

    pub fn clear_contract_admin(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
    ) -> Result<(), HostError> {
        self.set_contract_admin_with(self.authz.as_ref(), ctx, contract, caller, None)
    }

    pub(crate) fn set_contract_admin_with(
        &self,
        authz: &dyn AuthorizationPolicy,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        new_admin: Option<Address>,
    ) -> Result<(), HostError> {
        let mut info = registry::load_contract_info(ctx.store(), contract)?
            .ok_or(HostError::NotFound(Missing::Contract(*contract)))?;
        if !info.is_active() {
            return Err(HostError::Invalid(Invalid::InactiveContract));
        }
        if !authz.can_modify_contract(info.admin.as_ref(), caller) {
            return Err(HostError::Unauthorized("can not modify contract"));
        }
        info.admin = new_admin;
        registry::store_contract_info(ctx.store(), contract, &info);
        match new_admin {
            Some(admin) => info!("set admin of contract {} to {}", contract, admin),
            None => info!("cleared admin of contract {}", contract),
        }
        Ok(())
    }

    /// Sets the contract status. Setting the current status is a no-op.
    pub fn update_contract_status(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        status: ContractStatus,
    ) -> Result<(), HostError> {
        self.update_contract_status_with(self.authz.as_ref(), ctx, contract, caller, status)
    }

    pub(crate) fn update_contract_status_with(
        &self,
        authz: &dyn AuthorizationPolicy,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        status: ContractStatus,
    ) -> Result<(), HostError> {
        if !authz.can_update_contract_status(&self.params.contract_status_access, caller) {
            return Err(HostError::Unauthorized("can not update contract status"));
        }
        let mut info = registry::load_contract_info(ctx.store(), contract)?
            .ok_or(HostError::NotFound(Missing::Contract(*contract)))?;
        if info.status != status {
            info.status = status;
            registry::store_contract_info(ctx.store(), contract, &info);
            info!("contract {} is now {:?}", contract, status);
        }
        Ok(())
    }

    pub fn get_contract_info(
        &self,
        ctx: Context<'_>,
        contract: &Address,
    ) -> Result<Option<ContractInfo>, HostError> {
        registry::load_contract_info(ctx.store(), contract)
    }

    pub fn get_contract_history(
        &self,
        ctx: Context<'_>,
        contract: &Address,
    ) -> Result<Vec<ContractCodeHistoryEntry>, HostError> {
        registry::load_history(ctx.store(), contract)
    }

    /// Visits contract infos in address order until `cb` returns true.
    pub fn iterate_contract_info(
        &self,
        ctx: Context<'_>,
        mut cb: impl FnMut(Address, ContractInfo) -> bool,
    ) -> Result<(), HostError> {
        for (addr, info) in registry::contract_infos(ctx.store())? {
            if cb(addr, info) {
                break;
            }
        }
        Ok(())
    }

    /// Instances of `code_id`, oldest first.
    pub fn contracts_by_code(&self, ctx: Context<'_>, code_id: u64) -> Vec<Address> {
        registry::contracts_by_code(ctx.store(), code_id)
    }

    /// Binds the contract's IBC port and returns its id.
    fn ensure_ibc_port(&self, ctx: Context<'_>, contract: &Address) -> Result<String, HostError> {
        let port_id = ibc_port_id(contract);
        self.keepers.ports.bind_port(ctx, &port_id)?;
        Ok(port_id)
    }

    /// Dispatches what the contract asked for and returns its data.
    fn handle_dispatch(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        ibc_port: Option<&str>,
        response: Response,
    ) -> Result<Option<Vec<u8>>, HostError> {
        self.dispatch_all(ctx, contract, ibc_port, response.submessages, response.messages)?;
        Ok(response.data)
    }
}
