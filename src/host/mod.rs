//! The contract host: code registry, contract lifecycle, message dispatch
//! and queries on top of an [`Engine`].
//!
//! Every operation takes a [`Context`] and works only through it and the
//! collaborators injected at construction. Nothing is global.

pub mod code;
pub mod dispatch;
pub mod genesis;
pub mod keepers;
pub mod lifecycle;
pub mod query;
pub mod registry;

use crate::core::access::AccessConfig;
use crate::core::authz::{AuthorizationPolicy, DefaultAuthorizationPolicy};
use crate::core::code::CodeInfo;
use crate::core::context::Context;
use crate::core::contract::{ContractInfo, ContractStatus};
use crate::core::errors::{HostError, Missing};
use crate::core::gas::{consume_vm_gas, gas_for_contract, GasMeter, MultipliedGasMeter};
use crate::core::keys;
use crate::core::params::{HostConfig, Params, ParamsError};
use crate::storage::prefix_store::PrefixStore;
use crate::types::address::Address;
use crate::types::coin::Coin;
use crate::virtual_machine::engine::{Engine, HexApi, Metered, VmContext};
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::types::{ContractEnv, Env};
use keepers::Keepers;
use query::{QueryHandler, QueryPlugins};

/// Orchestrates contract code and instances on behalf of the chain.
pub struct ContractHost<E: Engine> {
    engine: E,
    keepers: Keepers,
    query_plugins: QueryPlugins,
    authz: Box<dyn AuthorizationPolicy>,
    params: Params,
    config: HostConfig,
    api: HexApi,
}

impl<E: Engine> ContractHost<E> {
    pub fn new(
        engine: E,
        keepers: Keepers,
        query_plugins: QueryPlugins,
        params: Params,
        config: HostConfig,
    ) -> Result<Self, ParamsError> {
        params.validate()?;
        Ok(Self {
            engine,
            keepers,
            query_plugins,
            authz: Box::new(DefaultAuthorizationPolicy),
            params,
            config,
            api: HexApi,
        })
    }

    /// Replaces the policy used by the plain (non-permissioned) operations.
    pub fn with_authorization_policy(mut self, authz: Box<dyn AuthorizationPolicy>) -> Self {
        self.authz = authz;
        self
    }

    /// Runs operations under `policy` instead of the host's own.
    pub fn with_policy<'h>(&'h self, policy: &'h dyn AuthorizationPolicy) -> PermissionedHost<'h, E> {
        PermissionedHost { host: self, policy }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn get_params(&self) -> Params {
        self.params.clone()
    }

    pub fn set_params(&mut self, params: Params) -> Result<(), ParamsError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Meter for a smart query arriving from outside a transaction.
    pub fn smart_query_gas_meter(&self) -> GasMeter {
        GasMeter::new(self.config.smart_query_gas_limit)
    }

    /// Contract record together with the code it runs.
    pub(crate) fn contract_instance(
        &self,
        ctx: Context<'_>,
        contract: &Address,
    ) -> Result<(ContractInfo, CodeInfo), HostError> {
        let info = registry::load_contract_info(ctx.store(), contract)?
            .ok_or(HostError::NotFound(Missing::Contract(*contract)))?;
        let code = registry::load_code_info(ctx.store(), info.code_id)?
            .ok_or(HostError::NotFound(Missing::Code(info.code_id)))?;
        Ok((info, code))
    }

    /// Module-load surcharge; pinned code stays in the engine's cache.
    pub(crate) fn charge_instance_cost(
        &self,
        ctx: Context<'_>,
        code_id: u64,
        operation: &str,
    ) -> Result<(), HostError> {
        if registry::is_pinned(ctx.store(), code_id) {
            return Ok(());
        }
        ctx.gas_meter().consume(
            self.params.instance_cost,
            &format!("Loading wasm module: {}", operation),
        )
    }

    pub(crate) fn env(&self, ctx: Context<'_>, contract: &Address) -> Env {
        Env {
            block: ctx.block().to_env(),
            contract: ContractEnv { address: *contract },
        }
    }

    /// Runs one engine call against the contract's storage partition.
    ///
    /// The engine gets the remaining host gas converted to its own units and
    /// whatever it reports is charged back before its result is looked at,
    /// so an engine that ran dry fails here with the fatal out-of-gas error.
    pub(crate) fn vm_call<T>(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        read_only: bool,
        call: impl FnOnce(VmContext<'_>) -> Metered<T>,
    ) -> Result<Result<T, VmError>, HostError> {
        let prefix = keys::contract_store_prefix(contract);
        let mut store = if read_only {
            PrefixStore::read_only(ctx.store(), prefix)
        } else {
            PrefixStore::new(ctx.store(), prefix)
        };
        let multiplier = self.params.gas_multiplier;
        let querier = QueryHandler::new(self, ctx, *contract);
        let gas_meter = MultipliedGasMeter::new(ctx.gas_meter(), multiplier);

        let metered = call(VmContext {
            store: &mut store,
            api: &self.api,
            querier: &querier,
            gas_meter: &gas_meter,
            gas_limit: gas_for_contract(ctx.gas_meter(), multiplier),
        });
        consume_vm_gas(ctx.gas_meter(), metered.gas_used, multiplier)?;
        Ok(metered.result)
    }
}

/// Host operations that run under a substituted authorization policy.
///
/// Governance uses this with
/// [`GovAuthorizationPolicy`](crate::core::authz::GovAuthorizationPolicy)
/// to act on contracts regardless of upload access or admin.
pub struct PermissionedHost<'h, E: Engine> {
    host: &'h ContractHost<E>,
    policy: &'h dyn AuthorizationPolicy,
}

impl<'h, E: Engine> PermissionedHost<'h, E> {
    pub fn new(host: &'h ContractHost<E>, policy: &'h dyn AuthorizationPolicy) -> Self {
        Self { host, policy }
    }

    pub fn create(
        &self,
        ctx: Context<'_>,
        creator: &Address,
        wasm_code: &[u8],
        source: &str,
        builder: &str,
        instantiate_permission: Option<AccessConfig>,
    ) -> Result<u64, HostError> {
        self.host.create_with(
            self.policy,
            ctx,
            creator,
            wasm_code,
            source,
            builder,
            instantiate_permission,
        )
    }

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
        self.host
            .instantiate_with(self.policy, ctx, code_id, creator, admin, init_msg, label, deposit)
    }

    pub fn migrate(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        new_code_id: u64,
        msg: &[u8],
    ) -> Result<Option<Vec<u8>>, HostError> {
        self.host
            .migrate_with(self.policy, ctx, contract, caller, new_code_id, msg)
    }

    pub fn update_contract_admin(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        new_admin: Address,
    ) -> Result<(), HostError> {
        self.host
            .set_contract_admin_with(self.policy, ctx, contract, caller, Some(new_admin))
    }

    pub fn clear_contract_admin(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
    ) -> Result<(), HostError> {
        self.host
            .set_contract_admin_with(self.policy, ctx, contract, caller, None)
    }

    pub fn update_contract_status(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        caller: &Address,
        status: ContractStatus,
    ) -> Result<(), HostError> {
        self.host
            .update_contract_status_with(self.policy, ctx, contract, caller, status)
    }
}
