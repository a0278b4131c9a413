//! Smart and raw queries, and the querier handed to running contracts.

use super::keepers::BankKeeper;
use super::ContractHost;
use crate::core::context::Context;
use crate::core::contract::Model;
use crate::core::errors::{HostError, Missing};
use crate::core::gas::GasMeter;
use crate::core::keys;
use crate::debug;
use crate::storage::prefix_store::PrefixStore;
use crate::types::address::Address;
use crate::virtual_machine::engine::{Engine, Querier};
use crate::virtual_machine::errors::VmError;
use crate::virtual_machine::types::{
    AllBalanceResponse, BalanceResponse, BankQuery, ContractInfoResponse, DistributionQuery,
    IbcQuery, PortIdResponse, QueryRequest, StakingQuery, WasmQuery,
};
use serde::Serialize;
use std::rc::Rc;

/// Answers one kind of chain query for the contract at `&Address`.
pub type QueryPlugin<Q> = Box<dyn Fn(Context<'_>, &Address, &Q) -> Result<Vec<u8>, HostError>>;

/// Boxes a closure as a [`QueryPlugin`].
pub fn query_plugin<Q, F>(f: F) -> QueryPlugin<Q>
where
    F: Fn(Context<'_>, &Address, &Q) -> Result<Vec<u8>, HostError> + 'static,
{
    Box::new(f)
}

/// Answers a stargate query given its path and request bytes.
pub type StargatePlugin = Box<dyn Fn(Context<'_>, &Address, &str, &[u8]) -> Result<Vec<u8>, HostError>>;

/// Chain queries the host does not answer itself.
///
/// A missing plugin makes its query kind unsupported.
#[derive(Default)]
pub struct QueryPlugins {
    pub bank: Option<QueryPlugin<BankQuery>>,
    pub staking: Option<QueryPlugin<StakingQuery>>,
    pub distribution: Option<QueryPlugin<DistributionQuery>>,
    pub ibc: Option<QueryPlugin<IbcQuery>>,
    pub stargate: Option<StargatePlugin>,
    pub custom: Option<QueryPlugin<serde_json::Value>>,
}

impl QueryPlugins {
    /// Built-in plugins answering balance queries from `bank`.
    pub fn with_bank(bank: Rc<dyn BankKeeper>) -> Self {
        Self {
            bank: Some(bank_plugin(bank)),
            ..Self::default()
        }
    }

    /// Plugins set in `other` replace the ones in `self`.
    pub fn merge(self, other: QueryPlugins) -> Self {
        Self {
            bank: other.bank.or(self.bank),
            staking: other.staking.or(self.staking),
            distribution: other.distribution.or(self.distribution),
            ibc: other.ibc.or(self.ibc),
            stargate: other.stargate.or(self.stargate),
            custom: other.custom.or(self.custom),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, HostError> {
    serde_json::to_vec(value).map_err(|e| HostError::External(e.to_string()))
}

fn bank_plugin(bank: Rc<dyn BankKeeper>) -> QueryPlugin<BankQuery> {
    query_plugin(move |ctx, _, request: &BankQuery| match request {
        BankQuery::Balance { address, denom } => to_json(&BalanceResponse {
            amount: bank.balance(ctx, address, denom),
        }),
        BankQuery::AllBalances { address } => to_json(&AllBalanceResponse {
            amount: bank.all_balances(ctx, address),
        }),
    })
}

fn unsupported(kind: &'static str) -> HostError {
    HostError::UnsupportedMessage(kind)
}

impl<E: Engine> ContractHost<E> {
    /// Runs the contract's query entry point. Storage is read-only.
    pub fn query_smart(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        request: &[u8],
    ) -> Result<Vec<u8>, HostError> {
        let (info, code_info) = self.contract_instance(ctx, contract)?;
        self.charge_instance_cost(ctx, info.code_id, "query")?;

        let env = self.env(ctx, contract);
        self.vm_call(ctx, contract, true, |vm| {
            self.engine.query(&code_info.code_hash, &env, request, vm)
        })?
        .map_err(|e| HostError::QueryFailed(e.to_string()))
    }

    /// Reads one key of the contract's storage without running it.
    pub fn query_raw(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        key: Option<&[u8]>,
    ) -> Option<Vec<u8>> {
        let key = key?;
        PrefixStore::read_only(ctx.store(), keys::contract_store_prefix(contract)).get(key)
    }

    /// Every entry of the contract's storage partition, in key order.
    pub fn get_contract_state(&self, ctx: Context<'_>, contract: &Address) -> Vec<Model> {
        PrefixStore::read_only(ctx.store(), keys::contract_store_prefix(contract))
            .entries()
            .into_iter()
            .map(|(key, value)| Model { key, value })
            .collect()
    }

    /// Resolves a query sent by the contract at `caller`.
    pub(crate) fn handle_query(
        &self,
        ctx: Context<'_>,
        caller: &Address,
        request: &QueryRequest,
    ) -> Result<Vec<u8>, HostError> {
        let plugins = &self.query_plugins;
        match request {
            QueryRequest::Wasm(WasmQuery::Smart { contract_addr, msg }) => {
                self.query_smart(ctx, contract_addr, msg)
            }
            QueryRequest::Wasm(WasmQuery::Raw { contract_addr, key }) => Ok(self
                .query_raw(ctx, contract_addr, Some(key))
                .unwrap_or_default()),
            QueryRequest::Wasm(WasmQuery::ContractInfo { contract_addr }) => {
                let info = self
                    .get_contract_info(ctx, contract_addr)?
                    .ok_or(HostError::NotFound(Missing::Contract(*contract_addr)))?;
                to_json(&ContractInfoResponse {
                    code_id: info.code_id,
                    creator: info.creator,
                    admin: info.admin,
                    pinned: self.is_pinned_code(ctx, info.code_id),
                    ibc_port: info.ibc_port_id,
                })
            }
            QueryRequest::Ibc(IbcQuery::PortId {}) => {
                let info = self
                    .get_contract_info(ctx, caller)?
                    .ok_or(HostError::NotFound(Missing::Contract(*caller)))?;
                to_json(&PortIdResponse {
                    port_id: info.ibc_port_id.unwrap_or_default(),
                })
            }
            QueryRequest::Ibc(query) => match &plugins.ibc {
                Some(plugin) => plugin(ctx, caller, query),
                None => Err(unsupported("ibc query")),
            },
            QueryRequest::Bank(query) => match &plugins.bank {
                Some(plugin) => plugin(ctx, caller, query),
                None => Err(unsupported("bank query")),
            },
            QueryRequest::Staking(query) => match &plugins.staking {
                Some(plugin) => plugin(ctx, caller, query),
                None => Err(unsupported("staking query")),
            },
            QueryRequest::Distribution(query) => match &plugins.distribution {
                Some(plugin) => plugin(ctx, caller, query),
                None => Err(unsupported("distribution query")),
            },
            QueryRequest::Stargate { path, data } => match &plugins.stargate {
                Some(plugin) => plugin(ctx, caller, path, data),
                None => Err(unsupported("stargate query")),
            },
            QueryRequest::Custom(query) => match &plugins.custom {
                Some(plugin) => plugin(ctx, caller, query),
                None => Err(unsupported("custom query")),
            },
        }
    }
}

/// [`Querier`] handed to the engine for one contract call.
///
/// Each query runs under its own meter of `gas_limit` (converted to host
/// units) and its consumption is charged to the caller's meter whether the
/// query succeeds or not.
pub struct QueryHandler<'a, E: Engine> {
    host: &'a ContractHost<E>,
    ctx: Context<'a>,
    caller: Address,
}

impl<'a, E: Engine> QueryHandler<'a, E> {
    pub fn new(host: &'a ContractHost<E>, ctx: Context<'a>, caller: Address) -> Self {
        Self { host, ctx, caller }
    }
}

impl<E: Engine> Querier for QueryHandler<'_, E> {
    fn query(&self, request: &QueryRequest, gas_limit: u64) -> Result<Vec<u8>, VmError> {
        let multiplier = self.host.params.gas_multiplier;
        let sub_meter = GasMeter::new(gas_limit / multiplier);
        let result = self
            .host
            .handle_query(self.ctx.with_gas_meter(&sub_meter), &self.caller, request);

        // The caller's meter caps at its limit; running it dry here surfaces
        // as out of gas once the engine call returns.
        if let Err(err) = self
            .ctx
            .gas_meter()
            .consume(sub_meter.consumed(), "contract sub-query")
        {
            debug!("sub-query of {} exhausted the caller's gas: {}", self.caller, err);
        }
        result.map_err(|e| VmError::Query(e.to_string()))
    }
}
