//! Values exchanged with the execution engine.
//!
//! Everything here is `serde` (de)serializable: engines receive the
//! environment as JSON and hand back responses, messages and query requests
//! in the same shape. Enums are externally tagged with snake_case names.

use crate::types::address::Address;
use crate::types::coin::Coin;
use serde::{Deserialize, Serialize};

/// Block and contract the engine call runs against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Env {
    pub block: BlockEnv,
    pub contract: ContractEnv,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEnv {
    pub height: u64,
    /// Nanoseconds since the Unix epoch.
    pub time: u64,
    pub chain_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEnv {
    pub address: Address,
}

/// Caller and attached funds for instantiate and execute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    pub sender: Address,
    pub funds: Vec<Coin>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub ty: String,
    pub attributes: Vec<Attribute>,
}

/// What a successful instantiate, execute, migrate, sudo or reply returns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Dispatched first, each in a sandbox with a reply.
    pub submessages: Vec<SubMsg>,
    /// Dispatched after all sub-messages, without a sandbox.
    pub messages: Vec<CosmosMsg>,
    pub attributes: Vec<Attribute>,
    pub data: Option<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubMsg {
    pub id: u64,
    pub msg: CosmosMsg,
    pub gas_limit: Option<u64>,
}

/// Delivered to the reply entry point once a sub-message finished.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: u64,
    pub result: SubcallResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubcallResult {
    Ok(SubcallResponse),
    Err(String),
}

impl SubcallResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, SubcallResult::Ok(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubcallResponse {
    pub events: Vec<Event>,
    pub data: Option<Vec<u8>>,
}

/// Chain-level effect requested by a contract.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmosMsg {
    Bank(BankMsg),
    Wasm(WasmMsg),
    Staking(StakingMsg),
    Distribution(DistributionMsg),
    Ibc(IbcMsg),
    Stargate { type_url: String, value: Vec<u8> },
    Custom(serde_json::Value),
}

impl CosmosMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            CosmosMsg::Bank(_) => "bank",
            CosmosMsg::Wasm(_) => "wasm",
            CosmosMsg::Staking(_) => "staking",
            CosmosMsg::Distribution(_) => "distribution",
            CosmosMsg::Ibc(_) => "ibc",
            CosmosMsg::Stargate { .. } => "stargate",
            CosmosMsg::Custom(_) => "custom",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankMsg {
    Send {
        to_address: Address,
        amount: Vec<Coin>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasmMsg {
    Execute {
        contract_addr: Address,
        msg: Vec<u8>,
        funds: Vec<Coin>,
    },
    Instantiate {
        admin: Option<Address>,
        code_id: u64,
        msg: Vec<u8>,
        funds: Vec<Coin>,
        label: String,
    },
    Migrate {
        contract_addr: Address,
        new_code_id: u64,
        msg: Vec<u8>,
    },
    UpdateAdmin {
        contract_addr: Address,
        admin: Address,
    },
    ClearAdmin {
        contract_addr: Address,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingMsg {
    Delegate {
        validator: String,
        amount: Coin,
    },
    Undelegate {
        validator: String,
        amount: Coin,
    },
    Redelegate {
        src_validator: String,
        dst_validator: String,
        amount: Coin,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionMsg {
    SetWithdrawAddress { address: Address },
    WithdrawDelegatorReward { validator: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IbcMsg {
    Transfer {
        channel_id: String,
        to_address: String,
        amount: Coin,
        timeout_timestamp: Option<u64>,
    },
    SendPacket {
        channel_id: String,
        data: Vec<u8>,
        timeout_timestamp: Option<u64>,
    },
    CloseChannel {
        channel_id: String,
    },
}

/// Read-only request a contract sends through its querier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryRequest {
    Bank(BankQuery),
    Staking(StakingQuery),
    Distribution(DistributionQuery),
    Ibc(IbcQuery),
    Wasm(WasmQuery),
    Stargate { path: String, data: Vec<u8> },
    Custom(serde_json::Value),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BankQuery {
    Balance { address: Address, denom: String },
    AllBalances { address: Address },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StakingQuery {
    BondedDenom {},
    AllDelegations { delegator: Address },
    Validator { address: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionQuery {
    DelegatorWithdrawAddress { delegator_address: Address },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IbcQuery {
    /// Port bound to the querying contract; answered by the host.
    PortId {},
    ListChannels { port_id: Option<String> },
    Channel {
        channel_id: String,
        port_id: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasmQuery {
    Smart { contract_addr: Address, msg: Vec<u8> },
    Raw { contract_addr: Address, key: Vec<u8> },
    ContractInfo { contract_addr: Address },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfoResponse {
    pub code_id: u64,
    pub creator: Address,
    pub admin: Option<Address>,
    pub pinned: bool,
    pub ibc_port: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub amount: Coin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllBalanceResponse {
    pub amount: Vec<Coin>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortIdResponse {
    pub port_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_externally_tagged_snake_case() {
        let msg = CosmosMsg::Wasm(WasmMsg::ClearAdmin {
            contract_addr: Address([1; 20]),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json["wasm"]["clear_admin"]["contract_addr"].is_string());
    }

    #[test]
    fn subcall_result_serializes_as_ok_or_err() {
        let err = SubcallResult::Err("boom".into());
        assert_eq!(serde_json::to_string(&err).unwrap(), r#"{"err":"boom"}"#);
        assert!(!err.is_ok());
    }

    #[test]
    fn event_type_field_is_renamed() {
        let event = Event {
            ty: "wasm".into(),
            attributes: vec![Attribute::new("action", "mint")],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "wasm");
    }

    #[test]
    fn query_request_parses_from_contract_json() {
        let raw = format!(
            r#"{{"bank":{{"balance":{{"address":"{}","denom":"ustake"}}}}}}"#,
            "00".repeat(20)
        );
        let request: QueryRequest = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            request,
            QueryRequest::Bank(BankQuery::Balance {
                address: Address::default(),
                denom: "ustake".into()
            })
        );
    }
}
