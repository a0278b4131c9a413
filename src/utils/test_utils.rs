//! Test utilities for host testing.

#[cfg(test)]
pub mod utils {
    use crate::core::context::{BlockInfo, Context, EventManager};
    use crate::core::errors::HostError;
    use crate::core::gas::GasMeter;
    use crate::core::params::{HostConfig, Params};
    use crate::host::genesis::GenesisState;
    use crate::host::keepers::{
        AccountKeeper, BankCoinTransferrer, BankKeeper, DispatchOutput, Keepers, Messenger,
        PortKeeper,
    };
    use crate::host::query::QueryPlugins;
    use crate::host::ContractHost;
    use crate::storage::kv_store::MemStore;
    use crate::types::address::Address;
    use crate::types::coin::Coin;
    use crate::types::hash::{Checksum, Hash};
    use crate::virtual_machine::engine::{AnalysisReport, Engine, Metered, VmContext};
    use crate::virtual_machine::errors::VmError;
    use crate::virtual_machine::types::{
        Attribute, CosmosMsg, Env, Event, MessageInfo, Reply, Response,
    };
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::cell::RefCell;
    use std::collections::{HashMap, HashSet};
    use std::io::Write;
    use std::rc::Rc;

    pub const CREATOR: Address = Address([0xC1; 20]);

    pub fn gzip(data: &[u8], level: Compression) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), level);
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum EntryPoint {
        Instantiate,
        Execute,
        Migrate,
        Sudo,
        Reply,
        Query,
    }

    /// What a scripted contract sees when one of its entry points runs.
    pub struct MockCall<'a, 'b> {
        pub entry: EntryPoint,
        pub env: &'a Env,
        pub info: Option<&'a MessageInfo>,
        pub msg: &'a [u8],
        pub reply: Option<&'a Reply>,
        pub vm: &'a mut VmContext<'b>,
        /// Engine gas the call reports; beyond the budget it runs out of gas.
        pub gas_used: u64,
    }

    type Behavior = Rc<dyn Fn(&mut MockCall<'_, '_>) -> Result<Response, VmError>>;

    #[derive(Default)]
    struct EngineState {
        codes: RefCell<HashMap<Checksum, Vec<u8>>>,
        behaviors: RefCell<HashMap<Checksum, Behavior>>,
        ibc: RefCell<HashSet<Checksum>>,
        pinned: RefCell<HashSet<Checksum>>,
        calls: RefCell<Vec<(EntryPoint, Address)>>,
    }

    /// Engine whose contracts are closures keyed by the checksum of their code.
    ///
    /// Code without a behavior answers every entry point with an empty
    /// response. Clones share state.
    #[derive(Clone, Default)]
    pub struct MockEngine {
        state: Rc<EngineState>,
    }

    impl MockEngine {
        pub fn new() -> Self {
            Self::default()
        }

        /// Scripts every entry point of the contract built from `code`.
        pub fn on(
            &self,
            code: &[u8],
            behavior: impl Fn(&mut MockCall<'_, '_>) -> Result<Response, VmError> + 'static,
        ) {
            self.state
                .behaviors
                .borrow_mut()
                .insert(Hash::digest(code), Rc::new(behavior));
        }

        /// Marks `code` as exporting IBC entry points.
        pub fn with_ibc(&self, code: &[u8]) {
            self.state.ibc.borrow_mut().insert(Hash::digest(code));
        }

        pub fn is_pinned(&self, checksum: &Checksum) -> bool {
            self.state.pinned.borrow().contains(checksum)
        }

        pub fn clear_pins(&self) {
            self.state.pinned.borrow_mut().clear();
        }

        pub fn calls(&self) -> Vec<(EntryPoint, Address)> {
            self.state.calls.borrow().clone()
        }

        fn known(&self, checksum: &Checksum) -> Result<(), VmError> {
            if self.state.codes.borrow().contains_key(checksum) {
                Ok(())
            } else {
                Err(VmError::CodeNotFound(checksum.to_string()))
            }
        }

        #[allow(clippy::too_many_arguments)]
        fn run(
            &self,
            entry: EntryPoint,
            checksum: &Checksum,
            env: &Env,
            info: Option<&MessageInfo>,
            msg: &[u8],
            reply: Option<&Reply>,
            mut vm: VmContext<'_>,
        ) -> Metered<Response> {
            self.state
                .calls
                .borrow_mut()
                .push((entry, env.contract.address));
            if let Err(err) = self.known(checksum) {
                return Metered::new(Err(err), 0);
            }
            // No borrow may be held while the behavior runs: it can call back
            // into the host and from there into this engine.
            let behavior = self.state.behaviors.borrow().get(checksum).cloned();
            let gas_limit = vm.gas_limit;
            let mut call = MockCall {
                entry,
                env,
                info,
                msg,
                reply,
                vm: &mut vm,
                gas_used: 0,
            };
            let result = match behavior {
                Some(behavior) => behavior(&mut call),
                None => Ok(Response::default()),
            };
            if call.gas_used > gas_limit {
                return Metered::new(Err(VmError::OutOfGas), gas_limit);
            }
            Metered::new(result, call.gas_used)
        }
    }

    impl Engine for MockEngine {
        fn create(&self, code: &[u8]) -> Result<Checksum, VmError> {
            if code.is_empty() {
                return Err(VmError::Compile("empty wasm code".into()));
            }
            let checksum = Hash::digest(code);
            self.state.codes.borrow_mut().insert(checksum, code.to_vec());
            Ok(checksum)
        }

        fn analyze_code(&self, checksum: &Checksum) -> Result<AnalysisReport, VmError> {
            self.known(checksum)?;
            Ok(AnalysisReport {
                has_ibc_entry_points: self.state.ibc.borrow().contains(checksum),
            })
        }

        fn get_code(&self, checksum: &Checksum) -> Result<Vec<u8>, VmError> {
            self.state
                .codes
                .borrow()
                .get(checksum)
                .cloned()
                .ok_or_else(|| VmError::CodeNotFound(checksum.to_string()))
        }

        fn pin(&self, checksum: &Checksum) -> Result<(), VmError> {
            self.known(checksum)?;
            self.state.pinned.borrow_mut().insert(*checksum);
            Ok(())
        }

        fn unpin(&self, checksum: &Checksum) -> Result<(), VmError> {
            self.state.pinned.borrow_mut().remove(checksum);
            Ok(())
        }

        fn instantiate(
            &self,
            checksum: &Checksum,
            env: &Env,
            info: &MessageInfo,
            msg: &[u8],
            vm: VmContext<'_>,
        ) -> Metered<Response> {
            self.run(EntryPoint::Instantiate, checksum, env, Some(info), msg, None, vm)
        }

        fn execute(
            &self,
            checksum: &Checksum,
            env: &Env,
            info: &MessageInfo,
            msg: &[u8],
            vm: VmContext<'_>,
        ) -> Metered<Response> {
            self.run(EntryPoint::Execute, checksum, env, Some(info), msg, None, vm)
        }

        fn migrate(&self, checksum: &Checksum, env: &Env, msg: &[u8], vm: VmContext<'_>) -> Metered<Response> {
            self.run(EntryPoint::Migrate, checksum, env, None, msg, None, vm)
        }

        fn sudo(&self, checksum: &Checksum, env: &Env, msg: &[u8], vm: VmContext<'_>) -> Metered<Response> {
            self.run(EntryPoint::Sudo, checksum, env, None, msg, None, vm)
        }

        fn reply(&self, checksum: &Checksum, env: &Env, reply: &Reply, vm: VmContext<'_>) -> Metered<Response> {
            self.run(EntryPoint::Reply, checksum, env, None, &[], Some(reply), vm)
        }

        fn query(&self, checksum: &Checksum, env: &Env, msg: &[u8], vm: VmContext<'_>) -> Metered<Vec<u8>> {
            let metered = self.run(EntryPoint::Query, checksum, env, None, msg, None, vm);
            Metered::new(
                metered.result.map(|response| response.data.unwrap_or_default()),
                metered.gas_used,
            )
        }
    }

    const BALANCE_PREFIX: u8 = 0x80;
    const ACCOUNT_PREFIX: u8 = 0x81;

    fn balance_prefix(addr: &Address) -> Vec<u8> {
        let mut key = vec![BALANCE_PREFIX];
        key.extend_from_slice(addr.as_slice());
        key
    }

    fn balance_key(addr: &Address, denom: &str) -> Vec<u8> {
        let mut key = balance_prefix(addr);
        key.extend_from_slice(denom.as_bytes());
        key
    }

    fn decode_amount(raw: &[u8]) -> u128 {
        raw.try_into().map(u128::from_be_bytes).unwrap_or(0)
    }

    /// Bank keeping balances in the context's store, so a discarded overlay
    /// rolls transfers back.
    #[derive(Default)]
    pub struct MockBank {
        disabled: RefCell<HashSet<String>>,
        blocked: RefCell<HashSet<Address>>,
    }

    impl MockBank {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_balance(&self, ctx: Context<'_>, addr: &Address, coin: Coin) {
            ctx.store()
                .set(&balance_key(addr, &coin.denom), coin.amount.to_be_bytes().to_vec());
        }

        pub fn disable_send(&self, denom: &str) {
            self.disabled.borrow_mut().insert(denom.to_string());
        }

        pub fn block(&self, addr: Address) {
            self.blocked.borrow_mut().insert(addr);
        }
    }

    impl BankKeeper for MockBank {
        fn is_send_enabled(&self, _: Context<'_>, denom: &str) -> bool {
            !self.disabled.borrow().contains(denom)
        }

        fn is_blocked(&self, addr: &Address) -> bool {
            self.blocked.borrow().contains(addr)
        }

        fn send_coins(
            &self,
            ctx: Context<'_>,
            from: &Address,
            to: &Address,
            amount: &[Coin],
        ) -> Result<(), HostError> {
            for coin in amount {
                let available = self.balance(ctx, from, &coin.denom).amount;
                if available < coin.amount {
                    return Err(HostError::External(format!(
                        "insufficient funds: {}{} < {}{}",
                        available, coin.denom, coin.amount, coin.denom
                    )));
                }
            }
            for coin in amount {
                let from_balance = self.balance(ctx, from, &coin.denom).amount;
                let to_balance = self.balance(ctx, to, &coin.denom).amount;
                self.set_balance(ctx, from, Coin::new(from_balance - coin.amount, &coin.denom));
                self.set_balance(ctx, to, Coin::new(to_balance + coin.amount, &coin.denom));
            }
            Ok(())
        }

        fn balance(&self, ctx: Context<'_>, addr: &Address, denom: &str) -> Coin {
            let amount = ctx
                .store()
                .get(&balance_key(addr, denom))
                .map(|raw| decode_amount(&raw))
                .unwrap_or(0);
            Coin::new(amount, denom)
        }

        fn all_balances(&self, ctx: Context<'_>, addr: &Address) -> Vec<Coin> {
            let prefix = balance_prefix(addr);
            ctx.store()
                .prefix_range(&prefix)
                .into_iter()
                .map(|(key, raw)| {
                    let denom = String::from_utf8_lossy(&key[prefix.len()..]).into_owned();
                    Coin::new(decode_amount(&raw), denom)
                })
                .filter(|coin| coin.amount > 0)
                .collect()
        }
    }

    /// Accounts are markers in the context's store.
    pub struct MockAccounts;

    impl MockAccounts {
        fn key(addr: &Address) -> Vec<u8> {
            let mut key = vec![ACCOUNT_PREFIX];
            key.extend_from_slice(addr.as_slice());
            key
        }
    }

    impl AccountKeeper for MockAccounts {
        fn has_account(&self, ctx: Context<'_>, addr: &Address) -> bool {
            ctx.store().has(&Self::key(addr))
        }

        fn create_account(&self, ctx: Context<'_>, addr: &Address) -> Result<(), HostError> {
            ctx.store().set(&Self::key(addr), vec![1]);
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    pub struct MockPorts {
        pub bound: Rc<RefCell<Vec<String>>>,
    }

    impl PortKeeper for MockPorts {
        fn bind_port(&self, _: Context<'_>, port_id: &str) -> Result<(), HostError> {
            self.bound.borrow_mut().push(port_id.to_string());
            Ok(())
        }
    }

    /// Records every message it is asked to dispatch and answers with one
    /// event naming the message kind.
    #[derive(Clone, Default)]
    pub struct RecordingMessenger {
        pub sent: Rc<RefCell<Vec<(Address, Option<String>, CosmosMsg)>>>,
    }

    impl Messenger for RecordingMessenger {
        fn dispatch_msg(
            &self,
            _: Context<'_>,
            contract: &Address,
            ibc_port: Option<&str>,
            msg: &CosmosMsg,
        ) -> Result<DispatchOutput, HostError> {
            self.sent
                .borrow_mut()
                .push((*contract, ibc_port.map(str::to_string), msg.clone()));
            Ok(DispatchOutput {
                events: vec![Event {
                    ty: "message".into(),
                    attributes: vec![Attribute::new("kind", msg.kind())],
                }],
                data: None,
            })
        }
    }

    /// A host over an in-memory store with mock collaborators.
    pub struct TestHost {
        pub store: MemStore,
        pub meter: GasMeter,
        pub events: EventManager,
        pub block: BlockInfo,
        pub engine: MockEngine,
        pub bank: Rc<MockBank>,
        pub ports: MockPorts,
        pub messenger: RecordingMessenger,
        pub host: ContractHost<MockEngine>,
    }

    impl TestHost {
        pub fn new() -> Self {
            let engine = MockEngine::new();
            let bank = Rc::new(MockBank::new());
            let ports = MockPorts::default();
            let messenger = RecordingMessenger::default();
            let keepers = Keepers {
                accounts: Box::new(MockAccounts),
                transferrer: Box::new(BankCoinTransferrer::new(bank.clone())),
                ports: Box::new(ports.clone()),
                messenger: Box::new(messenger.clone()),
            };
            let host = ContractHost::new(
                engine.clone(),
                keepers,
                QueryPlugins::with_bank(bank.clone()),
                Params::default(),
                HostConfig::default(),
            )
            .unwrap();
            Self {
                store: MemStore::new(),
                meter: GasMeter::infinite(),
                events: EventManager::new(),
                block: BlockInfo {
                    height: 10,
                    time: 1_700_000_000_000_000_000,
                    chain_id: "testing".into(),
                },
                engine,
                bank,
                ports,
                messenger,
                host,
            }
        }

        pub fn ctx(&self) -> Context<'_> {
            Context::new(&self.store, &self.meter, &self.events, &self.block)
        }

        pub fn ctx_with_meter<'a>(&'a self, meter: &'a GasMeter) -> Context<'a> {
            Context::new(&self.store, meter, &self.events, &self.block)
        }

        /// Uploads `code` as [`CREATOR`] with default permissions.
        pub fn upload(&self, code: &[u8]) -> u64 {
            self.host
                .create(self.ctx(), &CREATOR, code, "", "", None)
                .unwrap()
        }

        /// Instantiates `code_id` as [`CREATOR`], who also becomes admin.
        pub fn instantiate(&self, code_id: u64) -> Address {
            self.host
                .instantiate(self.ctx(), code_id, &CREATOR, Some(CREATOR), b"{}", "test", &[])
                .unwrap()
                .0
        }

        pub fn init_genesis(&mut self, state: &GenesisState) -> Result<(), HostError> {
            let ctx = Context::new(&self.store, &self.meter, &self.events, &self.block);
            self.host.init_genesis(ctx, state)
        }
    }
}
