//! Dispatch of the messages a contract returns.
//!
//! Sub-messages run first, in order, each against its own overlay of the
//! store. A sub-message that succeeds is committed; one that fails leaves no
//! trace except the error text handed to the contract's reply entry point.
//! Plain messages run afterwards against the live store and any failure
//! aborts the whole call.

use super::keepers::DispatchOutput;
use super::ContractHost;
use crate::core::context::{Context, EventManager};
use crate::core::errors::HostError;
use crate::core::gas::GasMeter;
use crate::storage::overlay::OverlayStore;
use crate::types::address::Address;
use crate::virtual_machine::engine::Engine;
use crate::virtual_machine::types::{
    BankMsg, CosmosMsg, Reply, SubMsg, SubcallResponse, SubcallResult, WasmMsg,
};
use crate::{debug, info};

impl<E: Engine> ContractHost<E> {
    pub(crate) fn dispatch_all(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        ibc_port: Option<&str>,
        submessages: Vec<SubMsg>,
        messages: Vec<CosmosMsg>,
    ) -> Result<(), HostError> {
        self.dispatch_submessages(ctx, contract, ibc_port, submessages)?;
        for msg in &messages {
            let output = self.dispatch_msg(ctx, contract, ibc_port, msg)?;
            ctx.events().emit_all(output.events);
        }
        Ok(())
    }

    fn dispatch_submessages(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        ibc_port: Option<&str>,
        submessages: Vec<SubMsg>,
    ) -> Result<(), HostError> {
        for sub in submessages {
            let overlay = OverlayStore::new(ctx.store());
            let sandbox = ctx.with_store(&overlay);

            // A limit only matters when it is tighter than what is left.
            let remaining = ctx.gas_meter().remaining();
            let outcome = match sub.gas_limit.filter(|limit| *limit < remaining) {
                Some(limit) => {
                    let sub_meter = GasMeter::new(limit);
                    let outcome =
                        self.dispatch_msg(sandbox.with_gas_meter(&sub_meter), contract, ibc_port, &sub.msg);
                    ctx.gas_meter()
                        .consume(sub_meter.consumed(), "submessage gas")?;
                    outcome.map_err(|err| {
                        if err.is_fatal() {
                            info!("submessage {} of {} hit its gas limit {}", sub.id, contract, limit);
                            HostError::SubMsgOutOfGas(limit)
                        } else {
                            err
                        }
                    })
                }
                None => self.dispatch_msg(sandbox, contract, ibc_port, &sub.msg),
            };

            let result = match outcome {
                Ok(output) => {
                    overlay.commit();
                    ctx.events().emit_all(output.events.clone());
                    SubcallResult::Ok(SubcallResponse {
                        events: output.events,
                        data: output.data,
                    })
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    if self.config.contract_debug_mode {
                        info!("submessage {} of {} failed: {}", sub.id, contract, err);
                    } else {
                        debug!("submessage {} of {} failed: {}", sub.id, contract, err);
                    }
                    SubcallResult::Err(err.to_string())
                }
            };

            let reply = Reply { id: sub.id, result };
            self.reply(ctx, contract, &reply)?;
        }
        Ok(())
    }

    /// Routes one message and collects the events it produced.
    pub(crate) fn dispatch_msg(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        ibc_port: Option<&str>,
        msg: &CosmosMsg,
    ) -> Result<DispatchOutput, HostError> {
        let events = EventManager::new();
        let scoped = ctx.with_event_manager(&events);
        let data = match msg {
            CosmosMsg::Wasm(wasm) => self.dispatch_wasm_msg(scoped, contract, wasm)?,
            CosmosMsg::Bank(BankMsg::Send { to_address, amount }) => {
                self.keepers
                    .transferrer
                    .transfer_coins(scoped, contract, to_address, amount)?;
                None
            }
            CosmosMsg::Staking(_)
            | CosmosMsg::Distribution(_)
            | CosmosMsg::Ibc(_)
            | CosmosMsg::Stargate { .. }
            | CosmosMsg::Custom(_) => {
                let output = self
                    .keepers
                    .messenger
                    .dispatch_msg(scoped, contract, ibc_port, msg)?;
                events.emit_all(output.events);
                output.data
            }
        };
        Ok(DispatchOutput {
            events: events.into_events(),
            data,
        })
    }

    /// Contract-to-contract calls, sent with the contract as the actor.
    fn dispatch_wasm_msg(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        msg: &WasmMsg,
    ) -> Result<Option<Vec<u8>>, HostError> {
        match msg {
            WasmMsg::Execute {
                contract_addr,
                msg,
                funds,
            } => self.execute(ctx, contract_addr, contract, msg, funds),
            WasmMsg::Instantiate {
                admin,
                code_id,
                msg,
                funds,
                label,
            } => {
                let (addr, _) = self.instantiate(ctx, *code_id, contract, *admin, msg, label, funds)?;
                Ok(Some(addr.0.to_vec()))
            }
            WasmMsg::Migrate {
                contract_addr,
                new_code_id,
                msg,
            } => self.migrate(ctx, contract_addr, contract, *new_code_id, msg),
            WasmMsg::UpdateAdmin {
                contract_addr,
                admin,
            } => {
                self.update_contract_admin(ctx, contract_addr, contract, *admin)?;
                Ok(None)
            }
            WasmMsg::ClearAdmin { contract_addr } => {
                self.clear_contract_admin(ctx, contract_addr, contract)?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::core::contract::contract_address;
    use crate::core::errors::HostError;
    use crate::core::gas::GasMeter;
    use crate::host::keepers::BankKeeper;
    use crate::types::address::Address;
    use crate::types::coin::Coin;
    use crate::utils::test_utils::utils::{EntryPoint, TestHost, CREATOR};
    use crate::virtual_machine::errors::VmError;
    use crate::virtual_machine::types::{
        Attribute, BankMsg, CosmosMsg, Response, StakingMsg, SubMsg, SubcallResult, WasmMsg,
    };

    const RECIPIENT: Address = Address([0x77; 20]);

    fn execute_msg(contract: Address) -> CosmosMsg {
        CosmosMsg::Wasm(WasmMsg::Execute {
            contract_addr: contract,
            msg: b"{}".to_vec(),
            funds: vec![],
        })
    }

    fn send(amount: u128) -> CosmosMsg {
        CosmosMsg::Bank(BankMsg::Send {
            to_address: RECIPIENT,
            amount: vec![Coin::new(amount, "ustake")],
        })
    }

    /// Code whose execute sends `msg` as sub-message 1 and whose reply stores
    /// the outcome under `reply`.
    fn caller_with(t: &TestHost, code: &'static [u8], msg: CosmosMsg, gas_limit: Option<u64>) -> Address {
        let code_id = t.upload(code);
        let contract = t.instantiate(code_id);
        t.engine.on(code, move |call| match call.entry {
            EntryPoint::Execute => Ok(Response {
                submessages: vec![SubMsg {
                    id: 1,
                    msg: msg.clone(),
                    gas_limit,
                }],
                ..Default::default()
            }),
            EntryPoint::Reply => {
                let outcome = match &call.reply.unwrap().result {
                    SubcallResult::Ok(response) => {
                        let mut out = b"ok:".to_vec();
                        out.extend(response.data.clone().unwrap_or_default());
                        out
                    }
                    SubcallResult::Err(err) => format!("err:{}", err).into_bytes(),
                };
                call.vm.store.set(b"reply", &outcome)?;
                Ok(Response::default())
            }
            _ => Ok(Response::default()),
        });
        contract
    }

    #[test]
    fn failed_submessage_is_rolled_back_but_reply_persists() {
        let t = TestHost::new();
        let callee = t.instantiate(t.upload(b"callee"));
        t.engine.on(b"callee", |call| {
            call.vm.store.set(b"touched", b"1")?;
            Err(VmError::Contract("callee refused".into()))
        });
        let caller = caller_with(&t, b"caller", execute_msg(callee), None);

        t.host.execute(t.ctx(), &caller, &CREATOR, b"{}", &[]).unwrap();
        assert_eq!(t.host.query_raw(t.ctx(), &callee, Some(b"touched")), None);
        assert_eq!(
            t.host.query_raw(t.ctx(), &caller, Some(b"reply")),
            Some(b"err:execute wasm contract failed: callee refused".to_vec())
        );
    }

    #[test]
    fn successful_submessage_is_committed_with_its_events() {
        let t = TestHost::new();
        let callee = t.instantiate(t.upload(b"callee"));
        t.engine.on(b"callee", |call| {
            call.vm.store.set(b"touched", b"1")?;
            Ok(Response {
                attributes: vec![Attribute::new("action", "touch")],
                data: Some(b"done".to_vec()),
                ..Default::default()
            })
        });
        let caller = caller_with(&t, b"caller", execute_msg(callee), None);

        let events_before = t.events.len();
        t.host.execute(t.ctx(), &caller, &CREATOR, b"{}", &[]).unwrap();
        assert_eq!(t.host.query_raw(t.ctx(), &callee, Some(b"touched")), Some(b"1".to_vec()));
        assert_eq!(
            t.host.query_raw(t.ctx(), &caller, Some(b"reply")),
            Some(b"ok:done".to_vec())
        );
        let events = t.events.events();
        assert_eq!(events.len(), events_before + 1);
        assert_eq!(events[events_before].attributes[0].value, callee.to_string());
    }

    fn scenario(t: &TestHost) -> Address {
        let code_id = t.upload(b"payer");
        let contract = t.instantiate(code_id);
        t.engine.on(b"payer", |call| match call.entry {
            EntryPoint::Execute => {
                call.vm.store.set(b"mode", call.msg)?;
                Ok(Response {
                    submessages: vec![SubMsg {
                        id: 7,
                        msg: send(10),
                        gas_limit: None,
                    }],
                    ..Default::default()
                })
            }
            EntryPoint::Reply => {
                let reply = call.reply.unwrap();
                assert_eq!(reply.id, 7);
                match (&reply.result, call.vm.store.get(b"mode").as_deref()) {
                    (SubcallResult::Err(err), Some(b"rethrow")) => Err(VmError::Contract(err.clone())),
                    _ => Ok(Response::default()),
                }
            }
            _ => Ok(Response::default()),
        });
        contract
    }

    #[test]
    fn reply_can_rethrow_a_failed_transfer() {
        let t = TestHost::new();
        let contract = scenario(&t);
        let err = t
            .host
            .execute(t.ctx(), &contract, &CREATOR, b"rethrow", &[])
            .unwrap_err();
        assert!(matches!(err, HostError::ExecuteFailed(msg) if msg.contains("insufficient funds")));
    }

    #[test]
    fn reply_can_swallow_a_failed_transfer() {
        let t = TestHost::new();
        let contract = scenario(&t);
        t.host
            .execute(t.ctx(), &contract, &CREATOR, b"swallow", &[])
            .unwrap();
        assert_eq!(t.bank.balance(t.ctx(), &RECIPIENT, "ustake").amount, 0);
    }

    #[test]
    fn funded_transfer_submessage_moves_coins() {
        let t = TestHost::new();
        let contract = scenario(&t);
        t.bank.set_balance(t.ctx(), &contract, Coin::new(25, "ustake"));
        t.host
            .execute(t.ctx(), &contract, &CREATOR, b"rethrow", &[])
            .unwrap();
        assert_eq!(t.bank.balance(t.ctx(), &RECIPIENT, "ustake").amount, 10);
        assert_eq!(t.bank.balance(t.ctx(), &contract, "ustake").amount, 15);
    }

    fn burner(t: &TestHost) -> Address {
        let contract = t.instantiate(t.upload(b"burner"));
        t.engine.on(b"burner", |call| {
            call.gas_used = 5_000_000;
            Ok(Response::default())
        });
        contract
    }

    #[test]
    fn limited_submessage_running_dry_is_reported_to_reply() {
        let t = TestHost::new();
        let burner = burner(&t);
        let caller = caller_with(&t, b"caller", execute_msg(burner), Some(50_000));

        let meter = GasMeter::new(1_000_000);
        t.host
            .execute(t.ctx_with_meter(&meter), &caller, &CREATOR, b"{}", &[])
            .unwrap();
        // caller execute, the whole sub-limit, caller reply
        assert_eq!(meter.consumed(), 40_000 + 50_000 + 40_000);
        assert_eq!(
            t.host.query_raw(t.ctx(), &caller, Some(b"reply")),
            Some(b"err:submessage hit gas limit 50000".to_vec())
        );
    }

    #[test]
    fn unlimited_submessage_running_dry_aborts_everything() {
        let t = TestHost::new();
        let burner = burner(&t);
        let unlimited = caller_with(&t, b"unlimited", execute_msg(burner), None);
        let loose = caller_with(&t, b"loose", execute_msg(burner), Some(10_000_000));

        for caller in [unlimited, loose] {
            let meter = GasMeter::new(100_000);
            let err = t
                .host
                .execute(t.ctx_with_meter(&meter), &caller, &CREATOR, b"{}", &[])
                .unwrap_err();
            assert!(err.is_fatal());
            assert_eq!(meter.consumed(), 100_000);
            assert_eq!(t.host.query_raw(t.ctx(), &caller, Some(b"reply")), None);
        }
    }

    #[test]
    fn instantiate_submessage_returns_the_new_address() {
        let t = TestHost::new();
        let child_code = t.upload(b"child");
        let caller = caller_with(
            &t,
            b"factory",
            CosmosMsg::Wasm(WasmMsg::Instantiate {
                admin: None,
                code_id: child_code,
                msg: b"{}".to_vec(),
                funds: vec![],
                label: "child".into(),
            }),
            None,
        );

        t.host.execute(t.ctx(), &caller, &CREATOR, b"{}", &[]).unwrap();
        let child = contract_address(child_code, 2);
        let mut expected = b"ok:".to_vec();
        expected.extend_from_slice(child.as_slice());
        assert_eq!(t.host.query_raw(t.ctx(), &caller, Some(b"reply")), Some(expected));

        let info = t.host.get_contract_info(t.ctx(), &child).unwrap().unwrap();
        assert_eq!(info.creator, caller);
    }

    #[test]
    fn chain_messages_go_to_the_messenger() {
        let t = TestHost::new();
        let contract = t.instantiate(t.upload(b"delegator"));
        t.engine.on(b"delegator", |_| {
            Ok(Response {
                messages: vec![
                    CosmosMsg::Staking(StakingMsg::Delegate {
                        validator: "val".into(),
                        amount: Coin::new(5, "ustake"),
                    }),
                    CosmosMsg::Custom(serde_json::json!({ "mint": 1 })),
                ],
                ..Default::default()
            })
        });

        t.host.execute(t.ctx(), &contract, &CREATOR, b"{}", &[]).unwrap();
        let sent = t.messenger.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, contract);
        assert_eq!(sent[0].1, None);
        assert_eq!(sent[1].2.kind(), "custom");
        let kinds: Vec<_> = t
            .events
            .events()
            .into_iter()
            .filter(|e| e.ty == "message")
            .map(|e| e.attributes[0].value.clone())
            .collect();
        assert_eq!(kinds, vec!["staking", "custom"]);
    }

    #[test]
    fn failing_plain_message_aborts_the_call() {
        let t = TestHost::new();
        let contract = t.instantiate(t.upload(b"spender"));
        t.engine.on(b"spender", |_| {
            Ok(Response {
                messages: vec![send(10)],
                ..Default::default()
            })
        });
        assert!(matches!(
            t.host.execute(t.ctx(), &contract, &CREATOR, b"{}", &[]),
            Err(HostError::External(msg)) if msg.starts_with("insufficient funds")
        ));
    }

    #[test]
    fn submessages_returned_by_a_reply_are_dispatched() {
        let t = TestHost::new();
        let callee = t.instantiate(t.upload(b"callee"));
        t.engine.on(b"callee", |call| {
            call.vm.store.set(b"touched", b"1")?;
            Err(VmError::Contract("callee refused".into()))
        });
        let caller = t.instantiate(t.upload(b"chained"));
        t.engine.on(b"chained", move |call| {
            let id = match call.entry {
                EntryPoint::Reply => call.reply.unwrap().id,
                _ => 0,
            };
            if id > 0 {
                let mut seen = call.vm.store.get(b"replies").unwrap_or_default();
                seen.push(id as u8);
                call.vm.store.set(b"replies", &seen)?;
            }
            let submessages = match id {
                0 | 1 => vec![SubMsg {
                    id: id + 1,
                    msg: execute_msg(callee),
                    gas_limit: None,
                }],
                _ => vec![],
            };
            Ok(Response {
                submessages,
                ..Default::default()
            })
        });

        t.host.execute(t.ctx(), &caller, &CREATOR, b"{}", &[]).unwrap();
        assert_eq!(
            t.host.query_raw(t.ctx(), &caller, Some(b"replies")),
            Some(vec![1, 2])
        );
        assert_eq!(t.host.query_raw(t.ctx(), &callee, Some(b"touched")), None);
        let replies = t
            .engine
            .calls()
            .into_iter()
            .filter(|(entry, _)| *entry == EntryPoint::Reply)
            .count();
        assert_eq!(replies, 2);
    }

    #[test]
    fn reply_running_dry_after_limited_submessage_is_fatal() {
        let t = TestHost::new();
        let callee = t.instantiate(t.upload(b"cheap"));
        let caller = t.instantiate(t.upload(b"greedy"));
        t.engine.on(b"greedy", move |call| match call.entry {
            EntryPoint::Execute => Ok(Response {
                submessages: vec![SubMsg {
                    id: 1,
                    msg: execute_msg(callee),
                    gas_limit: Some(50_000),
                }],
                ..Default::default()
            }),
            _ => {
                call.gas_used = u64::MAX;
                Ok(Response::default())
            }
        });

        let meter = GasMeter::new(1_000_000);
        let err = t
            .host
            .execute(t.ctx_with_meter(&meter), &caller, &CREATOR, b"{}", &[])
            .unwrap_err();
        assert_eq!(err, HostError::OutOfGas("Wasmer function execution".into()));
        assert_eq!(meter.consumed(), 1_000_000);
    }
}
