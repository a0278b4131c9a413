//! Chain collaborators the host depends on.
//!
//! Each collaborator works against the [`Context`] it is handed, so writes
//! made inside a sub-message sandbox are rolled back with it.

use crate::core::context::Context;
use crate::core::errors::HostError;
use crate::types::address::Address;
use crate::types::coin::Coin;
use crate::virtual_machine::types::{CosmosMsg, Event};
use std::rc::Rc;

pub trait AccountKeeper {
    fn has_account(&self, ctx: Context<'_>, addr: &Address) -> bool;
    fn create_account(&self, ctx: Context<'_>, addr: &Address) -> Result<(), HostError>;
}

pub trait BankKeeper {
    fn is_send_enabled(&self, ctx: Context<'_>, denom: &str) -> bool;
    /// Addresses that may not send funds (module accounts).
    fn is_blocked(&self, addr: &Address) -> bool;
    fn send_coins(
        &self,
        ctx: Context<'_>,
        from: &Address,
        to: &Address,
        amount: &[Coin],
    ) -> Result<(), HostError>;
    fn balance(&self, ctx: Context<'_>, addr: &Address, denom: &str) -> Coin;
    fn all_balances(&self, ctx: Context<'_>, addr: &Address) -> Vec<Coin>;
}

/// Moves funds attached to contract calls.
pub trait CoinTransferrer {
    fn transfer_coins(
        &self,
        ctx: Context<'_>,
        from: &Address,
        to: &Address,
        amount: &[Coin],
    ) -> Result<(), HostError>;
}

/// [`CoinTransferrer`] that honors the bank's send-enabled flags and blocklist.
pub struct BankCoinTransferrer {
    bank: Rc<dyn BankKeeper>,
}

impl BankCoinTransferrer {
    pub fn new(bank: Rc<dyn BankKeeper>) -> Self {
        Self { bank }
    }
}

impl CoinTransferrer for BankCoinTransferrer {
    fn transfer_coins(
        &self,
        ctx: Context<'_>,
        from: &Address,
        to: &Address,
        amount: &[Coin],
    ) -> Result<(), HostError> {
        if let Some(coin) = amount
            .iter()
            .find(|c| !self.bank.is_send_enabled(ctx, &c.denom))
        {
            return Err(HostError::SendDisabled(coin.denom.clone()));
        }
        if self.bank.is_blocked(from) {
            return Err(HostError::InvalidAddress(format!(
                "blocked address can not be used: {}",
                from
            )));
        }
        self.bank.send_coins(ctx, from, to, amount)
    }
}

/// Binds IBC ports for contracts with IBC entry points.
pub trait PortKeeper {
    fn bind_port(&self, ctx: Context<'_>, port_id: &str) -> Result<(), HostError>;
}

/// Events and data produced by dispatching one message.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DispatchOutput {
    pub events: Vec<Event>,
    pub data: Option<Vec<u8>>,
}

/// Handles the chain-level messages that are not addressed to the host.
pub trait Messenger {
    fn dispatch_msg(
        &self,
        ctx: Context<'_>,
        contract: &Address,
        ibc_port: Option<&str>,
        msg: &CosmosMsg,
    ) -> Result<DispatchOutput, HostError>;
}

/// Collaborators injected into the host at construction.
pub struct Keepers {
    pub accounts: Box<dyn AccountKeeper>,
    pub transferrer: Box<dyn CoinTransferrer>,
    pub ports: Box<dyn PortKeeper>,
    pub messenger: Box<dyn Messenger>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::{BlockInfo, EventManager};
    use crate::core::gas::GasMeter;
    use crate::storage::kv_store::MemStore;
    use crate::utils::test_utils::utils::MockBank;

    #[test]
    fn transfer_moves_funds() {
        let store = MemStore::new();
        let meter = GasMeter::infinite();
        let events = EventManager::new();
        let block = BlockInfo::default();
        let ctx = Context::new(&store, &meter, &events, &block);

        let bank = Rc::new(MockBank::new());
        let (alice, bob) = (Address([1; 20]), Address([2; 20]));
        bank.set_balance(ctx, &alice, Coin::new(100, "ustake"));

        let transferrer = BankCoinTransferrer::new(bank.clone());
        transferrer
            .transfer_coins(ctx, &alice, &bob, &[Coin::new(40, "ustake")])
            .unwrap();
        assert_eq!(bank.balance(ctx, &alice, "ustake").amount, 60);
        assert_eq!(bank.balance(ctx, &bob, "ustake").amount, 40);
    }

    #[test]
    fn disabled_denom_is_rejected() {
        let store = MemStore::new();
        let meter = GasMeter::infinite();
        let events = EventManager::new();
        let block = BlockInfo::default();
        let ctx = Context::new(&store, &meter, &events, &block);

        let bank = Rc::new(MockBank::new());
        bank.disable_send("frozen");
        let transferrer = BankCoinTransferrer::new(bank);
        let err = transferrer
            .transfer_coins(ctx, &Address([1; 20]), &Address([2; 20]), &[Coin::new(1, "frozen")])
            .unwrap_err();
        assert_eq!(err, HostError::SendDisabled("frozen".into()));
    }

    #[test]
    fn blocked_sender_is_rejected() {
        let store = MemStore::new();
        let meter = GasMeter::infinite();
        let events = EventManager::new();
        let block = BlockInfo::default();
        let ctx = Context::new(&store, &meter, &events, &block);

        let bank = Rc::new(MockBank::new());
        let module = Address([9; 20]);
        bank.block(module);
        bank.set_balance(ctx, &module, Coin::new(5, "ustake"));
        let transferrer = BankCoinTransferrer::new(bank);
        let err = transferrer
            .transfer_coins(ctx, &module, &Address([2; 20]), &[Coin::new(1, "ustake")])
            .unwrap_err();
        assert!(matches!(err, HostError::InvalidAddress(_)));
    }
}
