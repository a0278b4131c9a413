//! Gas accounting between the host and the execution engine.
//!
//! The host meters in host gas units. The engine meters in its own, finer
//! units; a call's budget is the host's remaining gas times the gas
//! multiplier (capped at [`MAX_GAS`]) and whatever the engine reports back
//! is divided by the multiplier before it is charged.

use crate::core::errors::HostError;
use crate::virtual_machine::engine::VmGasMeter;
use std::cell::Cell;

/// Upper bound for a single engine call, in engine units.
pub const MAX_GAS: u64 = 10_000_000_000;

/// Monotonic gas counter with a hard limit.
///
/// Consumption never exceeds the limit: a charge that would cross it leaves
/// the meter exactly at its limit and fails with [`HostError::OutOfGas`].
#[derive(Debug)]
pub struct GasMeter {
    limit: u64,
    consumed: Cell<u64>,
}

impl GasMeter {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            consumed: Cell::new(0),
        }
    }

    /// A meter that never runs out, used for genesis and privileged calls.
    pub fn infinite() -> Self {
        Self::new(u64::MAX)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn consumed(&self) -> u64 {
        self.consumed.get()
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.consumed.get()
    }

    pub fn is_out_of_gas(&self) -> bool {
        self.consumed.get() >= self.limit
    }

    /// Charges `amount`, failing once the limit would be crossed.
    pub fn consume(&self, amount: u64, descriptor: &str) -> Result<(), HostError> {
        let total = self.consumed.get().saturating_add(amount);
        if total > self.limit {
            self.consumed.set(self.limit);
            return Err(HostError::OutOfGas(descriptor.to_string()));
        }
        self.consumed.set(total);
        Ok(())
    }
}

/// Engine budget derived from what is left on the host meter.
pub fn gas_for_contract(meter: &GasMeter, multiplier: u64) -> u64 {
    if meter.is_out_of_gas() {
        return 0;
    }
    meter.remaining().saturating_mul(multiplier).min(MAX_GAS)
}

/// Charges engine gas to the host meter.
///
/// Landing exactly on the limit is already exhaustion: the engine was given
/// the whole remaining budget, so nothing may run after it.
pub fn consume_vm_gas(meter: &GasMeter, vm_gas_used: u64, multiplier: u64) -> Result<(), HostError> {
    meter.consume(vm_gas_used / multiplier.max(1), "wasm contract")?;
    if meter.is_out_of_gas() {
        return Err(HostError::OutOfGas("Wasmer function execution".to_string()));
    }
    Ok(())
}

/// Engine-facing view of a host meter that reports consumption in engine units.
pub struct MultipliedGasMeter<'a> {
    meter: &'a GasMeter,
    multiplier: u64,
}

impl<'a> MultipliedGasMeter<'a> {
    pub fn new(meter: &'a GasMeter, multiplier: u64) -> Self {
        Self { meter, multiplier }
    }
}

impl VmGasMeter for MultipliedGasMeter<'_> {
    fn gas_consumed(&self) -> u64 {
        self.meter.consumed().saturating_mul(self.multiplier)
    }
}
