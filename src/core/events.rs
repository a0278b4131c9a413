//! Conversion of contract attributes into chain events.

use crate::types::address::Address;
use crate::virtual_machine::types::{Attribute, Event};

pub const WASM_EVENT_TYPE: &str = "wasm";
pub const CONTRACT_ADDRESS_ATTRIBUTE: &str = "contract_address";

/// Wraps a contract's attributes in a single `wasm` event attributed to it.
///
/// Returns no event when the contract set no attributes. Contracts cannot
/// override the attribution: their own `contract_address` attributes are
/// dropped.
pub fn parse_events(attributes: &[Attribute], contract: &Address) -> Vec<Event> {
    if attributes.is_empty() {
        return Vec::new();
    }
    let mut attrs = Vec::with_capacity(attributes.len() + 1);
    attrs.push(Attribute::new(CONTRACT_ADDRESS_ATTRIBUTE, contract.to_string()));
    attrs.extend(
        attributes
            .iter()
            .filter(|a| a.key != CONTRACT_ADDRESS_ATTRIBUTE)
            .cloned(),
    );
    vec![Event {
        ty: WASM_EVENT_TYPE.to_string(),
        attributes: attrs,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_attributes_means_no_event() {
        assert!(parse_events(&[], &Address([1; 20])).is_empty());
    }

    #[test]
    fn contract_address_comes_first() {
        let contract = Address([1; 20]);
        let events = parse_events(&[Attribute::new("action", "transfer")], &contract);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ty, "wasm");
        assert_eq!(
            events[0].attributes,
            vec![
                Attribute::new("contract_address", contract.to_string()),
                Attribute::new("action", "transfer"),
            ]
        );
    }

    #[test]
    fn contracts_cannot_spoof_attribution() {
        let contract = Address([1; 20]);
        let spoof = Attribute::new("contract_address", Address([2; 20]).to_string());
        let events = parse_events(&[spoof, Attribute::new("k", "v")], &contract);
        let attrs = &events[0].attributes;
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].value, contract.to_string());
    }
}
