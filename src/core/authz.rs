//! Pluggable access control for permissioned host actions.

use crate::core::access::AccessConfig;
use crate::types::address::Address;

/// Decides whether an actor may perform a permissioned action.
///
/// The host runs with [`DefaultAuthorizationPolicy`]; privileged callers
/// (governance) substitute another policy for a single call.
pub trait AuthorizationPolicy {
    fn can_create_code(&self, config: &AccessConfig, actor: &Address) -> bool;
    fn can_instantiate_contract(&self, config: &AccessConfig, actor: &Address) -> bool;
    fn can_modify_contract(&self, admin: Option<&Address>, actor: &Address) -> bool;
    fn can_update_contract_status(&self, config: &AccessConfig, actor: &Address) -> bool;
}

/// Access configs decide; contract changes require the current admin.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAuthorizationPolicy;

impl AuthorizationPolicy for DefaultAuthorizationPolicy {
    fn can_create_code(&self, config: &AccessConfig, actor: &Address) -> bool {
        config.allowed(actor)
    }

    fn can_instantiate_contract(&self, config: &AccessConfig, actor: &Address) -> bool {
        config.allowed(actor)
    }

    fn can_modify_contract(&self, admin: Option<&Address>, actor: &Address) -> bool {
        admin == Some(actor)
    }

    fn can_update_contract_status(&self, config: &AccessConfig, actor: &Address) -> bool {
        config.allowed(actor)
    }
}

/// Allows everything. Used for proposals that already passed governance.
#[derive(Clone, Copy, Debug, Default)]
pub struct GovAuthorizationPolicy;

impl AuthorizationPolicy for GovAuthorizationPolicy {
    fn can_create_code(&self, _: &AccessConfig, _: &Address) -> bool {
        true
    }

    fn can_instantiate_contract(&self, _: &AccessConfig, _: &Address) -> bool {
        true
    }

    fn can_modify_contract(&self, _: Option<&Address>, _: &Address) -> bool {
        true
    }

    fn can_update_contract_status(&self, _: &AccessConfig, _: &Address) -> bool {
        true
    }
}
