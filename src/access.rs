// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Oracle capability gate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("{0} is not the role admin")]
    NotAdmin(Address),
}

/// Answers whether an identity holds the oracle capability.
pub trait AccessControl {
    fn is_oracle(&self, account: &Address) -> bool;
}

/// Admin-managed set of oracle identities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleRegistry {
    admin: Address,
    oracles: BTreeSet<Address>,
}

impl RoleRegistry {
    pub fn new(admin: impl Into<Address>) -> Self {
        Self {
            admin: admin.into(),
            oracles: BTreeSet::new(),
        }
    }

    pub fn admin(&self) -> &Address {
        &self.admin
    }

    pub fn grant_oracle(&mut self, caller: &Address, account: impl Into<Address>) -> Result<bool, AccessError> {
        self.ensure_admin(caller)?;
        let account = account.into();
        let added = self.oracles.insert(account.clone());
        if added {
            tracing::info!(oracle = %account, "oracle role granted");
        }
        Ok(added)
    }

    pub fn revoke_oracle(&mut self, caller: &Address, account: &Address) -> Result<bool, AccessError> {
        self.ensure_admin(caller)?;
        let removed = self.oracles.remove(account);
        if removed {
            tracing::info!(oracle = %account, "oracle role revoked");
        }
        Ok(removed)
    }

    fn ensure_admin(&self, caller: &Address) -> Result<(), AccessError> {
        if caller != &self.admin {
            return Err(AccessError::NotAdmin(caller.clone()));
        }
        Ok(())
    }
}

impl AccessControl for RoleRegistry {
    fn is_oracle(&self, account: &Address) -> bool {
        self.oracles.contains(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_grants_and_revokes() {
        let admin = Address::from("dao");
        let mut roles = RoleRegistry::new(admin.clone());
        assert!(roles.grant_oracle(&admin, "oracle-1").expect("test: admin grant"));
        assert!(roles.is_oracle(&Address::from("oracle-1")));
        assert!(!roles.grant_oracle(&admin, "oracle-1").expect("test: repeat grant"));

        assert!(roles
            .revoke_oracle(&admin, &Address::from("oracle-1"))
            .expect("test: admin revoke"));
        assert!(!roles.is_oracle(&Address::from("oracle-1")));
    }

    #[test]
    fn non_admin_cannot_grant() {
        let mut roles = RoleRegistry::new("dao");
        let err = roles.grant_oracle(&Address::from("mallory"), "mallory");
        assert_eq!(err, Err(AccessError::NotAdmin(Address::from("mallory"))));
        assert!(!roles.is_oracle(&Address::from("mallory")));
    }
}
