// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Governance gate: the single DAO identity and the parameters it tunes.
//!
//! `dispute_window` and `insurance` are live globals read only when a
//! condition is created; the record keeps its own copy from then on. The
//! decision period is fixed when the gate is constructed.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Seconds, TokenAmount};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GovernanceError {
    #[error("caller {0} is not the DAO")]
    OnlyDao(Address),

    #[error("dispute period must be positive")]
    IncorrectDisputePeriod,
}

/// DAO-tunable globals, snapshotted into each new condition record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceParams {
    /// Seconds after a proposal during which it may be disputed.
    pub dispute_window: Seconds,
    /// Stake escrowed by the reporter for each condition.
    pub insurance: TokenAmount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceGate {
    dao: Address,
    params: GovernanceParams,
    decision_period: Seconds,
}

impl GovernanceGate {
    pub fn new(dao: Address, params: GovernanceParams, decision_period: Seconds) -> Self {
        Self {
            dao,
            params,
            decision_period,
        }
    }

    pub fn dao(&self) -> &Address {
        &self.dao
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn decision_period(&self) -> Seconds {
        self.decision_period
    }

    pub fn is_dao(&self, account: &Address) -> bool {
        account == &self.dao
    }

    pub fn ensure_dao(&self, caller: &Address) -> Result<(), GovernanceError> {
        if !self.is_dao(caller) {
            return Err(GovernanceError::OnlyDao(caller.clone()));
        }
        Ok(())
    }

    /// Applies to conditions created afterwards only.
    pub fn change_dispute_period(&mut self, caller: &Address, period: Seconds) -> Result<(), GovernanceError> {
        self.ensure_dao(caller)?;
        if period == 0 {
            return Err(GovernanceError::IncorrectDisputePeriod);
        }
        self.params.dispute_window = period;
        Ok(())
    }

    /// Applies to conditions created afterwards only.
    pub fn change_insurance(&mut self, caller: &Address, amount: TokenAmount) -> Result<(), GovernanceError> {
        self.ensure_dao(caller)?;
        self.params.insurance = amount;
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_dao: Address) -> Result<Address, GovernanceError> {
        self.ensure_dao(caller)?;
        Ok(std::mem::replace(&mut self.dao, new_dao))
    }
}
