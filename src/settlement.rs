// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Payout planning for every terminal path.
//!
//! No value creation occurs here. Each plan splits exactly what the record
//! escrowed (insurance plus the disputer's half stake, if any) among the
//! reporter, the disputer and the DAO:
//!
//! | path                 | reporter  | disputer  | DAO       |
//! |----------------------|-----------|-----------|-----------|
//! | accepted             | insurance | -         | -         |
//! | governance resolved  | 0         | insurance | insurance/2 |
//! | governance cancelled | 0         | insurance | insurance/2 |
//! | dispute rejected     | insurance | 0         | insurance/2 |
//! | timed out            | insurance | stake back | 0        |
//! | external, early      | insurance | -         | -         |
//! | external, late       | 0         | stake back | insurance |

use serde::{Deserialize, Serialize};

use crate::condition::ConditionRecord;
use crate::types::{Address, Timestamp, TokenAmount};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("path {0:?} requires a disputer")]
    MissingDisputer(SettlementPath),

    #[error("path {0:?} is not a governance decision")]
    NotGovernancePath(SettlementPath),
}

/// Terminal path a record settled through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SettlementPath {
    Accepted,
    GovernanceResolved,
    GovernanceCanceled,
    DisputeRejected,
    TimedOut,
    ExternallyCanceled,
}

/// Which party a payout goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayoutRole {
    Reporter,
    Disputer,
    Dao,
}

/// One ledger credit issued at settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub account: Address,
    pub role: PayoutRole,
    pub amount: TokenAmount,
}

/// Complete split of one record's escrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub path: SettlementPath,
    pub escrowed: TokenAmount,
    pub payouts: Vec<Payout>,
}

impl SettlementPlan {
    pub fn total_paid(&self) -> TokenAmount {
        self.payouts.iter().map(|p| p.amount).sum()
    }

    pub fn amount_for(&self, role: PayoutRole) -> TokenAmount {
        self.payouts
            .iter()
            .filter(|p| p.role == role)
            .map(|p| p.amount)
            .sum()
    }
}

fn pay(account: &Address, role: PayoutRole, amount: TokenAmount) -> Payout {
    Payout {
        account: account.clone(),
        role,
        amount,
    }
}

/// Unchallenged proposal applied: the reporter gets the insurance back.
pub fn plan_acceptance(record: &ConditionRecord) -> SettlementPlan {
    SettlementPlan {
        path: SettlementPath::Accepted,
        escrowed: record.escrowed,
        payouts: vec![pay(&record.reporter, PayoutRole::Reporter, record.insurance)],
    }
}

/// DAO decision on a disputed record.
///
/// Overturning (new outcome or cancel) pays the disputer the full insurance
/// and the DAO the disputer's half stake; rejecting the dispute returns the
/// insurance to the reporter and gives the DAO the forfeited half stake.
pub fn plan_governance(
    record: &ConditionRecord,
    dao: &Address,
    path: SettlementPath,
) -> Result<SettlementPlan, SettlementError> {
    let disputer = record
        .disputer()
        .ok_or(SettlementError::MissingDisputer(path))?;
    let dao_fee = record.dispute_stake();

    let payouts = match path {
        SettlementPath::GovernanceResolved | SettlementPath::GovernanceCanceled => vec![
            pay(disputer, PayoutRole::Disputer, record.insurance),
            pay(dao, PayoutRole::Dao, dao_fee),
        ],
        SettlementPath::DisputeRejected => vec![
            pay(&record.reporter, PayoutRole::Reporter, record.insurance),
            pay(dao, PayoutRole::Dao, dao_fee),
        ],
        other => return Err(SettlementError::NotGovernancePath(other)),
    };

    Ok(SettlementPlan {
        path,
        escrowed: record.escrowed,
        payouts,
    })
}

/// Nobody finalised in time: every party gets its own stake back.
pub fn plan_timeout(record: &ConditionRecord) -> SettlementPlan {
    let mut payouts = vec![pay(&record.reporter, PayoutRole::Reporter, record.insurance)];
    if let Some(disputer) = record.disputer() {
        payouts.push(pay(disputer, PayoutRole::Disputer, record.dispute_stake()));
    }
    SettlementPlan {
        path: SettlementPath::TimedOut,
        escrowed: record.escrowed,
        payouts,
    }
}

/// Registry cancelled the condition on its own.
///
/// The reporter is refunded only if the cancellation happened strictly
/// before the propose deadline and nothing was ever proposed. Otherwise the
/// insurance goes to the DAO and a disputer recovers only its own stake.
pub fn plan_external_cancellation(
    record: &ConditionRecord,
    dao: &Address,
    canceled_at: Timestamp,
) -> SettlementPlan {
    let early = canceled_at < record.propose_deadline && record.proposal.is_none();

    let payouts = if early {
        vec![pay(&record.reporter, PayoutRole::Reporter, record.insurance)]
    } else {
        let mut payouts = Vec::with_capacity(2);
        if let Some(disputer) = record.disputer() {
            payouts.push(pay(disputer, PayoutRole::Disputer, record.dispute_stake()));
        }
        payouts.push(pay(dao, PayoutRole::Dao, record.insurance));
        payouts
    };

    SettlementPlan {
        path: SettlementPath::ExternallyCanceled,
        escrowed: record.escrowed,
        payouts,
    }
}
