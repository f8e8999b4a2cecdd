// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Engine events. Every state change appends one; hosts drain the journal
//! with [`EventJournal::drain`].

use serde::{Deserialize, Serialize};

use crate::settlement::{Payout, SettlementPath};
use crate::types::{Address, ConditionKey, Outcome, Seconds, Timestamp, TokenAmount};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    ConditionCreated {
        key: ConditionKey,
        reporter: Address,
        propose_deadline: Timestamp,
        insurance: TokenAmount,
    },
    OutcomeProposed {
        key: ConditionKey,
        outcome: Outcome,
        at: Timestamp,
    },
    ConditionDisputed {
        key: ConditionKey,
        disputer: Address,
        stake: TokenAmount,
        at: Timestamp,
    },
    /// Acceptance was absorbed because the registry refused the outcome.
    AcceptanceDeferred {
        key: ConditionKey,
        outcome: Outcome,
        reason: String,
    },
    ConditionSettled {
        key: ConditionKey,
        path: SettlementPath,
        outcome: Option<Outcome>,
        payouts: Vec<Payout>,
        at: Timestamp,
    },
    Withdrawn {
        account: Address,
        amount: TokenAmount,
    },
    DisputePeriodChanged {
        period: Seconds,
    },
    InsuranceChanged {
        amount: TokenAmount,
    },
    OwnershipTransferred {
        previous: Address,
        new: Address,
    },
}

/// Append-only event log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventJournal {
    events: Vec<EngineEvent>,
}

impl EventJournal {
    pub fn push(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineEvent> {
        self.events.iter()
    }

    /// Take every pending event, leaving the journal empty.
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.events)
    }
}
