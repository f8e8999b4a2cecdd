// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Per-condition record kept by the engine.
//!
//! Global parameters are copied into the record at creation, so every window
//! computed here depends only on the record itself and the deployment-wide
//! decision period.

use serde::{Deserialize, Serialize};

use crate::lifecycle::Stage;
use crate::settlement::Payout;
use crate::types::{Address, ConditionKey, GameId, Outcome, Seconds, Timestamp, TokenAmount};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub outcome: Outcome,
    pub proposed_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub disputer: Address,
    pub opened_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionRecord {
    pub key: ConditionKey,
    pub game_id: GameId,
    pub reporter: Address,
    pub created_at: Timestamp,
    pub propose_deadline: Timestamp,
    /// Snapshot of the global dispute window at creation.
    pub dispute_window: Seconds,
    /// Snapshot of the global insurance amount at creation.
    pub insurance: TokenAmount,
    pub proposal: Option<Proposal>,
    pub dispute: Option<Dispute>,
    pub stage: Stage,
    /// Tokens escrowed for this record so far.
    pub escrowed: TokenAmount,
    /// Credits issued when the record settled. Empty until then.
    pub payouts: Vec<Payout>,
    pub settled_at: Option<Timestamp>,
}

impl ConditionRecord {
    pub fn new(
        key: ConditionKey,
        game_id: GameId,
        reporter: Address,
        now: Timestamp,
        propose_deadline: Timestamp,
        dispute_window: Seconds,
        insurance: TokenAmount,
    ) -> Self {
        Self {
            key,
            game_id,
            reporter,
            created_at: now,
            propose_deadline,
            dispute_window,
            insurance,
            proposal: None,
            dispute: None,
            stage: Stage::Created,
            escrowed: insurance,
            payouts: Vec::new(),
            settled_at: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.stage.is_terminal()
    }

    pub fn is_disputed(&self) -> bool {
        self.dispute.is_some()
    }

    pub fn disputer(&self) -> Option<&Address> {
        self.dispute.as_ref().map(|d| &d.disputer)
    }

    pub fn proposed_outcome(&self) -> Option<Outcome> {
        self.proposal.as_ref().map(|p| p.outcome)
    }

    /// Stake a disputer must escrow.
    pub fn dispute_stake(&self) -> TokenAmount {
        self.insurance.half()
    }

    /// The reporter may propose while `now <= propose_deadline`.
    pub fn can_propose_at(&self, now: Timestamp) -> bool {
        self.stage == Stage::Created && self.proposal.is_none() && now <= self.propose_deadline
    }

    /// End (exclusive) of the dispute window, once a proposal exists.
    pub fn dispute_window_end(&self) -> Option<Timestamp> {
        self.proposal
            .as_ref()
            .map(|p| p.proposed_at.saturating_add(self.dispute_window))
    }

    /// Time the decision period is measured from: the dispute open time when
    /// disputed, else the proposal time.
    pub fn decision_anchor(&self) -> Option<Timestamp> {
        match (&self.dispute, &self.proposal) {
            (Some(d), _) => Some(d.opened_at),
            (None, Some(p)) => Some(p.proposed_at),
            (None, None) => None,
        }
    }

    /// End (exclusive) of the window in which the proposal can be accepted or
    /// the DAO can decide. Timeout cancellation opens at this instant.
    pub fn decision_deadline(&self, decision_period: Seconds) -> Option<Timestamp> {
        self.decision_anchor().map(|anchor| {
            anchor
                .saturating_add(self.dispute_window)
                .saturating_add(decision_period)
        })
    }

    pub fn in_dispute_window(&self, now: Timestamp) -> bool {
        matches!(self.dispute_window_end(), Some(end) if now < end)
    }

    pub fn before_decision_deadline(&self, now: Timestamp, decision_period: Seconds) -> bool {
        matches!(self.decision_deadline(decision_period), Some(end) if now < end)
    }

    /// Total credited at settlement.
    pub fn paid_out(&self) -> TokenAmount {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}
