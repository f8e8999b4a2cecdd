// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Condition lifecycle stages and the transition table between them.
//!
//! ```text
//! Created ──propose──▶ Proposed ──accept──▶ Accepted
//!                         │  └──timeout──▶ TimedOut
//!                       dispute
//!                         ▼
//!                      Disputed ──resolve──▶ GovernanceResolved
//!                                ──cancel───▶ GovernanceCanceled
//!                                ──approve──▶ DisputeRejected
//!                                ──timeout──▶ TimedOut
//!
//! any non-terminal ──external cancel──▶ ExternallyCanceled
//! ```
//!
//! The engine checks the business guards (deadlines, caller identity) and
//! reports their specific errors; the table is the last line that keeps
//! the record from ever taking an edge that is not drawn above.

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a condition record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Insurance escrowed, waiting for the reporter's proposal.
    Created,
    /// Outcome proposed, dispute window running.
    Proposed,
    /// Proposal challenged, waiting for the DAO.
    Disputed,
    /// TERMINAL: proposal applied after an unchallenged window.
    Accepted,
    /// TERMINAL: DAO overturned the proposal with another outcome.
    GovernanceResolved,
    /// TERMINAL: DAO upheld the dispute by cancelling the condition.
    GovernanceCanceled,
    /// TERMINAL: DAO rejected the dispute and applied the proposal.
    DisputeRejected,
    /// TERMINAL: nobody finalised within the decision period.
    TimedOut,
    /// TERMINAL: registry cancelled the condition on its own.
    ExternallyCanceled,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Accepted
                | Self::GovernanceResolved
                | Self::GovernanceCanceled
                | Self::DisputeRejected
                | Self::TimedOut
                | Self::ExternallyCanceled
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Created => "waiting for the reporter's proposal",
            Self::Proposed => "proposal open to dispute",
            Self::Disputed => "dispute awaiting governance decision",
            Self::Accepted => "proposal accepted",
            Self::GovernanceResolved => "governance applied a different outcome",
            Self::GovernanceCanceled => "governance cancelled the condition",
            Self::DisputeRejected => "governance rejected the dispute",
            Self::TimedOut => "decision period lapsed, condition cancelled",
            Self::ExternallyCanceled => "registry cancelled the condition",
        }
    }

    /// Apply `via` to this stage.
    pub fn next(self, via: Transition) -> Result<Stage, LifecycleError> {
        use Stage::*;
        use Transition as T;

        let to = match (self, via) {
            (Created, T::Propose) => Proposed,
            (Proposed, T::Dispute) => Disputed,
            (Proposed, T::Accept) => Accepted,
            (Proposed, T::Timeout) | (Disputed, T::Timeout) => TimedOut,
            (Disputed, T::GovernanceResolve) => GovernanceResolved,
            (Disputed, T::GovernanceCancel) => GovernanceCanceled,
            (Disputed, T::GovernanceApprove) => DisputeRejected,
            (from, T::ExternalCancel) if !from.is_terminal() => ExternallyCanceled,
            (from, via) => return Err(LifecycleError::IllegalTransition { from, via }),
        };
        Ok(to)
    }
}

/// Edge labels of the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    Propose,
    Dispute,
    Accept,
    GovernanceResolve,
    GovernanceCancel,
    GovernanceApprove,
    Timeout,
    ExternalCancel,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("illegal transition {via:?} from {from:?}")]
    IllegalTransition { from: Stage, via: Transition },
}
