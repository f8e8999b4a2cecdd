// Per-Step Metric Trackers: global conservation and per-record settlement balance
// Checked after every step, including steps where every call was rejected

use arbiter_engine::audit::ConservationError;
use arbiter_engine::settlement::SettlementPath;
use arbiter_engine::*;
use rust_decimal::prelude::ToPrimitive;

use crate::report::PathCounts;

// ─── Conservation Tracker ───────────────────────────────────────────────────

/// Tracks `engine holdings == ledger total + outstanding escrow` per step and
/// `paid == escrowed` for every settled record.
pub struct ConservationTracker {
    pub steps: u64,
    pub violations: u32,
    pub settlement_imbalances: u32,
    pub max_abs_error: f64,
    pub first_violation: Option<String>,
}

impl ConservationTracker {
    pub fn new() -> Self {
        Self {
            steps: 0,
            violations: 0,
            settlement_imbalances: 0,
            max_abs_error: 0.0,
            first_violation: None,
        }
    }

    pub fn record_step(&mut self, engine: &InMemoryEngine) {
        self.steps += 1;

        if let Err(err) = engine.verify_conservation() {
            self.violations += 1;
            if let ConservationError::LedgerImbalance { held, owed } = &err {
                let abs = (held.0 - owed.0).abs().to_f64().unwrap_or(f64::INFINITY);
                self.max_abs_error = self.max_abs_error.max(abs);
            }
            if self.first_violation.is_none() {
                self.first_violation = Some(format!("step {}: {}", self.steps, err));
            }
        }

        self.settlement_imbalances = engine
            .conditions()
            .filter(|r| r.is_settled() && r.paid_out() != r.escrowed)
            .count() as u32;
    }

    pub fn holds(&self) -> bool {
        self.violations == 0 && self.settlement_imbalances == 0
    }
}

impl PathCounts {
    pub fn record(&mut self, path: SettlementPath) {
        match path {
            SettlementPath::Accepted => self.accepted += 1,
            SettlementPath::GovernanceResolved => self.governance_resolved += 1,
            SettlementPath::GovernanceCanceled => self.governance_canceled += 1,
            SettlementPath::DisputeRejected => self.dispute_rejected += 1,
            SettlementPath::TimedOut => self.timed_out += 1,
            SettlementPath::ExternallyCanceled => self.externally_canceled += 1,
        }
    }
}

pub fn to_f64(amount: TokenAmount) -> f64 {
    amount.0.to_f64().unwrap_or(0.0)
}
