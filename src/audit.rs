// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Conservation law for insurance escrow.
//!
//! ```text
//! escrowed(condition) = sum(credits issued when it settled)
//! engine token holdings = sum(ledger balances) + outstanding escrow
//! ```
//!
//! Every settlement is verified before its credits touch the ledger. An
//! imbalance trips a circuit breaker that refuses further settlements until
//! the DAO resets it after investigation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::settlement::SettlementPlan;
use crate::types::TokenAmount;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConservationError {
    #[error("circuit breaker tripped, settlements halted (cumulative error: {0})")]
    CircuitBreakerTripped(Decimal),

    #[error("settlement imbalance: escrowed {expected}, paid {actual}")]
    SettlementImbalance { expected: TokenAmount, actual: TokenAmount },

    #[error("ledger imbalance: engine holds {held}, owes {owed}")]
    LedgerImbalance { held: TokenAmount, owed: TokenAmount },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementAudit {
    cumulative_error: Decimal,
    circuit_breaker_threshold: Decimal,
    circuit_breaker_tripped: bool,
    settlements_verified: u64,
    total_escrowed: TokenAmount,
    total_credited: TokenAmount,
}

impl Default for SettlementAudit {
    fn default() -> Self {
        Self::new(Decimal::ZERO)
    }
}

impl SettlementAudit {
    /// `threshold` is the cumulative error tolerated before the breaker trips.
    /// Amounts are exact decimals, so the default is zero.
    pub fn new(threshold: Decimal) -> Self {
        Self {
            cumulative_error: Decimal::ZERO,
            circuit_breaker_threshold: threshold,
            circuit_breaker_tripped: false,
            settlements_verified: 0,
            total_escrowed: TokenAmount::zero(),
            total_credited: TokenAmount::zero(),
        }
    }

    /// Refuse work while the breaker is tripped.
    pub fn ensure_open(&self) -> Result<(), ConservationError> {
        if self.circuit_breaker_tripped {
            return Err(ConservationError::CircuitBreakerTripped(self.cumulative_error));
        }
        Ok(())
    }

    /// Verify `escrowed == paid` for one settlement plan.
    pub fn verify_settlement(&mut self, plan: &SettlementPlan) -> Result<(), ConservationError> {
        self.ensure_open()?;

        let expected = plan.escrowed;
        let actual = plan.total_paid();
        let error = (expected.0 - actual.0).abs();

        if !error.is_zero() {
            self.cumulative_error += error;
            if self.cumulative_error > self.circuit_breaker_threshold {
                self.circuit_breaker_tripped = true;
                tracing::error!(%expected, %actual, cumulative = %self.cumulative_error, "conservation breaker tripped");
                return Err(ConservationError::CircuitBreakerTripped(self.cumulative_error));
            }
            return Err(ConservationError::SettlementImbalance { expected, actual });
        }
        Ok(())
    }

    /// Count a verified settlement once its credits have been applied.
    pub fn record_settlement(&mut self, plan: &SettlementPlan) {
        self.settlements_verified += 1;
        self.total_credited = self.total_credited.saturating_add(plan.total_paid());
    }

    pub fn record_escrow(&mut self, amount: TokenAmount) {
        self.total_escrowed = self.total_escrowed.saturating_add(amount);
    }

    /// Verify the engine's token holdings cover exactly what it owes.
    pub fn verify_ledger(
        &self,
        held: TokenAmount,
        ledger_total: TokenAmount,
        outstanding_escrow: TokenAmount,
    ) -> Result<(), ConservationError> {
        let owed = ledger_total.saturating_add(outstanding_escrow);
        if held != owed {
            return Err(ConservationError::LedgerImbalance { held, owed });
        }
        Ok(())
    }

    pub fn is_circuit_breaker_tripped(&self) -> bool {
        self.circuit_breaker_tripped
    }

    /// Admin reset after investigation clears the breaker and error.
    pub fn reset_circuit_breaker(&mut self) {
        self.circuit_breaker_tripped = false;
        self.cumulative_error = Decimal::ZERO;
    }

    pub fn settlements_verified(&self) -> u64 {
        self.settlements_verified
    }

    pub fn total_escrowed(&self) -> TokenAmount {
        self.total_escrowed
    }

    pub fn total_credited(&self) -> TokenAmount {
        self.total_credited
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
