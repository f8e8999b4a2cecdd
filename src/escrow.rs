// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Insurance escrow collection.
//!
//! A stake is taken from the payer's ledger balance first; only the remainder
//! is pulled from the payer's external token balance. Collection is
//! all-or-nothing: if the pull fails, the ledger debit is rolled back.

use serde::{Deserialize, Serialize};

use crate::ledger::{Ledger, LedgerError};
use crate::token::{TokenTransfer, TransferError};
use crate::types::{Address, TokenAmount};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscrowError {
    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// How a collected stake was funded. Needed to undo a collection when a later
/// step of the same operation fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowReceipt {
    pub from_ledger: TokenAmount,
    pub pulled: TokenAmount,
}

impl EscrowReceipt {
    pub fn total(&self) -> TokenAmount {
        self.from_ledger + self.pulled
    }
}

/// Collects stakes into the engine's token account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceEscrow {
    engine_account: Address,
}

impl InsuranceEscrow {
    pub fn new(engine_account: Address) -> Self {
        Self { engine_account }
    }

    pub fn engine_account(&self) -> &Address {
        &self.engine_account
    }

    /// Take `amount` from `payer`, ledger balance first.
    pub fn collect<T: TokenTransfer + ?Sized>(
        &self,
        ledger: &mut Ledger,
        token: &mut T,
        payer: &Address,
        amount: TokenAmount,
    ) -> Result<EscrowReceipt, EscrowError> {
        let from_ledger = ledger.balance(payer).min(amount);
        let pulled = amount - from_ledger;

        if !from_ledger.is_zero() {
            ledger.debit(payer, from_ledger)?;
        }
        if !pulled.is_zero() {
            if let Err(err) = token.transfer_from(&self.engine_account, payer, &self.engine_account, pulled) {
                ledger.credit(payer, from_ledger);
                tracing::debug!(payer = %payer, %amount, error = %err, "escrow pull failed, ledger debit rolled back");
                return Err(err.into());
            }
        }

        tracing::debug!(payer = %payer, %from_ledger, %pulled, "escrow collected");
        Ok(EscrowReceipt { from_ledger, pulled })
    }

    /// Undo a collection made in the same operation.
    pub fn revert<T: TokenTransfer + ?Sized>(
        &self,
        ledger: &mut Ledger,
        token: &mut T,
        payer: &Address,
        receipt: EscrowReceipt,
    ) -> Result<(), EscrowError> {
        if !receipt.pulled.is_zero() {
            token.reverse_transfer_from(&self.engine_account, payer, receipt.pulled)?;
        }
        ledger.credit(payer, receipt.from_ledger);
        Ok(())
    }
}
