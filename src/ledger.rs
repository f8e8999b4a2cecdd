// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Withdrawable balances owed by the engine.
//!
//! Balances grow only through settlement credits and shrink only through an
//! explicit withdrawal or when escrow collection consumes them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Address, TokenAmount};

/// Errors raised by ledger debits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("insufficient balance: {account} holds {available}, requested {requested}")]
    InsufficientBalance {
        account: Address,
        available: TokenAmount,
        requested: TokenAmount,
    },

    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(TokenAmount),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    balances: BTreeMap<Address, TokenAmount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &Address) -> TokenAmount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Credit `amount` to `account`. Zero credits are ignored so that the
    /// account map only contains parties that were ever paid. Balances stay
    /// below the engine's token holdings, whose transfers are range-checked.
    pub fn credit(&mut self, account: &Address, amount: TokenAmount) {
        if amount.is_zero() {
            return;
        }
        *self.balances.entry(account.clone()).or_default() += amount;
    }

    /// Remove `amount` from `account`.
    pub fn debit(&mut self, account: &Address, amount: TokenAmount) -> Result<(), LedgerError> {
        if amount.is_zero() || amount.is_negative() {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        let available = self.balance(account);
        if amount > available {
            return Err(LedgerError::InsufficientBalance {
                account: account.clone(),
                available,
                requested: amount,
            });
        }
        let remaining = available - amount;
        if remaining.is_zero() {
            self.balances.remove(account);
        } else {
            self.balances.insert(account.clone(), remaining);
        }
        Ok(())
    }

    /// Sum of every balance; used by the conservation audit.
    pub fn total(&self) -> TokenAmount {
        self.balances.values().copied().sum()
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &TokenAmount)> {
        self.balances.iter()
    }
}
