// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Token transfer collaborator.
//!
//! The engine pulls escrow with [`TokenTransfer::transfer_from`] (bounded by
//! the payer's allowance) and pushes withdrawals with
//! [`TokenTransfer::transfer`]. [`InMemoryToken`] is the reference
//! implementation used by tests, the bench and the WASM harness.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Address, TokenAmount};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    #[error("transfer amount exceeds balance of {account} ({available} < {requested})")]
    InsufficientBalance {
        account: Address,
        available: TokenAmount,
        requested: TokenAmount,
    },

    #[error("transfer amount exceeds allowance of {owner} for {spender} ({allowed} < {requested})")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowed: TokenAmount,
        requested: TokenAmount,
    },

    #[error("invalid transfer amount {0}")]
    InvalidAmount(TokenAmount),

    #[error("balance of {account} would overflow receiving {amount}")]
    Overflow { account: Address, amount: TokenAmount },
}

/// Minimal pull/push token interface.
pub trait TokenTransfer {
    /// Move `amount` from `from` to `to`, spending `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), TransferError>;

    /// Move `amount` from `from` (the engine's own account) to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: TokenAmount) -> Result<(), TransferError>;

    /// Undo a `transfer_from(spender, owner, spender, amount)`: move the tokens
    /// back to `owner` and give the spent allowance back.
    fn reverse_transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        amount: TokenAmount,
    ) -> Result<(), TransferError>;

    fn balance_of(&self, account: &Address) -> TokenAmount;
}

// ---------------------------------------------------------------------------
// InMemoryToken
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryToken {
    balances: BTreeMap<Address, TokenAmount>,
    allowances: BTreeMap<(Address, Address), TokenAmount>,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create tokens out of thin air for `account`. Test and bench setup only.
    pub fn mint(&mut self, account: &Address, amount: TokenAmount) {
        *self.balances.entry(account.clone()).or_default() += amount;
    }

    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: TokenAmount) {
        self.allowances.insert((owner.clone(), spender.clone()), amount);
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or_default()
    }

    pub fn total_supply(&self) -> TokenAmount {
        self.balances.values().copied().sum()
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: TokenAmount) -> Result<(), TransferError> {
        if amount.is_negative() {
            return Err(TransferError::InvalidAmount(amount));
        }
        let available = self.balance_of(from);
        if amount > available {
            return Err(TransferError::InsufficientBalance {
                account: from.clone(),
                available,
                requested: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow { account: to.clone(), amount })?;
        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

impl TokenTransfer for InMemoryToken {
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<(), TransferError> {
        let allowed = self.allowance(from, spender);
        if amount > allowed {
            return Err(TransferError::InsufficientAllowance {
                owner: from.clone(),
                spender: spender.clone(),
                allowed,
                requested: amount,
            });
        }
        self.move_balance(from, to, amount)?;
        self.allowances
            .insert((from.clone(), spender.clone()), allowed - amount);
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: TokenAmount) -> Result<(), TransferError> {
        self.move_balance(from, to, amount)
    }

    fn reverse_transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        amount: TokenAmount,
    ) -> Result<(), TransferError> {
        let restored = self
            .allowance(owner, spender)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow { account: owner.clone(), amount })?;
        self.move_balance(spender, owner, amount)?;
        self.allowances.insert((owner.clone(), spender.clone()), restored);
        Ok(())
    }

    fn balance_of(&self, account: &Address) -> TokenAmount {
        self.balances.get(account).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let mut token = InMemoryToken::new();
        token.mint(&addr("alice"), TokenAmount::tokens(100));
        token.approve(&addr("alice"), &addr("engine"), TokenAmount::tokens(60));

        token
            .transfer_from(&addr("engine"), &addr("alice"), &addr("engine"), TokenAmount::tokens(40))
            .expect("test: within allowance");

        assert_eq!(token.balance_of(&addr("alice")), TokenAmount::tokens(60));
        assert_eq!(token.balance_of(&addr("engine")), TokenAmount::tokens(40));
        assert_eq!(token.allowance(&addr("alice"), &addr("engine")), TokenAmount::tokens(20));
    }

    #[test]
    fn transfer_from_beyond_allowance_fails() {
        let mut token = InMemoryToken::new();
        token.mint(&addr("alice"), TokenAmount::tokens(100));
        token.approve(&addr("alice"), &addr("engine"), TokenAmount::tokens(10));

        let err = token.transfer_from(&addr("engine"), &addr("alice"), &addr("engine"), TokenAmount::tokens(11));
        assert!(matches!(err, Err(TransferError::InsufficientAllowance { .. })), "got {err:?}");
        assert_eq!(token.balance_of(&addr("alice")), TokenAmount::tokens(100));
    }

    #[test]
    fn transfer_from_beyond_balance_keeps_allowance() {
        let mut token = InMemoryToken::new();
        token.mint(&addr("alice"), TokenAmount::tokens(5));
        token.approve(&addr("alice"), &addr("engine"), TokenAmount::tokens(50));

        let err = token.transfer_from(&addr("engine"), &addr("alice"), &addr("engine"), TokenAmount::tokens(6));
        assert!(matches!(err, Err(TransferError::InsufficientBalance { .. })), "got {err:?}");
        assert_eq!(token.allowance(&addr("alice"), &addr("engine")), TokenAmount::tokens(50));
    }

    #[test]
    fn push_transfer_conserves_supply() {
        let mut token = InMemoryToken::new();
        token.mint(&addr("engine"), TokenAmount::tokens(30));
        token
            .transfer(&addr("engine"), &addr("bob"), TokenAmount::tokens(30))
            .expect("test: full balance push");
        assert_eq!(token.total_supply(), TokenAmount::tokens(30));
        assert_eq!(token.balance_of(&addr("bob")), TokenAmount::tokens(30));
    }

    #[test]
    fn reversed_pull_restores_allowance() {
        let mut token = InMemoryToken::new();
        token.mint(&addr("alice"), TokenAmount::tokens(100));
        token.approve(&addr("alice"), &addr("engine"), TokenAmount::tokens(70));
        token
            .transfer_from(&addr("engine"), &addr("alice"), &addr("engine"), TokenAmount::tokens(70))
            .expect("test: within allowance");

        token
            .reverse_transfer_from(&addr("engine"), &addr("alice"), TokenAmount::tokens(70))
            .expect("test: reverse");

        assert_eq!(token.balance_of(&addr("alice")), TokenAmount::tokens(100));
        assert_eq!(token.balance_of(&addr("engine")), TokenAmount::zero());
        assert_eq!(token.allowance(&addr("alice"), &addr("engine")), TokenAmount::tokens(70));
    }

    #[test]
    fn overflowing_credit_leaves_both_balances() {
        let near_max = TokenAmount(rust_decimal::Decimal::MAX);
        let mut token = InMemoryToken::new();
        token.mint(&addr("engine"), near_max);
        token.mint(&addr("alice"), TokenAmount::tokens(1));
        token.approve(&addr("alice"), &addr("engine"), TokenAmount::tokens(1));

        let err = token.transfer_from(&addr("engine"), &addr("alice"), &addr("engine"), TokenAmount::tokens(1));
        assert!(matches!(err, Err(TransferError::Overflow { .. })), "got {err:?}");
        assert_eq!(token.balance_of(&addr("alice")), TokenAmount::tokens(1));
        assert_eq!(token.balance_of(&addr("engine")), near_max);
        assert_eq!(token.allowance(&addr("alice"), &addr("engine")), TokenAmount::tokens(1));
    }
}
