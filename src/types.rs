// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Primitive identifiers and the token denomination shared by every module.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Unix time in seconds.
pub type Timestamp = u64;

/// A span of time in seconds.
pub type Seconds = u64;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// An account or contract identity (oracle, disputer, DAO, registry, engine).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub String);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self { Address(s) }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self { Address(s.to_string()) }
}

// ---------------------------------------------------------------------------
// Condition / game identifiers and outcomes
// ---------------------------------------------------------------------------

/// Identifier of a condition inside one registry.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ConditionId(pub u64);

impl fmt::Display for ConditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of the game a condition belongs to.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct GameId(pub u64);

/// A registry-defined outcome of a condition.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Outcome(pub u64);

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "outcome:{}", self.0)
    }
}

/// Unique key of a condition record: (registry address, condition id).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ConditionKey {
    pub registry: Address,
    pub condition_id: ConditionId,
}

impl ConditionKey {
    pub fn new(registry: impl Into<Address>, condition_id: u64) -> Self {
        Self {
            registry: registry.into(),
            condition_id: ConditionId(condition_id),
        }
    }
}

impl fmt::Display for ConditionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.registry, self.condition_id)
    }
}

// ---------------------------------------------------------------------------
// TokenAmount
// ---------------------------------------------------------------------------

/// Token denomination backed by `rust_decimal::Decimal`.
///
/// Negative values never appear in balances; subtraction is only performed
/// after the caller has checked the minuend is large enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TokenAmount(pub Decimal);

impl TokenAmount {
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_decimal(d: Decimal) -> Self {
        Self(d)
    }

    /// Whole token units.
    pub fn tokens(n: u64) -> Self {
        Self(Decimal::from(n))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Exact half, used for the disputer stake and the DAO fee.
    pub fn half(&self) -> Self {
        Self(self.0 * dec!(0.5))
    }

    pub fn min(self, other: Self) -> Self {
        if self <= other { self } else { other }
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Insurance plus a disputer's half stake: the most a single record can
    /// ever hold. `None` when it does not fit the token range.
    pub fn with_half_stake(self) -> Option<Self> {
        self.checked_add(self.half())
    }
}

impl Add for TokenAmount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for TokenAmount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for TokenAmount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl std::iter::Sum for TokenAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Call context
// ---------------------------------------------------------------------------

/// Who is calling and at what time. Every timing guard in the engine is
/// evaluated lazily against `now`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: impl Into<Address>, now: Timestamp) -> Self {
        Self { caller: caller.into(), now }
    }
}
