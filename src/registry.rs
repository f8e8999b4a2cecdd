// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Condition registry collaborator and the pool-factory lookup in front of it.
//!
//! The engine reports into a registry (the betting core that owns the
//! condition) and looks registries up through a [`RegistryHub`]. A hub that
//! does not recognise the registry address answers with
//! [`RegistryError::UnknownCore`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{Address, ConditionId, GameId, Outcome, Timestamp, TokenAmount};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("unknown core {0}")]
    UnknownCore(Address),

    #[error("condition {0} already exists")]
    ConditionAlreadyExists(ConditionId),

    #[error("condition {0} not found")]
    ConditionNotFound(ConditionId),

    #[error("{outcome} is not a valid outcome of condition {condition_id}")]
    IncorrectOutcome {
        condition_id: ConditionId,
        outcome: Outcome,
    },

    #[error("condition {condition_id} is {state:?}, expected Created")]
    ConditionNotActive {
        condition_id: ConditionId,
        state: ConditionState,
    },

    #[error("invalid condition parameters: {0}")]
    InvalidParams(&'static str),
}

// ---------------------------------------------------------------------------
// Registry-side condition view
// ---------------------------------------------------------------------------

/// Registry-side lifecycle of a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionState {
    Created,
    Resolved,
    Canceled,
}

/// Parameters forwarded verbatim to the registry on creation. The engine does
/// not interpret them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionParams {
    pub outcomes: Vec<Outcome>,
    pub odds: Vec<u64>,
    pub reinforcement: TokenAmount,
    pub margin: u64,
}

impl ConditionParams {
    /// Two-outcome condition with even odds.
    pub fn binary(a: u64, b: u64) -> Self {
        Self {
            outcomes: vec![Outcome(a), Outcome(b)],
            odds: vec![50, 50],
            reinforcement: TokenAmount::tokens(20_000),
            margin: 0,
        }
    }
}

/// What the registry reports about one of its conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCondition {
    pub game_id: GameId,
    pub outcomes: Vec<Outcome>,
    pub state: ConditionState,
    pub outcome_win: Option<Outcome>,
    /// When the condition left `Created`, if it has.
    pub settled_at: Option<Timestamp>,
}

impl RegistryCondition {
    pub fn is_canceled(&self) -> bool {
        self.state == ConditionState::Canceled
    }

    /// Cancellation time, if the condition was cancelled.
    pub fn canceled_at(&self) -> Option<Timestamp> {
        if self.is_canceled() { self.settled_at } else { None }
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The betting core that owns conditions.
pub trait ConditionRegistry {
    fn create_condition(
        &mut self,
        game_id: GameId,
        condition_id: ConditionId,
        params: &ConditionParams,
        now: Timestamp,
    ) -> Result<(), RegistryError>;

    /// Fails with [`RegistryError::IncorrectOutcome`] if `outcome` is not one
    /// of the condition's outcomes.
    fn resolve_condition(
        &mut self,
        condition_id: ConditionId,
        outcome: Outcome,
        now: Timestamp,
    ) -> Result<(), RegistryError>;

    fn cancel_condition(&mut self, condition_id: ConditionId, now: Timestamp) -> Result<(), RegistryError>;

    fn condition(&self, condition_id: ConditionId) -> Option<RegistryCondition>;
}

/// Pool-factory lookup of registries by address.
pub trait RegistryHub {
    fn registry(&self, address: &Address) -> Result<&dyn ConditionRegistry, RegistryError>;

    fn registry_mut(&mut self, address: &Address) -> Result<&mut dyn ConditionRegistry, RegistryError>;
}

// ---------------------------------------------------------------------------
// InMemoryRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryRegistry {
    conditions: BTreeMap<ConditionId, RegistryCondition>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn active_mut(&mut self, condition_id: ConditionId) -> Result<&mut RegistryCondition, RegistryError> {
        let condition = self
            .conditions
            .get_mut(&condition_id)
            .ok_or(RegistryError::ConditionNotFound(condition_id))?;
        if condition.state != ConditionState::Created {
            return Err(RegistryError::ConditionNotActive {
                condition_id,
                state: condition.state,
            });
        }
        Ok(condition)
    }
}

fn validate_params(params: &ConditionParams) -> Result<(), RegistryError> {
    if params.outcomes.len() < 2 {
        return Err(RegistryError::InvalidParams("at least two outcomes required"));
    }
    if params.odds.len() != params.outcomes.len() {
        return Err(RegistryError::InvalidParams("one odds entry per outcome required"));
    }
    if params.odds.iter().any(|o| *o == 0) {
        return Err(RegistryError::InvalidParams("odds must be non-zero"));
    }
    for (i, outcome) in params.outcomes.iter().enumerate() {
        if params.outcomes[i + 1..].contains(outcome) {
            return Err(RegistryError::InvalidParams("outcomes must be distinct"));
        }
    }
    Ok(())
}

impl ConditionRegistry for InMemoryRegistry {
    fn create_condition(
        &mut self,
        game_id: GameId,
        condition_id: ConditionId,
        params: &ConditionParams,
        _now: Timestamp,
    ) -> Result<(), RegistryError> {
        if self.conditions.contains_key(&condition_id) {
            return Err(RegistryError::ConditionAlreadyExists(condition_id));
        }
        validate_params(params)?;
        self.conditions.insert(
            condition_id,
            RegistryCondition {
                game_id,
                outcomes: params.outcomes.clone(),
                state: ConditionState::Created,
                outcome_win: None,
                settled_at: None,
            },
        );
        Ok(())
    }

    fn resolve_condition(
        &mut self,
        condition_id: ConditionId,
        outcome: Outcome,
        now: Timestamp,
    ) -> Result<(), RegistryError> {
        let condition = self.active_mut(condition_id)?;
        if !condition.outcomes.contains(&outcome) {
            return Err(RegistryError::IncorrectOutcome { condition_id, outcome });
        }
        condition.state = ConditionState::Resolved;
        condition.outcome_win = Some(outcome);
        condition.settled_at = Some(now);
        Ok(())
    }

    fn cancel_condition(&mut self, condition_id: ConditionId, now: Timestamp) -> Result<(), RegistryError> {
        let condition = self.active_mut(condition_id)?;
        condition.state = ConditionState::Canceled;
        condition.settled_at = Some(now);
        Ok(())
    }

    fn condition(&self, condition_id: ConditionId) -> Option<RegistryCondition> {
        self.conditions.get(&condition_id).cloned()
    }
}

// ---------------------------------------------------------------------------
// PoolFactory
// ---------------------------------------------------------------------------

/// Registry hub that only knows the cores it has deployed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolFactory {
    cores: BTreeMap<Address, InMemoryRegistry>,
}

impl PoolFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh, empty core under `address`.
    pub fn deploy_core(&mut self, address: impl Into<Address>) -> &mut InMemoryRegistry {
        self.cores.entry(address.into()).or_default()
    }

    /// Direct access to a core, bypassing the engine. Models the core's own
    /// maintainers acting on it (e.g. cancelling a washed-out game).
    pub fn core_mut(&mut self, address: &Address) -> Option<&mut InMemoryRegistry> {
        self.cores.get_mut(address)
    }

    pub fn core(&self, address: &Address) -> Option<&InMemoryRegistry> {
        self.cores.get(address)
    }
}

impl RegistryHub for PoolFactory {
    fn registry(&self, address: &Address) -> Result<&dyn ConditionRegistry, RegistryError> {
        match self.cores.get(address) {
            Some(core) => Ok(core),
            None => Err(RegistryError::UnknownCore(address.clone())),
        }
    }

    fn registry_mut(&mut self, address: &Address) -> Result<&mut dyn ConditionRegistry, RegistryError> {
        match self.cores.get_mut(address) {
            Some(core) => Ok(core),
            None => Err(RegistryError::UnknownCore(address.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> InMemoryRegistry {
        let mut registry = InMemoryRegistry::new();
        registry
            .create_condition(GameId(1), ConditionId(7), &ConditionParams::binary(1, 2), 10)
            .expect("test: create condition");
        registry
    }

    #[test]
    fn duplicate_creation_rejected() {
        let mut registry = created();
        let err = registry.create_condition(GameId(1), ConditionId(7), &ConditionParams::binary(1, 2), 11);
        assert_eq!(err, Err(RegistryError::ConditionAlreadyExists(ConditionId(7))));
    }

    #[test]
    fn resolve_with_unknown_outcome_rejected() {
        let mut registry = created();
        let err = registry.resolve_condition(ConditionId(7), Outcome(3), 20);
        assert!(matches!(err, Err(RegistryError::IncorrectOutcome { .. })), "got {err:?}");
        let view = registry.condition(ConditionId(7)).expect("test: condition exists");
        assert_eq!(view.state, ConditionState::Created);
    }

    #[test]
    fn cancel_records_time() {
        let mut registry = created();
        registry.cancel_condition(ConditionId(7), 30).expect("test: cancel");
        let view = registry.condition(ConditionId(7)).expect("test: condition exists");
        assert!(view.is_canceled());
        assert_eq!(view.canceled_at(), Some(30));
    }

    #[test]
    fn resolved_condition_cannot_be_canceled() {
        let mut registry = created();
        registry.resolve_condition(ConditionId(7), Outcome(2), 20).expect("test: resolve");
        let err = registry.cancel_condition(ConditionId(7), 21);
        assert!(matches!(err, Err(RegistryError::ConditionNotActive { .. })), "got {err:?}");
        assert_eq!(
            registry.condition(ConditionId(7)).and_then(|c| c.canceled_at()),
            None
        );
    }

    #[test]
    fn invalid_params_rejected() {
        let mut registry = InMemoryRegistry::new();
        let mut params = ConditionParams::binary(1, 1);
        let err = registry.create_condition(GameId(1), ConditionId(1), &params, 0);
        assert!(matches!(err, Err(RegistryError::InvalidParams(_))));

        params = ConditionParams::binary(1, 2);
        params.odds.pop();
        let err = registry.create_condition(GameId(1), ConditionId(1), &params, 0);
        assert!(matches!(err, Err(RegistryError::InvalidParams(_))));
    }

    #[test]
    fn factory_rejects_unknown_core() {
        let mut factory = PoolFactory::new();
        factory.deploy_core("core-a");
        assert!(factory.registry(&Address::from("core-a")).is_ok());
        let err = factory.registry_mut(&Address::from("core-b")).err();
        assert_eq!(err, Some(RegistryError::UnknownCore(Address::from("core-b"))));
    }
}
