// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! The insurance-backed dispute engine.
//!
//! Every public operation follows the same shape: all guards are evaluated
//! first against the caller-supplied [`CallContext`], then at most one
//! registry mutation is made, and only after it succeeds are records, ledger
//! and journal updated. A failing operation therefore leaves no trace, with
//! one documented exception: [`Engine::accept_proposal`] absorbs a registry
//! refusal of the proposed outcome and reports [`Acceptance::Deferred`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::access::{AccessControl, RoleRegistry};
use crate::audit::{ConservationError, SettlementAudit};
use crate::condition::{ConditionRecord, Dispute, Proposal};
use crate::config::{ConfigError, EngineConfig};
use crate::escrow::{EscrowError, InsuranceEscrow};
use crate::events::{EngineEvent, EventJournal};
use crate::governance::{GovernanceError, GovernanceGate, GovernanceParams};
use crate::ledger::{Ledger, LedgerError};
use crate::lifecycle::{LifecycleError, Stage, Transition};
use crate::registry::{ConditionParams, PoolFactory, RegistryCondition, RegistryError, RegistryHub};
use crate::settlement::{self, SettlementError, SettlementPath, SettlementPlan};
use crate::token::{InMemoryToken, TokenTransfer, TransferError};
use crate::types::{Address, CallContext, ConditionId, ConditionKey, GameId, Outcome, Seconds, Timestamp, TokenAmount};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("propose deadline must be in the future")]
    IncorrectProposeDeadline,

    #[error("condition {0} already created")]
    ConditionAlreadyCreated(ConditionKey),

    #[error("condition {0} not found")]
    ConditionNotFound(ConditionKey),

    #[error("caller {0} is not the oracle of this condition")]
    OnlyOracle(Address),

    #[error("caller {0} is not the DAO")]
    OnlyDao(Address),

    #[error("proposal already made or propose deadline passed")]
    CantPropose,

    #[error("dispute not allowed")]
    DisputeNotAllowed,

    #[error("condition {0} is canceled on its registry")]
    ConditionCanceled(ConditionKey),

    #[error("proposal cannot be accepted now")]
    CantAcceptSolution,

    #[error("condition cannot be resolved by governance now")]
    CantResolve,

    #[error("outcome is the same as proposed")]
    SameSolutionAsProposed,

    #[error("registry rejected {0} as a solution")]
    IncorrectSolution(Outcome),

    #[error("condition {0} is not canceled on its registry")]
    ConditionNotCanceled(ConditionKey),

    #[error("condition {0} is already resolved")]
    ConditionAlreadyResolved(ConditionKey),

    #[error("condition cannot be timed out now")]
    CantCancel,

    #[error("insufficient balance: {available} available, {requested} requested")]
    InsufficientBalance {
        available: TokenAmount,
        requested: TokenAmount,
    },

    #[error("invalid amount {0}")]
    InvalidAmount(TokenAmount),

    #[error("amount {0} overflows the token range")]
    AmountOverflow(TokenAmount),

    #[error("dispute period must be positive")]
    IncorrectDisputePeriod,

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("conservation check failed: {0}")]
    Conservation(#[from] ConservationError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

impl From<GovernanceError> for EngineError {
    fn from(err: GovernanceError) -> Self {
        match err {
            GovernanceError::OnlyDao(caller) => EngineError::OnlyDao(caller),
            GovernanceError::IncorrectDisputePeriod => EngineError::IncorrectDisputePeriod,
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance { available, requested, .. } => {
                EngineError::InsufficientBalance { available, requested }
            }
            LedgerError::NonPositiveAmount(amount) => EngineError::InvalidAmount(amount),
        }
    }
}

impl From<EscrowError> for EngineError {
    fn from(err: EscrowError) -> Self {
        match err {
            EscrowError::Transfer(e) => e.into(),
            EscrowError::Ledger(e) => e.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Result of [`Engine::accept_proposal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
    /// The proposal was applied and the reporter credited.
    Accepted(SettlementPlan),
    /// The registry refused the proposed outcome. Nothing changed; the record
    /// stays open and ends through timeout cancellation unless the registry
    /// later accepts the outcome within the decision window.
    Deferred { reason: RegistryError },
}

/// Result of the caller-dispatched [`Engine::propose`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Proposed,
    Resolved(SettlementPlan),
}

/// Serialisable copy of the engine's own state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub dao: Address,
    pub params: GovernanceParams,
    pub decision_period: Seconds,
    pub ledger: Ledger,
    pub conditions: Vec<ConditionRecord>,
    pub outstanding_escrow: TokenAmount,
}

/// Registry mutation performed by a settlement.
#[derive(Debug, Clone, Copy)]
enum RegistryEffect {
    Resolve(Outcome),
    Cancel,
    None,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine<H, T, A> {
    hub: H,
    token: T,
    access: A,
    governance: GovernanceGate,
    escrow: InsuranceEscrow,
    ledger: Ledger,
    conditions: BTreeMap<ConditionKey, ConditionRecord>,
    audit: SettlementAudit,
    journal: EventJournal,
}

/// Engine wired to the in-memory collaborators.
pub type InMemoryEngine = Engine<PoolFactory, InMemoryToken, RoleRegistry>;

impl InMemoryEngine {
    pub fn in_memory(config: &EngineConfig) -> Result<Self, ConfigError> {
        Engine::new(
            config,
            PoolFactory::new(),
            InMemoryToken::new(),
            RoleRegistry::new(config.dao.clone()),
        )
    }
}

impl<H, T, A> Engine<H, T, A>
where
    H: RegistryHub,
    T: TokenTransfer,
    A: AccessControl,
{
    pub fn new(config: &EngineConfig, hub: H, token: T, access: A) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::info!(
            dao = %config.dao,
            dispute_window = config.dispute_window,
            decision_period = config.decision_period,
            insurance = %config.insurance,
            "dispute engine initialised"
        );
        Ok(Self {
            hub,
            token,
            access,
            governance: GovernanceGate::new(config.dao.clone(), config.governance_params(), config.decision_period),
            escrow: InsuranceEscrow::new(config.engine_account.clone()),
            ledger: Ledger::new(),
            conditions: BTreeMap::new(),
            audit: SettlementAudit::new(config.audit_threshold),
            journal: EventJournal::default(),
        })
    }

    // ── Creation ────────────────────────────────────────────────────────────

    /// Create a condition on `registry` with the caller as reporter, escrowing
    /// the current insurance amount from the caller.
    pub fn create_condition(
        &mut self,
        ctx: &CallContext,
        registry: &Address,
        game_id: GameId,
        condition_id: ConditionId,
        params: &ConditionParams,
        propose_deadline: Timestamp,
    ) -> Result<ConditionKey, EngineError> {
        if !self.access.is_oracle(&ctx.caller) {
            return Err(EngineError::OnlyOracle(ctx.caller.clone()));
        }
        if propose_deadline <= ctx.now {
            return Err(EngineError::IncorrectProposeDeadline);
        }
        let key = ConditionKey {
            registry: registry.clone(),
            condition_id,
        };
        if self.conditions.contains_key(&key) {
            return Err(EngineError::ConditionAlreadyCreated(key));
        }
        if self.hub.registry(registry)?.condition(condition_id).is_some() {
            return Err(EngineError::ConditionAlreadyCreated(key));
        }
        self.audit.ensure_open()?;

        let GovernanceParams { dispute_window, insurance } = self.governance.params().clone();
        let receipt = self
            .escrow
            .collect(&mut self.ledger, &mut self.token, &ctx.caller, insurance)?;

        let created = self
            .hub
            .registry_mut(registry)
            .and_then(|core| core.create_condition(game_id, condition_id, params, ctx.now));
        if let Err(err) = created {
            self.escrow
                .revert(&mut self.ledger, &mut self.token, &ctx.caller, receipt)?;
            tracing::warn!(condition = %key, error = %err, "registry refused condition, escrow reverted");
            return Err(err.into());
        }

        self.audit.record_escrow(insurance);
        self.conditions.insert(
            key.clone(),
            ConditionRecord::new(
                key.clone(),
                game_id,
                ctx.caller.clone(),
                ctx.now,
                propose_deadline,
                dispute_window,
                insurance,
            ),
        );
        self.journal.push(EngineEvent::ConditionCreated {
            key: key.clone(),
            reporter: ctx.caller.clone(),
            propose_deadline,
            insurance,
        });
        tracing::info!(
            condition = %key,
            reporter = %ctx.caller,
            %insurance,
            dispute_window,
            propose_deadline,
            "condition created"
        );
        Ok(key)
    }

    // ── Proposal ────────────────────────────────────────────────────────────

    /// Caller-dispatched proposal: the reporter proposes, the DAO resolves a
    /// dispute, anyone else is refused with `OnlyOracle`.
    pub fn propose(
        &mut self,
        ctx: &CallContext,
        key: &ConditionKey,
        outcome: Outcome,
    ) -> Result<Submission, EngineError> {
        let reporter = self.record(key)?.reporter.clone();
        if ctx.caller == reporter {
            self.oracle_propose(ctx, key, outcome)?;
            Ok(Submission::Proposed)
        } else if self.governance.is_dao(&ctx.caller) {
            self.governance_resolve(ctx, key, outcome).map(Submission::Resolved)
        } else {
            Err(EngineError::OnlyOracle(ctx.caller.clone()))
        }
    }

    /// The reporter's outcome proposal.
    pub fn oracle_propose(&mut self, ctx: &CallContext, key: &ConditionKey, outcome: Outcome) -> Result<(), EngineError> {
        let record = self.record(key)?;
        if ctx.caller != record.reporter {
            return Err(EngineError::OnlyOracle(ctx.caller.clone()));
        }
        self.ensure_not_canceled(key)?;
        let record = self.record(key)?;
        if !record.can_propose_at(ctx.now) {
            return Err(EngineError::CantPropose);
        }
        let stage = record.stage.next(Transition::Propose)?;

        let record = self.record_mut(key)?;
        record.proposal = Some(Proposal {
            outcome,
            proposed_at: ctx.now,
        });
        record.stage = stage;

        self.journal.push(EngineEvent::OutcomeProposed {
            key: key.clone(),
            outcome,
            at: ctx.now,
        });
        tracing::info!(condition = %key, %outcome, "outcome proposed");
        Ok(())
    }

    // ── Dispute ─────────────────────────────────────────────────────────────

    /// Challenge the proposal, escrowing half the record's insurance.
    pub fn dispute(&mut self, ctx: &CallContext, key: &ConditionKey) -> Result<(), EngineError> {
        self.record(key)?;
        self.ensure_not_canceled(key)?;
        let record = self.record(key)?;
        if record.stage != Stage::Proposed || record.is_disputed() || !record.in_dispute_window(ctx.now) {
            return Err(EngineError::DisputeNotAllowed);
        }
        let stage = record.stage.next(Transition::Dispute)?;
        let stake = record.dispute_stake();
        let escrowed = record
            .escrowed
            .checked_add(stake)
            .ok_or(EngineError::AmountOverflow(stake))?;
        self.audit.ensure_open()?;

        self.escrow
            .collect(&mut self.ledger, &mut self.token, &ctx.caller, stake)?;
        self.audit.record_escrow(stake);

        let record = self.record_mut(key)?;
        record.dispute = Some(Dispute {
            disputer: ctx.caller.clone(),
            opened_at: ctx.now,
        });
        record.escrowed = escrowed;
        record.stage = stage;

        self.journal.push(EngineEvent::ConditionDisputed {
            key: key.clone(),
            disputer: ctx.caller.clone(),
            stake,
            at: ctx.now,
        });
        tracing::info!(condition = %key, disputer = %ctx.caller, %stake, "proposal disputed");
        Ok(())
    }

    // ── Settlement paths ────────────────────────────────────────────────────

    /// Apply an unchallenged proposal once its dispute window has elapsed.
    ///
    /// If the registry refuses the proposed outcome the call is absorbed:
    /// nothing changes and [`Acceptance::Deferred`] is returned. Callers must
    /// inspect the result rather than rely on an error.
    pub fn accept_proposal(&mut self, ctx: &CallContext, key: &ConditionKey) -> Result<Acceptance, EngineError> {
        self.ensure_open_record(key)?;
        self.ensure_not_canceled(key)?;
        let decision_period = self.governance.decision_period();
        let record = self.record(key)?;

        let window_over = matches!(record.dispute_window_end(), Some(end) if ctx.now >= end);
        if record.stage != Stage::Proposed
            || !window_over
            || !record.before_decision_deadline(ctx.now, decision_period)
        {
            return Err(EngineError::CantAcceptSolution);
        }
        let outcome = record.proposed_outcome().ok_or(EngineError::CantAcceptSolution)?;
        let plan = settlement::plan_acceptance(record);

        match self.settle(ctx, key, Transition::Accept, plan, RegistryEffect::Resolve(outcome)) {
            Ok(plan) => Ok(Acceptance::Accepted(plan)),
            Err(EngineError::Registry(reason @ RegistryError::IncorrectOutcome { .. })) => {
                tracing::warn!(condition = %key, %outcome, error = %reason, "registry refused proposed outcome, acceptance deferred");
                self.journal.push(EngineEvent::AcceptanceDeferred {
                    key: key.clone(),
                    outcome,
                    reason: reason.to_string(),
                });
                Ok(Acceptance::Deferred { reason })
            }
            Err(err) => Err(err),
        }
    }

    /// DAO overturns a disputed proposal with a different outcome.
    pub fn governance_resolve(
        &mut self,
        ctx: &CallContext,
        key: &ConditionKey,
        outcome: Outcome,
    ) -> Result<SettlementPlan, EngineError> {
        let record = self.ensure_decidable(ctx, key)?;
        if record.proposed_outcome() == Some(outcome) {
            return Err(EngineError::SameSolutionAsProposed);
        }
        let plan = settlement::plan_governance(record, self.governance.dao(), SettlementPath::GovernanceResolved)?;
        self.settle(ctx, key, Transition::GovernanceResolve, plan, RegistryEffect::Resolve(outcome))
            .map_err(incorrect_solution)
    }

    /// DAO upholds a dispute by cancelling the condition.
    pub fn governance_cancel(&mut self, ctx: &CallContext, key: &ConditionKey) -> Result<SettlementPlan, EngineError> {
        let record = self.ensure_decidable(ctx, key)?;
        let plan = settlement::plan_governance(record, self.governance.dao(), SettlementPath::GovernanceCanceled)?;
        self.settle(ctx, key, Transition::GovernanceCancel, plan, RegistryEffect::Cancel)
    }

    /// DAO rejects a dispute and applies the original proposal.
    pub fn governance_approve(&mut self, ctx: &CallContext, key: &ConditionKey) -> Result<SettlementPlan, EngineError> {
        let record = self.ensure_decidable(ctx, key)?;
        let outcome = record.proposed_outcome().ok_or(EngineError::CantResolve)?;
        let plan = settlement::plan_governance(record, self.governance.dao(), SettlementPath::DisputeRejected)?;
        self.settle(ctx, key, Transition::GovernanceApprove, plan, RegistryEffect::Resolve(outcome))
            .map_err(incorrect_solution)
    }

    /// Cancel a proposed or disputed condition nobody finalised in time,
    /// refunding every stake.
    pub fn timeout_cancel(&mut self, ctx: &CallContext, key: &ConditionKey) -> Result<SettlementPlan, EngineError> {
        self.ensure_open_record(key)?;
        self.ensure_not_canceled(key)?;
        let record = self.record(key)?;
        match record.decision_deadline(self.governance.decision_period()) {
            Some(deadline) if ctx.now >= deadline => {}
            _ => return Err(EngineError::CantCancel),
        }
        let plan = settlement::plan_timeout(record);
        self.settle(ctx, key, Transition::Timeout, plan, RegistryEffect::Cancel)
    }

    /// Reconcile escrow for a condition the registry cancelled on its own.
    pub fn handle_external_cancellation(
        &mut self,
        ctx: &CallContext,
        key: &ConditionKey,
    ) -> Result<SettlementPlan, EngineError> {
        self.ensure_open_record(key)?;
        let view = self.registry_condition(key)?;
        if !view.is_canceled() {
            return Err(EngineError::ConditionNotCanceled(key.clone()));
        }
        let canceled_at = view.canceled_at().unwrap_or(ctx.now);
        let record = self.record(key)?;
        let plan = settlement::plan_external_cancellation(record, self.governance.dao(), canceled_at);
        self.settle(ctx, key, Transition::ExternalCancel, plan, RegistryEffect::None)
    }

    // ── Withdrawal ──────────────────────────────────────────────────────────

    pub fn withdraw(&mut self, ctx: &CallContext, amount: TokenAmount) -> Result<(), EngineError> {
        if amount.is_zero() || amount.is_negative() {
            return Err(EngineError::InvalidAmount(amount));
        }
        let available = self.ledger.balance(&ctx.caller);
        if amount > available {
            return Err(EngineError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        self.token
            .transfer(self.escrow.engine_account(), &ctx.caller, amount)?;
        self.ledger.debit(&ctx.caller, amount)?;

        self.journal.push(EngineEvent::Withdrawn {
            account: ctx.caller.clone(),
            amount,
        });
        tracing::info!(account = %ctx.caller, %amount, "withdrawn");
        Ok(())
    }

    // ── Governance parameters ───────────────────────────────────────────────

    pub fn change_dispute_period(&mut self, ctx: &CallContext, period: Seconds) -> Result<(), EngineError> {
        self.governance.change_dispute_period(&ctx.caller, period)?;
        self.journal.push(EngineEvent::DisputePeriodChanged { period });
        tracing::info!(period, "dispute period changed");
        Ok(())
    }

    pub fn change_insurance(&mut self, ctx: &CallContext, amount: TokenAmount) -> Result<(), EngineError> {
        self.governance.ensure_dao(&ctx.caller)?;
        if amount.is_negative() || amount.with_half_stake().is_none() {
            return Err(EngineError::InvalidAmount(amount));
        }
        self.governance.change_insurance(&ctx.caller, amount)?;
        self.journal.push(EngineEvent::InsuranceChanged { amount });
        tracing::info!(%amount, "insurance changed");
        Ok(())
    }

    pub fn transfer_ownership(&mut self, ctx: &CallContext, new_dao: Address) -> Result<(), EngineError> {
        let previous = self.governance.transfer_ownership(&ctx.caller, new_dao.clone())?;
        tracing::info!(previous = %previous, new = %new_dao, "ownership transferred");
        self.journal.push(EngineEvent::OwnershipTransferred {
            previous,
            new: new_dao,
        });
        Ok(())
    }

    /// Clear a tripped conservation breaker after investigation.
    pub fn reset_audit(&mut self, ctx: &CallContext) -> Result<(), EngineError> {
        self.governance.ensure_dao(&ctx.caller)?;
        self.audit.reset_circuit_breaker();
        tracing::warn!(dao = %ctx.caller, "conservation breaker reset");
        Ok(())
    }

    // ── Views ───────────────────────────────────────────────────────────────

    pub fn condition(&self, key: &ConditionKey) -> Option<&ConditionRecord> {
        self.conditions.get(key)
    }

    pub fn conditions(&self) -> impl Iterator<Item = &ConditionRecord> {
        self.conditions.values()
    }

    pub fn balance(&self, account: &Address) -> TokenAmount {
        self.ledger.balance(account)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn params(&self) -> &GovernanceParams {
        self.governance.params()
    }

    pub fn dao(&self) -> &Address {
        self.governance.dao()
    }

    pub fn decision_period(&self) -> Seconds {
        self.governance.decision_period()
    }

    pub fn engine_account(&self) -> &Address {
        self.escrow.engine_account()
    }

    /// Escrow held for records that have not settled yet.
    pub fn outstanding_escrow(&self) -> TokenAmount {
        self.conditions
            .values()
            .filter(|r| !r.is_settled())
            .map(|r| r.escrowed)
            .sum()
    }

    /// Check that the engine's token holdings equal ledger balances plus
    /// outstanding escrow.
    pub fn verify_conservation(&self) -> Result<(), ConservationError> {
        self.audit.verify_ledger(
            self.token.balance_of(self.escrow.engine_account()),
            self.ledger.total(),
            self.outstanding_escrow(),
        )
    }

    pub fn audit(&self) -> &SettlementAudit {
        &self.audit
    }

    pub fn events(&self) -> &EventJournal {
        &self.journal
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        self.journal.drain()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            dao: self.governance.dao().clone(),
            params: self.governance.params().clone(),
            decision_period: self.governance.decision_period(),
            ledger: self.ledger.clone(),
            conditions: self.conditions.values().cloned().collect(),
            outstanding_escrow: self.outstanding_escrow(),
        }
    }

    pub fn hub(&self) -> &H {
        &self.hub
    }

    /// Direct access to the registries, for actors that operate on them
    /// without going through the engine.
    pub fn hub_mut(&mut self) -> &mut H {
        &mut self.hub
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn access(&self) -> &A {
        &self.access
    }

    pub fn access_mut(&mut self) -> &mut A {
        &mut self.access
    }

    // ── Internals ───────────────────────────────────────────────────────────

    fn record(&self, key: &ConditionKey) -> Result<&ConditionRecord, EngineError> {
        self.conditions
            .get(key)
            .ok_or_else(|| EngineError::ConditionNotFound(key.clone()))
    }

    fn record_mut(&mut self, key: &ConditionKey) -> Result<&mut ConditionRecord, EngineError> {
        self.conditions
            .get_mut(key)
            .ok_or_else(|| EngineError::ConditionNotFound(key.clone()))
    }

    fn registry_condition(&self, key: &ConditionKey) -> Result<RegistryCondition, EngineError> {
        self.hub
            .registry(&key.registry)?
            .condition(key.condition_id)
            .ok_or_else(|| RegistryError::ConditionNotFound(key.condition_id).into())
    }

    fn ensure_not_canceled(&self, key: &ConditionKey) -> Result<(), EngineError> {
        if self.registry_condition(key)?.is_canceled() {
            return Err(EngineError::ConditionCanceled(key.clone()));
        }
        Ok(())
    }

    fn ensure_open_record(&self, key: &ConditionKey) -> Result<(), EngineError> {
        if self.record(key)?.is_settled() {
            return Err(EngineError::ConditionAlreadyResolved(key.clone()));
        }
        Ok(())
    }

    /// Guards shared by the three DAO decisions.
    fn ensure_decidable(&self, ctx: &CallContext, key: &ConditionKey) -> Result<&ConditionRecord, EngineError> {
        self.governance.ensure_dao(&ctx.caller)?;
        self.ensure_open_record(key)?;
        self.ensure_not_canceled(key)?;
        let record = self.record(key)?;
        if record.stage != Stage::Disputed
            || !record.before_decision_deadline(ctx.now, self.governance.decision_period())
        {
            return Err(EngineError::CantResolve);
        }
        Ok(record)
    }

    /// Common terminal transition: verify the plan, apply the registry
    /// effect, then credit the ledger and close the record.
    fn settle(
        &mut self,
        ctx: &CallContext,
        key: &ConditionKey,
        via: Transition,
        plan: SettlementPlan,
        effect: RegistryEffect,
    ) -> Result<SettlementPlan, EngineError> {
        let stage = self.record(key)?.stage.next(via)?;
        self.audit.verify_settlement(&plan)?;

        let outcome = match effect {
            RegistryEffect::Resolve(outcome) => {
                self.hub
                    .registry_mut(&key.registry)?
                    .resolve_condition(key.condition_id, outcome, ctx.now)?;
                Some(outcome)
            }
            RegistryEffect::Cancel => {
                self.hub
                    .registry_mut(&key.registry)?
                    .cancel_condition(key.condition_id, ctx.now)?;
                None
            }
            RegistryEffect::None => None,
        };

        for payout in &plan.payouts {
            self.ledger.credit(&payout.account, payout.amount);
        }
        self.audit.record_settlement(&plan);

        let record = self.record_mut(key)?;
        record.stage = stage;
        record.payouts = plan.payouts.clone();
        record.settled_at = Some(ctx.now);

        self.journal.push(EngineEvent::ConditionSettled {
            key: key.clone(),
            path: plan.path,
            outcome,
            payouts: plan.payouts.clone(),
            at: ctx.now,
        });
        tracing::info!(
            condition = %key,
            path = ?plan.path,
            escrowed = %plan.escrowed,
            payouts = plan.payouts.len(),
            "condition settled"
        );
        Ok(plan)
    }
}

/// Registry refusal of a governance outcome surfaces as `IncorrectSolution`.
fn incorrect_solution(err: EngineError) -> EngineError {
    match err {
        EngineError::Registry(RegistryError::IncorrectOutcome { outcome, .. }) => EngineError::IncorrectSolution(outcome),
        other => other,
    }
}
