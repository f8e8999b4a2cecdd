// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Browser-facing wrapper around the in-memory engine.
//!
//! Addresses are plain strings, amounts decimal strings, timestamps JS
//! numbers of whole seconds. Views come back as plain JS objects.

use std::str::FromStr;

use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::EngineConfig;
use crate::engine::{Acceptance, EngineError, InMemoryEngine, Submission};
use crate::registry::ConditionParams;
use crate::types::{Address, CallContext, ConditionId, ConditionKey, GameId, Outcome, Timestamp, TokenAmount};

#[wasm_bindgen]
pub struct WasmEngine {
    engine: InMemoryEngine,
}

fn js_err(err: impl std::fmt::Display) -> JsError {
    JsError::new(&err.to_string())
}

fn engine_err(err: EngineError) -> JsError {
    js_err(err)
}

/// JS numbers carry ids, outcomes and seconds; all must be non-negative
/// integers.
fn integral(raw: f64) -> Option<u64> {
    if raw.fract() != 0.0 {
        return None;
    }
    raw.to_u64()
}

fn whole(raw: f64) -> Result<u64, JsError> {
    integral(raw).ok_or_else(|| js_err(format!("expected a non-negative integer, got {raw}")))
}

fn timestamp(now: f64) -> Result<Timestamp, JsError> {
    whole(now)
}

fn amount(raw: &str) -> Result<TokenAmount, JsError> {
    Decimal::from_str(raw)
        .map(TokenAmount::from_decimal)
        .map_err(|e| js_err(format!("invalid amount {raw:?}: {e}")))
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

#[wasm_bindgen]
impl WasmEngine {
    /// Build an engine from an optional TOML config; defaults otherwise.
    #[wasm_bindgen(constructor)]
    pub fn new(config_toml: Option<String>) -> Result<WasmEngine, JsError> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let config = match config_toml {
            Some(raw) => EngineConfig::from_toml_str(&raw).map_err(js_err)?,
            None => EngineConfig::default(),
        };
        let engine = InMemoryEngine::in_memory(&config).map_err(js_err)?;
        Ok(WasmEngine { engine })
    }

    // ── Environment setup ───────────────────────────────────────────────────

    pub fn deploy_core(&mut self, core: &str) {
        self.engine.hub_mut().deploy_core(core);
    }

    pub fn grant_oracle(&mut self, caller: &str, account: &str) -> Result<bool, JsError> {
        self.engine
            .access_mut()
            .grant_oracle(&Address::from(caller), account)
            .map_err(js_err)
    }

    pub fn mint(&mut self, account: &str, value: &str) -> Result<(), JsError> {
        let value = amount(value)?;
        self.engine.token_mut().mint(&Address::from(account), value);
        Ok(())
    }

    /// Allow the engine to pull up to `value` from `owner`.
    pub fn approve(&mut self, owner: &str, value: &str) -> Result<(), JsError> {
        let value = amount(value)?;
        let spender = self.engine.engine_account().clone();
        self.engine
            .token_mut()
            .approve(&Address::from(owner), &spender, value);
        Ok(())
    }

    /// Cancel a condition directly on its registry, as the betting core would.
    pub fn registry_cancel(&mut self, core: &str, condition_id: f64, now: f64) -> Result<(), JsError> {
        let id = condition_id_from(condition_id)?;
        let now = timestamp(now)?;
        let registry = self
            .engine
            .hub_mut()
            .core_mut(&Address::from(core))
            .ok_or_else(|| js_err(format!("unknown core {core}")))?;
        crate::registry::ConditionRegistry::cancel_condition(registry, id, now).map_err(js_err)
    }

    // ── Operations ──────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn create_condition(
        &mut self,
        caller: &str,
        now: f64,
        core: &str,
        game_id: f64,
        condition_id: f64,
        outcome_a: f64,
        outcome_b: f64,
        propose_deadline: f64,
    ) -> Result<JsValue, JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        let params = ConditionParams::binary(whole(outcome_a)?, whole(outcome_b)?);
        let key = self
            .engine
            .create_condition(
                &ctx,
                &Address::from(core),
                GameId(whole(game_id)?),
                condition_id_from(condition_id)?,
                &params,
                timestamp(propose_deadline)?,
            )
            .map_err(engine_err)?;
        Ok(to_js(&key))
    }

    /// Returns `"proposed"` or the settlement plan when the DAO resolved.
    pub fn propose(&mut self, caller: &str, now: f64, core: &str, condition_id: f64, outcome: f64) -> Result<JsValue, JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        let key = key(core, condition_id)?;
        match self
            .engine
            .propose(&ctx, &key, Outcome(whole(outcome)?))
            .map_err(engine_err)?
        {
            Submission::Proposed => Ok(JsValue::from_str("proposed")),
            Submission::Resolved(plan) => Ok(to_js(&plan)),
        }
    }

    pub fn dispute(&mut self, caller: &str, now: f64, core: &str, condition_id: f64) -> Result<(), JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        self.engine
            .dispute(&ctx, &key(core, condition_id)?)
            .map_err(engine_err)
    }

    /// Returns the settlement plan, or `null` when the registry deferred it.
    pub fn accept_proposal(&mut self, caller: &str, now: f64, core: &str, condition_id: f64) -> Result<JsValue, JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        match self
            .engine
            .accept_proposal(&ctx, &key(core, condition_id)?)
            .map_err(engine_err)?
        {
            Acceptance::Accepted(plan) => Ok(to_js(&plan)),
            // The reason is journalled; see `take_events`.
            Acceptance::Deferred { .. } => Ok(JsValue::NULL),
        }
    }

    pub fn governance_resolve(
        &mut self,
        caller: &str,
        now: f64,
        core: &str,
        condition_id: f64,
        outcome: f64,
    ) -> Result<JsValue, JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        let plan = self
            .engine
            .governance_resolve(&ctx, &key(core, condition_id)?, Outcome(whole(outcome)?))
            .map_err(engine_err)?;
        Ok(to_js(&plan))
    }

    pub fn governance_cancel(&mut self, caller: &str, now: f64, core: &str, condition_id: f64) -> Result<JsValue, JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        let plan = self
            .engine
            .governance_cancel(&ctx, &key(core, condition_id)?)
            .map_err(engine_err)?;
        Ok(to_js(&plan))
    }

    pub fn governance_approve(&mut self, caller: &str, now: f64, core: &str, condition_id: f64) -> Result<JsValue, JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        let plan = self
            .engine
            .governance_approve(&ctx, &key(core, condition_id)?)
            .map_err(engine_err)?;
        Ok(to_js(&plan))
    }

    pub fn timeout_cancel(&mut self, caller: &str, now: f64, core: &str, condition_id: f64) -> Result<JsValue, JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        let plan = self
            .engine
            .timeout_cancel(&ctx, &key(core, condition_id)?)
            .map_err(engine_err)?;
        Ok(to_js(&plan))
    }

    pub fn handle_external_cancellation(
        &mut self,
        caller: &str,
        now: f64,
        core: &str,
        condition_id: f64,
    ) -> Result<JsValue, JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        let plan = self
            .engine
            .handle_external_cancellation(&ctx, &key(core, condition_id)?)
            .map_err(engine_err)?;
        Ok(to_js(&plan))
    }

    pub fn withdraw(&mut self, caller: &str, now: f64, value: &str) -> Result<(), JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        self.engine.withdraw(&ctx, amount(value)?).map_err(engine_err)
    }

    pub fn change_dispute_period(&mut self, caller: &str, now: f64, period: f64) -> Result<(), JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        self.engine
            .change_dispute_period(&ctx, whole(period)?)
            .map_err(engine_err)
    }

    pub fn change_insurance(&mut self, caller: &str, now: f64, value: &str) -> Result<(), JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        self.engine
            .change_insurance(&ctx, amount(value)?)
            .map_err(engine_err)
    }

    pub fn transfer_ownership(&mut self, caller: &str, now: f64, new_dao: &str) -> Result<(), JsError> {
        let ctx = CallContext::new(caller, timestamp(now)?);
        self.engine
            .transfer_ownership(&ctx, Address::from(new_dao))
            .map_err(engine_err)
    }

    // ── Views ───────────────────────────────────────────────────────────────

    pub fn get_condition(&self, core: &str, condition_id: f64) -> Result<JsValue, JsError> {
        let key = key(core, condition_id)?;
        Ok(self.engine.condition(&key).map(to_js).unwrap_or(JsValue::NULL))
    }

    /// Ledger balance as a JS number (lossy for very large amounts).
    pub fn balance(&self, account: &str) -> f64 {
        self.engine
            .balance(&Address::from(account))
            .0
            .to_f64()
            .unwrap_or(0.0)
    }

    pub fn balance_exact(&self, account: &str) -> String {
        self.engine.balance(&Address::from(account)).to_string()
    }

    pub fn get_params(&self) -> JsValue {
        to_js(self.engine.params())
    }

    pub fn dao(&self) -> String {
        self.engine.dao().to_string()
    }

    pub fn decision_period(&self) -> f64 {
        self.engine.decision_period() as f64
    }

    pub fn get_snapshot(&self) -> JsValue {
        to_js(&self.engine.snapshot())
    }

    pub fn is_conserved(&self) -> bool {
        self.engine.verify_conservation().is_ok()
    }

    pub fn take_events(&mut self) -> JsValue {
        to_js(&self.engine.take_events())
    }
}

fn condition_id_from(raw: f64) -> Result<ConditionId, JsError> {
    Ok(ConditionId(whole(raw)?))
}

fn key(core: &str, condition_id: f64) -> Result<ConditionKey, JsError> {
    Ok(ConditionKey {
        registry: Address::from(core),
        condition_id: condition_id_from(condition_id)?,
    })
}
