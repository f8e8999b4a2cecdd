// Bench World: an in-memory engine with a deployed core, funded actors and a clock
// Every scripted walkthrough and workload run starts from one of these

use anyhow::Context;
use arbiter_engine::registry::{ConditionParams, ConditionRegistry, RegistryError};
use arbiter_engine::*;

pub const CORE: &str = "core";

/// Tokens minted (and approved to the engine) for every actor.
const STARTING_FUNDS: u64 = 1_000_000;

pub struct World {
    pub engine: InMemoryEngine,
    pub now: Timestamp,
    core: Address,
    next_condition: u64,
}

impl World {
    /// Deploy one core, grant `oracles` the oracle role and fund every actor.
    pub fn new(config: &EngineConfig, oracles: &[String], others: &[String]) -> anyhow::Result<Self> {
        let mut engine = InMemoryEngine::in_memory(config).context("engine config rejected")?;
        engine.hub_mut().deploy_core(CORE);

        let dao = config.dao.clone();
        for oracle in oracles {
            engine
                .access_mut()
                .grant_oracle(&dao, oracle.as_str())
                .context("granting oracle role")?;
        }

        let engine_account = engine.engine_account().clone();
        for actor in oracles.iter().chain(others) {
            let account = Address::from(actor.as_str());
            engine.token_mut().mint(&account, TokenAmount::tokens(STARTING_FUNDS));
            engine
                .token_mut()
                .approve(&account, &engine_account, TokenAmount::tokens(STARTING_FUNDS));
        }

        Ok(Self {
            engine,
            now: 1_700_000_000,
            core: Address::from(CORE),
            next_condition: 1,
        })
    }

    pub fn ctx(&self, caller: &str) -> CallContext {
        CallContext::new(caller, self.now)
    }

    pub fn advance(&mut self, seconds: Seconds) {
        self.now += seconds;
    }

    /// Create a fresh two-outcome condition (outcomes 1 and 2).
    pub fn create(&mut self, reporter: &str, deadline_in: Seconds) -> Result<ConditionKey, EngineError> {
        let id = self.next_condition;
        self.next_condition += 1;
        let ctx = self.ctx(reporter);
        let core = self.core.clone();
        self.engine.create_condition(
            &ctx,
            &core,
            GameId(id),
            ConditionId(id),
            &ConditionParams::binary(1, 2),
            self.now + deadline_in,
        )
    }

    /// Cancel a condition on its registry behind the engine's back.
    pub fn cancel_on_registry(&mut self, key: &ConditionKey) -> Result<(), RegistryError> {
        let now = self.now;
        let core = self
            .engine
            .hub_mut()
            .core_mut(&key.registry)
            .ok_or_else(|| RegistryError::UnknownCore(key.registry.clone()))?;
        core.cancel_condition(key.condition_id, now)
    }

    pub fn registry_outcome(&self, key: &ConditionKey) -> Option<Outcome> {
        self.engine
            .hub()
            .core(&key.registry)
            .and_then(|core| core.condition(key.condition_id))
            .and_then(|c| c.outcome_win)
    }

    pub fn registry_canceled(&self, key: &ConditionKey) -> bool {
        self.engine
            .hub()
            .core(&key.registry)
            .and_then(|core| core.condition(key.condition_id))
            .map(|c| c.is_canceled())
            .unwrap_or(false)
    }

    pub fn balance(&self, who: &str) -> TokenAmount {
        self.engine.balance(&Address::from(who))
    }

    /// Keys of records that have not settled yet.
    pub fn open_keys(&self) -> Vec<ConditionKey> {
        self.engine
            .conditions()
            .filter(|r| !r.is_settled())
            .map(|r| r.key.clone())
            .collect()
    }
}
