// Scenario Definitions: scripted walkthroughs A–E and the seeded workload mixes
// Walkthroughs assert exact balances; workloads are judged on conservation alone

use arbiter_engine::*;

use crate::report::Check;
use crate::world::World;

const ORACLE: &str = "oracle";
const DISPUTER: &str = "disputer";
const DAO: &str = "dao";
const KEEPER: &str = "keeper";

// ─── Scripted Walkthroughs ──────────────────────────────────────────────────

pub struct Scripted {
    pub name: &'static str,
    pub label: &'static str,
    pub category: &'static str,
    pub run: fn(&mut World) -> anyhow::Result<Vec<Check>>,
}

impl Scripted {
    pub fn world(&self) -> anyhow::Result<World> {
        World::new(
            &EngineConfig::default(),
            &[ORACLE.to_string()],
            &[DISPUTER.to_string(), KEEPER.to_string()],
        )
    }
}

pub fn scripted() -> Vec<Scripted> {
    vec![
        Scripted {
            name: "A_ACCEPT",
            label: "A: unchallenged proposal accepted",
            category: "settlement",
            run: scenario_accept,
        },
        Scripted {
            name: "B_OVERTURN",
            label: "B: DAO overturns disputed proposal",
            category: "governance",
            run: scenario_overturn,
        },
        Scripted {
            name: "C_APPROVE",
            label: "C: DAO rejects the dispute",
            category: "governance",
            run: scenario_approve,
        },
        Scripted {
            name: "D_TIMEOUT",
            label: "D: silent DAO, decision timeout",
            category: "timeout",
            run: scenario_timeout,
        },
        Scripted {
            name: "E_EARLY_CANCEL",
            label: "E1: registry cancel before deadline",
            category: "external",
            run: scenario_early_cancel,
        },
        Scripted {
            name: "E_LATE_CANCEL",
            label: "E2: registry cancel after deadline",
            category: "external",
            run: scenario_late_cancel,
        },
    ]
}

/// Create, propose outcome 1 and, if asked, dispute it.
fn proposed(world: &mut World, disputed: bool) -> anyhow::Result<ConditionKey> {
    let key = world.create(ORACLE, 3_600)?;
    world.advance(60);
    world.engine.oracle_propose(&world.ctx(ORACLE), &key, Outcome(1))?;
    if disputed {
        world.advance(60);
        world.engine.dispute(&world.ctx(DISPUTER), &key)?;
    }
    Ok(key)
}

fn scenario_accept(world: &mut World) -> anyhow::Result<Vec<Check>> {
    let key = proposed(world, false)?;
    let window = world.engine.params().dispute_window;
    world.advance(window);
    let accepted = world.engine.accept_proposal(&world.ctx(KEEPER), &key)?;

    Ok(vec![
        Check::equals("accepted", true, matches!(accepted, Acceptance::Accepted(_))),
        Check::equals("reporter balance", TokenAmount::tokens(100), world.balance(ORACLE)),
        Check::equals("registry outcome", "1".to_string(), outcome_label(world.registry_outcome(&key))),
    ])
}

fn scenario_overturn(world: &mut World) -> anyhow::Result<Vec<Check>> {
    let key = proposed(world, true)?;
    world.advance(600);
    world.engine.governance_resolve(&world.ctx(DAO), &key, Outcome(2))?;

    Ok(vec![
        Check::equals("disputer balance", TokenAmount::tokens(100), world.balance(DISPUTER)),
        Check::equals("dao balance", TokenAmount::tokens(50), world.balance(DAO)),
        Check::equals("reporter balance", TokenAmount::zero(), world.balance(ORACLE)),
        Check::equals("registry outcome", "2".to_string(), outcome_label(world.registry_outcome(&key))),
    ])
}

fn scenario_approve(world: &mut World) -> anyhow::Result<Vec<Check>> {
    let key = proposed(world, true)?;
    world.advance(600);
    world.engine.governance_approve(&world.ctx(DAO), &key)?;

    Ok(vec![
        Check::equals("reporter balance", TokenAmount::tokens(100), world.balance(ORACLE)),
        Check::equals("dao balance", TokenAmount::tokens(50), world.balance(DAO)),
        Check::equals("disputer balance", TokenAmount::zero(), world.balance(DISPUTER)),
        Check::equals("registry outcome", "1".to_string(), outcome_label(world.registry_outcome(&key))),
    ])
}

fn scenario_timeout(world: &mut World) -> anyhow::Result<Vec<Check>> {
    let key = proposed(world, true)?;
    let deadline = world
        .engine
        .condition(&key)
        .and_then(|r| r.decision_deadline(world.engine.decision_period()))
        .ok_or_else(|| anyhow::anyhow!("disputed record has no decision deadline"))?;
    world.now = deadline;
    world.engine.timeout_cancel(&world.ctx(KEEPER), &key)?;

    Ok(vec![
        Check::equals("reporter balance", TokenAmount::tokens(100), world.balance(ORACLE)),
        Check::equals("disputer balance", TokenAmount::tokens(50), world.balance(DISPUTER)),
        Check::equals("dao balance", TokenAmount::zero(), world.balance(DAO)),
        Check::equals("registry canceled", true, world.registry_canceled(&key)),
    ])
}

fn scenario_early_cancel(world: &mut World) -> anyhow::Result<Vec<Check>> {
    let key = world.create(ORACLE, 3_600)?;
    world.advance(600);
    world.cancel_on_registry(&key)?;
    world.engine.handle_external_cancellation(&world.ctx(KEEPER), &key)?;

    Ok(vec![
        Check::equals("reporter balance", TokenAmount::tokens(100), world.balance(ORACLE)),
        Check::equals("dao balance", TokenAmount::zero(), world.balance(DAO)),
    ])
}

fn scenario_late_cancel(world: &mut World) -> anyhow::Result<Vec<Check>> {
    let key = world.create(ORACLE, 3_600)?;
    world.advance(3_601);
    world.cancel_on_registry(&key)?;
    world.engine.handle_external_cancellation(&world.ctx(KEEPER), &key)?;

    Ok(vec![
        Check::equals("reporter balance", TokenAmount::zero(), world.balance(ORACLE)),
        Check::equals("dao balance", TokenAmount::tokens(100), world.balance(DAO)),
    ])
}

fn outcome_label(outcome: Option<Outcome>) -> String {
    outcome.map(|o| o.0.to_string()).unwrap_or_else(|| "none".to_string())
}

// ─── Workload Mixes ─────────────────────────────────────────────────────────

/// Relative weights of the calls a workload issues each step.
#[derive(Debug, Clone, Copy)]
pub struct CallWeights {
    pub propose: u32,
    pub dispute: u32,
    pub accept: u32,
    pub dao_resolve: u32,
    pub dao_cancel: u32,
    pub dao_approve: u32,
    pub timeout: u32,
    pub registry_cancel: u32,
    pub reconcile: u32,
    pub withdraw: u32,
    pub tune_params: u32,
}

impl Default for CallWeights {
    fn default() -> Self {
        Self {
            propose: 30,
            dispute: 10,
            accept: 20,
            dao_resolve: 4,
            dao_cancel: 3,
            dao_approve: 4,
            timeout: 8,
            registry_cancel: 2,
            reconcile: 6,
            withdraw: 8,
            tune_params: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Workload {
    pub name: &'static str,
    pub label: &'static str,
    pub category: &'static str,
    pub oracles: usize,
    pub disputers: usize,
    /// Mean new conditions per step (Poisson).
    pub arrival_rate: f64,
    pub calls_per_step: u32,
    /// Mean clock advance per step, in seconds.
    pub step_secs: Seconds,
    pub dispute_window: Seconds,
    pub decision_period: Seconds,
    /// Probability a reporter proposes an outcome the registry will refuse.
    pub bad_outcome_rate: f64,
    pub weights: CallWeights,
}

impl Workload {
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            dispute_window: self.dispute_window,
            decision_period: self.decision_period,
            ..EngineConfig::default()
        }
    }

    pub fn oracle_names(&self) -> Vec<String> {
        (0..self.oracles).map(|i| format!("oracle-{i}")).collect()
    }

    pub fn disputer_names(&self) -> Vec<String> {
        (0..self.disputers).map(|i| format!("disputer-{i}")).collect()
    }
}

pub fn workloads() -> Vec<Workload> {
    let base = Workload {
        name: "MC_BALANCED",
        label: "Balanced call mix",
        category: "mixed",
        oracles: 3,
        disputers: 4,
        arrival_rate: 1.5,
        calls_per_step: 12,
        step_secs: 900,
        dispute_window: 2 * 3_600,
        decision_period: 24 * 3_600,
        bad_outcome_rate: 0.0,
        weights: CallWeights::default(),
    };

    vec![
        Workload {
            name: "MC_HIGH_DISPUTE",
            label: "Contested proposals, active DAO",
            category: "governance",
            weights: CallWeights {
                dispute: 40,
                dao_resolve: 12,
                dao_cancel: 8,
                dao_approve: 12,
                ..CallWeights::default()
            },
            ..base
        },
        Workload {
            name: "MC_SILENT_DAO",
            label: "Disputes left to time out",
            category: "timeout",
            decision_period: 6 * 3_600,
            weights: CallWeights {
                dispute: 30,
                dao_resolve: 0,
                dao_cancel: 0,
                dao_approve: 0,
                timeout: 20,
                ..CallWeights::default()
            },
            ..base
        },
        Workload {
            name: "MC_REGISTRY_CHURN",
            label: "Registry cancels behind the engine",
            category: "external",
            weights: CallWeights {
                registry_cancel: 15,
                reconcile: 20,
                ..CallWeights::default()
            },
            ..base
        },
        Workload {
            name: "MC_PARAM_DRIFT",
            label: "DAO retunes window and insurance",
            category: "governance",
            weights: CallWeights {
                tune_params: 15,
                ..CallWeights::default()
            },
            ..base
        },
        Workload {
            name: "MC_BAD_OUTCOMES",
            label: "Proposals the registry refuses",
            category: "settlement",
            bad_outcome_rate: 0.3,
            ..base
        },
        base,
    ]
}
