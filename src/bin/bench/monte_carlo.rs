// Monte Carlo Infrastructure: N seeded runs per workload with statistical aggregation
// Each run issues random calls against one engine and checks conservation every step

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use arbiter_engine::*;

use crate::metrics::{to_f64, ConservationTracker};
use crate::report::*;
use crate::scenarios::Workload;
use crate::traffic::{Call, CallGenerator};
use crate::world::World;

use std::time::Instant;

const DAO: &str = "dao";
const KEEPER: &str = "keeper";

/// Mutable tallies of one run.
#[derive(Default)]
struct Tally {
    rejected: u64,
    created: u32,
    disputes: u32,
    withdrawals: u32,
    param_changes: u32,
    paths: PathCounts,
}

impl Tally {
    fn settled(&mut self, result: Result<settlement::SettlementPlan, EngineError>) {
        match result {
            Ok(plan) => self.paths.record(plan.path),
            Err(_) => self.rejected += 1,
        }
    }

    fn unit(&mut self, result: Result<(), EngineError>) -> bool {
        match result {
            Ok(()) => true,
            Err(_) => {
                self.rejected += 1;
                false
            }
        }
    }
}

/// Run a single workload iteration with a specific seed.
pub fn run_single(workload: &Workload, seed: u64, steps: u64) -> anyhow::Result<BenchResult> {
    let start = Instant::now();
    let oracles = workload.oracle_names();
    let disputers = workload.disputer_names();
    let mut others = disputers.clone();
    others.push(KEEPER.to_string());

    let mut world = World::new(&workload.config(), &oracles, &others)?;
    let mut traffic = CallGenerator::new(ChaCha8Rng::seed_from_u64(seed), workload.weights, workload.arrival_rate);
    let mut conservation = ConservationTracker::new();
    let mut tally = Tally::default();

    // Everyone who can end up holding a ledger balance.
    let mut payees: Vec<String> = oracles.iter().chain(&disputers).cloned().collect();
    payees.push(DAO.to_string());

    for step in 0..steps {
        let dt = traffic.jitter(workload.step_secs);
        world.advance(dt);

        for _ in 0..traffic.arrivals() {
            let Some(reporter) = traffic.pick(&oracles).cloned() else { break };
            let deadline_in = traffic.range(600, 4 * workload.step_secs.max(600));
            match world.create(&reporter, deadline_in) {
                Ok(_) => tally.created += 1,
                Err(_) => tally.rejected += 1,
            }
        }

        for _ in 0..workload.calls_per_step {
            let Some(call) = traffic.next_call() else { break };
            apply(&mut world, &mut traffic, &mut tally, workload, call, &payees, &disputers);
        }

        conservation.record_step(&world.engine);
        if !conservation.holds() {
            tracing::error!(
                workload = workload.name,
                seed,
                step,
                violation = conservation.first_violation.as_deref().unwrap_or("settlement imbalance"),
                "conservation violated"
            );
            break;
        }
    }

    let elapsed = start.elapsed();
    let elapsed_secs = elapsed.as_secs_f64().max(0.001);
    let audit = world.engine.audit();
    let pass = conservation.holds() && !audit.is_circuit_breaker_tripped();

    Ok(BenchResult {
        workload: workload.label.to_string(),
        name: workload.name.to_string(),
        category: workload.category.to_string(),
        seed,
        pass,
        steps: conservation.steps,
        calls: traffic.calls,
        rejected_calls: tally.rejected,
        conditions_created: tally.created,
        disputes: tally.disputes,
        withdrawals: tally.withdrawals,
        param_changes: tally.param_changes,
        open_at_end: world.open_keys().len() as u32,
        paths: tally.paths,
        conservation_violations: conservation.violations,
        settlement_imbalances: conservation.settlement_imbalances,
        max_conservation_error: conservation.max_abs_error,
        total_escrowed: to_f64(audit.total_escrowed()),
        total_credited: to_f64(audit.total_credited()),
        outstanding_escrow: to_f64(world.engine.outstanding_escrow()),
        elapsed_ms: elapsed.as_millis(),
        calls_per_sec: traffic.calls as f64 / elapsed_secs,
    })
}

/// Issue one random call. Rejections are expected and only counted.
fn apply(
    world: &mut World,
    traffic: &mut CallGenerator,
    tally: &mut Tally,
    workload: &Workload,
    call: Call,
    payees: &[String],
    disputers: &[String],
) {
    let open = world.open_keys();
    let target = traffic.pick(&open).cloned();

    match (call, target) {
        (Call::Propose, Some(key)) => {
            let Some(reporter) = world.engine.condition(&key).map(|r| r.reporter.clone()) else { return };
            let outcome = if traffic.chance(workload.bad_outcome_rate) { Outcome(99) } else { Outcome(traffic.range(1, 2)) };
            let ctx = CallContext::new(reporter, world.now);
            tally.unit(world.engine.oracle_propose(&ctx, &key, outcome));
        }
        (Call::Dispute, Some(key)) => {
            let Some(disputer) = traffic.pick(disputers).cloned() else { return };
            if tally.unit(world.engine.dispute(&world.ctx(&disputer), &key)) {
                tally.disputes += 1;
            }
        }
        (Call::Accept, Some(key)) => match world.engine.accept_proposal(&world.ctx(KEEPER), &key) {
            Ok(Acceptance::Accepted(plan)) => tally.paths.record(plan.path),
            Ok(Acceptance::Deferred { .. }) => tally.paths.deferred += 1,
            Err(_) => tally.rejected += 1,
        },
        (Call::DaoResolve, Some(key)) => {
            let outcome = Outcome(traffic.range(1, 2));
            tally.settled(world.engine.governance_resolve(&world.ctx(DAO), &key, outcome));
        }
        (Call::DaoCancel, Some(key)) => {
            tally.settled(world.engine.governance_cancel(&world.ctx(DAO), &key));
        }
        (Call::DaoApprove, Some(key)) => {
            tally.settled(world.engine.governance_approve(&world.ctx(DAO), &key));
        }
        (Call::Timeout, Some(key)) => {
            tally.settled(world.engine.timeout_cancel(&world.ctx(KEEPER), &key));
        }
        (Call::RegistryCancel, Some(key)) => {
            if world.cancel_on_registry(&key).is_err() {
                tally.rejected += 1;
            }
        }
        (Call::Reconcile, Some(key)) => {
            tally.settled(world.engine.handle_external_cancellation(&world.ctx(KEEPER), &key));
        }
        (Call::Withdraw, _) => {
            let Some(payee) = traffic.pick(payees).cloned() else { return };
            let balance = world.balance(&payee);
            if balance.is_zero() {
                return;
            }
            let amount = if traffic.chance(0.5) { balance } else { balance.half() };
            if tally.unit(world.engine.withdraw(&world.ctx(&payee), amount)) {
                tally.withdrawals += 1;
            }
        }
        (Call::TuneParams, _) => {
            let changed = if traffic.chance(0.5) {
                let window = traffic.range(workload.dispute_window / 2, workload.dispute_window * 2);
                world.engine.change_dispute_period(&world.ctx(DAO), window)
            } else {
                let insurance = TokenAmount::tokens(traffic.range(50, 200));
                world.engine.change_insurance(&world.ctx(DAO), insurance)
            };
            if tally.unit(changed) {
                tally.param_changes += 1;
            }
        }
        (_, None) => {}
    }
}

/// Run Monte Carlo: N runs of a workload, aggregate stats.
pub fn run_monte_carlo(workload: &Workload, n_runs: usize, base_seed: u64, steps: u64) -> anyhow::Result<MonteCarloReport> {
    let mut results = Vec::with_capacity(n_runs);
    for i in 0..n_runs {
        let seed = base_seed + i as u64;
        results.push(run_single(workload, seed, steps)?);
    }
    Ok(aggregate(workload, results))
}

/// Aggregate individual runs into a MonteCarloReport.
fn aggregate(workload: &Workload, results: Vec<BenchResult>) -> MonteCarloReport {
    let n = results.len();
    let passed = results.iter().filter(|r| r.pass).count();
    let pass_rate = if n > 0 { passed as f64 / n as f64 } else { 0.0 };

    let sample = |f: &dyn Fn(&BenchResult) -> f64| Stats::from_samples(&results.iter().map(f).collect::<Vec<_>>());

    MonteCarloReport {
        workload_name: workload.name.to_string(),
        label: workload.label.to_string(),
        category: workload.category.to_string(),
        n_runs: n,
        pass_rate,
        settlements: sample(&|r| r.paths.total_settled() as f64),
        settlement_rate: sample(&|r| r.paths.total_settled() as f64 / r.conditions_created.max(1) as f64 * 100.0),
        rejected_call_rate: sample(&|r| r.rejected_calls as f64 / r.calls.max(1) as f64 * 100.0),
        deferred: sample(&|r| r.paths.deferred as f64),
        open_at_end: sample(&|r| r.open_at_end as f64),
        conservation_violations: sample(&|r| r.conservation_violations as f64),
        max_conservation_error: sample(&|r| r.max_conservation_error),
        elapsed_ms: sample(&|r| r.elapsed_ms as f64),
        calls_per_sec: sample(&|r| r.calls_per_sec),
        individual_runs: results,
    }
}
