#![cfg(not(target_arch = "wasm32"))]

// Seeded random call sequences: after every call, accepted or rejected, the
// engine's token holdings must equal ledger balances plus open escrow, and
// every settled record must have paid out exactly what it escrowed.

#[cfg(test)]
mod tests {
    use arbiter_engine::registry::{ConditionParams, ConditionRegistry};
    use arbiter_engine::token::TokenTransfer;
    use arbiter_engine::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const ORACLES: [&str; 2] = ["oracle-a", "oracle-b"];
    const DISPUTERS: [&str; 3] = ["disputer-a", "disputer-b", "disputer-c"];

    struct Run {
        engine: InMemoryEngine,
        rng: ChaCha8Rng,
        now: Timestamp,
        next_id: u64,
        supply: TokenAmount,
    }

    impl Run {
        fn new(seed: u64) -> Self {
            let config = EngineConfig {
                dispute_window: 600,
                decision_period: 3_600,
                ..EngineConfig::default()
            };
            let mut engine = InMemoryEngine::in_memory(&config).expect("config");
            engine.hub_mut().deploy_core("core");
            let dao = Address::from("dao");
            for oracle in ORACLES {
                engine.access_mut().grant_oracle(&dao, oracle).expect("admin");
            }
            for who in ORACLES.iter().chain(DISPUTERS.iter()) {
                let account = Address::from(*who);
                engine.token_mut().mint(&account, TokenAmount::tokens(50_000));
                engine
                    .token_mut()
                    .approve(&account, &Address::from("engine"), TokenAmount::tokens(50_000));
            }
            let supply = engine.token().total_supply();
            Self {
                engine,
                rng: ChaCha8Rng::seed_from_u64(seed),
                now: 1_000_000,
                next_id: 1,
                supply,
            }
        }

        fn open_keys(&self) -> Vec<ConditionKey> {
            self.engine
                .conditions()
                .filter(|r| !r.is_settled())
                .map(|r| r.key.clone())
                .collect()
        }

        fn pick_open(&mut self) -> Option<ConditionKey> {
            let open = self.open_keys();
            if open.is_empty() {
                return None;
            }
            let i = self.rng.gen_range(0..open.len());
            open.into_iter().nth(i)
        }

        fn step(&mut self) {
            self.now += self.rng.gen_range(0..400);
            let now = self.now;
            let roll = self.rng.gen_range(0..12);

            match roll {
                0 | 1 => {
                    let oracle = ORACLES[self.rng.gen_range(0..ORACLES.len())];
                    let id = self.next_id;
                    self.next_id += 1;
                    let deadline = now + self.rng.gen_range(0..2_000);
                    let _ = self.engine.create_condition(
                        &CallContext::new(oracle, now),
                        &Address::from("core"),
                        GameId(id),
                        ConditionId(id),
                        &ConditionParams::binary(1, 2),
                        deadline,
                    );
                }
                2 | 3 => {
                    if let Some(key) = self.pick_open() {
                        let reporter = self.engine.condition(&key).map(|r| r.reporter.clone());
                        let outcome = Outcome(self.rng.gen_range(1..=3));
                        if let Some(reporter) = reporter {
                            let _ = self.engine.oracle_propose(&CallContext::new(reporter, now), &key, outcome);
                        }
                    }
                }
                4 => {
                    if let Some(key) = self.pick_open() {
                        let who = DISPUTERS[self.rng.gen_range(0..DISPUTERS.len())];
                        let _ = self.engine.dispute(&CallContext::new(who, now), &key);
                    }
                }
                5 => {
                    if let Some(key) = self.pick_open() {
                        let _ = self.engine.accept_proposal(&CallContext::new("keeper", now), &key);
                    }
                }
                6 => {
                    if let Some(key) = self.pick_open() {
                        let ctx = CallContext::new("dao", now);
                        let _ = match self.rng.gen_range(0..3) {
                            0 => self.engine.governance_resolve(&ctx, &key, Outcome(self.rng.gen_range(1..=3))),
                            1 => self.engine.governance_cancel(&ctx, &key),
                            _ => self.engine.governance_approve(&ctx, &key),
                        };
                    }
                }
                7 => {
                    if let Some(key) = self.pick_open() {
                        let _ = self.engine.timeout_cancel(&CallContext::new("keeper", now), &key);
                    }
                }
                8 => {
                    if let Some(key) = self.pick_open() {
                        if let Some(core) = self.engine.hub_mut().core_mut(&key.registry) {
                            let _ = core.cancel_condition(key.condition_id, now);
                        }
                    }
                }
                9 => {
                    if let Some(key) = self.pick_open() {
                        let _ = self
                            .engine
                            .handle_external_cancellation(&CallContext::new("keeper", now), &key);
                    }
                }
                10 => {
                    let all: Vec<&str> = ORACLES.iter().chain(DISPUTERS.iter()).copied().chain(["dao"]).collect();
                    let who = all[self.rng.gen_range(0..all.len())];
                    let balance = self.engine.balance(&Address::from(who));
                    let amount = if self.rng.gen_bool(0.5) { balance } else { balance + TokenAmount::tokens(1) };
                    let _ = self.engine.withdraw(&CallContext::new(who, now), amount);
                }
                _ => {
                    let ctx = CallContext::new("dao", now);
                    let _ = if self.rng.gen_bool(0.5) {
                        self.engine
                            .change_insurance(&ctx, TokenAmount::tokens(self.rng.gen_range(1..300)))
                    } else {
                        self.engine.change_dispute_period(&ctx, self.rng.gen_range(0..1_200))
                    };
                }
            }
        }

        fn assert_invariants(&self, seed: u64, step: usize) {
            self.engine
                .verify_conservation()
                .unwrap_or_else(|e| panic!("seed {seed} step {step}: {e}"));
            for record in self.engine.conditions().filter(|r| r.is_settled()) {
                assert_eq!(
                    record.paid_out(),
                    record.escrowed,
                    "seed {seed} step {step}: record {} paid {} of {}",
                    record.key,
                    record.paid_out(),
                    record.escrowed
                );
            }
            assert_eq!(self.engine.token().total_supply(), self.supply, "seed {seed} step {step}: supply changed");
            assert!(!self.engine.audit().is_circuit_breaker_tripped());
        }
    }

    #[test]
    fn conservation_holds_across_random_sequences() {
        for seed in 0..20u64 {
            let mut run = Run::new(seed);
            for step in 0..400 {
                run.step();
                run.assert_invariants(seed, step);
            }
        }
    }

    #[test]
    fn every_record_eventually_settles() {
        let mut run = Run::new(99);
        for step in 0..300 {
            run.step();
            run.assert_invariants(99, step);
        }

        // Drain: far in the future, cancel anything still open on the registry
        // and reconcile it.
        run.now += 10 * 86_400;
        let now = run.now;
        for key in run.open_keys() {
            let canceled = run
                .engine
                .hub()
                .core(&key.registry)
                .and_then(|c| c.condition(key.condition_id))
                .map(|c| c.is_canceled())
                .unwrap_or(false);
            if !canceled {
                // Proposed or disputed records time out; the rest are canceled
                // on the registry and reconciled.
                let timed_out = run
                    .engine
                    .timeout_cancel(&CallContext::new("keeper", now), &key)
                    .is_ok();
                if timed_out {
                    continue;
                }
                run.engine
                    .hub_mut()
                    .core_mut(&key.registry)
                    .expect("core")
                    .cancel_condition(key.condition_id, now)
                    .expect("registry cancel of an open condition");
            }
            run.engine
                .handle_external_cancellation(&CallContext::new("keeper", now), &key)
                .expect("reconcile");
        }

        assert!(run.open_keys().is_empty());
        assert_eq!(run.engine.outstanding_escrow(), TokenAmount::zero());
        let held = run.engine.token().balance_of(&Address::from("engine"));
        assert_eq!(held, run.engine.ledger().total());
    }
}
