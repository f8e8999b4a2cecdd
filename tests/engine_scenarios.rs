#[cfg(test)]
mod tests {
    use arbiter_engine::events::EngineEvent;
    use arbiter_engine::lifecycle::Stage;
    use arbiter_engine::registry::{ConditionParams, ConditionRegistry, ConditionState, RegistryError};
    use arbiter_engine::settlement::{PayoutRole, SettlementPath};
    use arbiter_engine::token::TokenTransfer;
    use arbiter_engine::*;

    const T0: Timestamp = 1_700_000_000;
    const WINDOW: Seconds = 7_200;
    const DECISION: Seconds = 604_800;
    const DEADLINE: Timestamp = T0 + 3_600;

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    fn at(who: &str, now: Timestamp) -> CallContext {
        CallContext::new(who, now)
    }

    fn tokens(n: u64) -> TokenAmount {
        TokenAmount::tokens(n)
    }

    fn setup() -> InMemoryEngine {
        let mut engine = InMemoryEngine::in_memory(&EngineConfig::default()).expect("default config");
        engine.hub_mut().deploy_core("core");
        for oracle in ["oracle", "oracle-2"] {
            engine
                .access_mut()
                .grant_oracle(&addr("dao"), oracle)
                .expect("dao is admin");
        }
        for who in ["oracle", "oracle-2", "disputer", "disputer-2"] {
            engine.token_mut().mint(&addr(who), tokens(10_000));
            engine.token_mut().approve(&addr(who), &addr("engine"), tokens(10_000));
        }
        engine
    }

    fn create_id(engine: &mut InMemoryEngine, id: u64) -> ConditionKey {
        engine
            .create_condition(
                &at("oracle", T0),
                &addr("core"),
                GameId(id),
                ConditionId(id),
                &ConditionParams::binary(1, 2),
                DEADLINE,
            )
            .expect("create condition")
    }

    fn create(engine: &mut InMemoryEngine) -> ConditionKey {
        create_id(engine, 1)
    }

    /// Proposed outcome 1 at T0 + 100.
    fn proposed(engine: &mut InMemoryEngine) -> ConditionKey {
        let key = create(engine);
        engine
            .oracle_propose(&at("oracle", T0 + 100), &key, Outcome(1))
            .expect("propose");
        key
    }

    /// Proposed at T0 + 100, disputed at T0 + 200.
    fn disputed(engine: &mut InMemoryEngine) -> ConditionKey {
        let key = proposed(engine);
        engine.dispute(&at("disputer", T0 + 200), &key).expect("dispute");
        key
    }

    fn registry_view(engine: &InMemoryEngine, key: &ConditionKey) -> registry::RegistryCondition {
        engine
            .hub()
            .core(&key.registry)
            .and_then(|core| core.condition(key.condition_id))
            .expect("registry has condition")
    }

    fn cancel_on_registry(engine: &mut InMemoryEngine, key: &ConditionKey, now: Timestamp) {
        engine
            .hub_mut()
            .core_mut(&key.registry)
            .expect("core deployed")
            .cancel_condition(key.condition_id, now)
            .expect("registry cancel");
    }

    fn assert_conserved(engine: &InMemoryEngine) {
        engine.verify_conservation().expect("engine holdings match ledger + escrow");
    }

    // ========== Scenario Walkthroughs ==========

    #[test]
    fn scenario_a_unchallenged_proposal_accepted() {
        let mut engine = setup();
        let key = proposed(&mut engine);

        let result = engine
            .accept_proposal(&at("keeper", T0 + 100 + WINDOW), &key)
            .expect("accept");
        let Acceptance::Accepted(plan) = result else {
            panic!("expected acceptance, got {result:?}");
        };
        assert_eq!(plan.path, SettlementPath::Accepted);
        assert_eq!(engine.balance(&addr("oracle")), tokens(100));
        assert_eq!(registry_view(&engine, &key).outcome_win, Some(Outcome(1)));
        assert_eq!(engine.condition(&key).map(|r| r.stage), Some(Stage::Accepted));
        assert_conserved(&engine);
    }

    #[test]
    fn scenario_b_dao_overturns() {
        let mut engine = setup();
        let key = disputed(&mut engine);

        let plan = engine
            .governance_resolve(&at("dao", T0 + 300), &key, Outcome(2))
            .expect("dao resolves");
        assert_eq!(plan.amount_for(PayoutRole::Disputer), tokens(100));
        assert_eq!(engine.balance(&addr("disputer")), tokens(100));
        assert_eq!(engine.balance(&addr("dao")), tokens(50));
        assert_eq!(engine.balance(&addr("oracle")), TokenAmount::zero());
        assert_eq!(registry_view(&engine, &key).outcome_win, Some(Outcome(2)));
        assert_conserved(&engine);
    }

    #[test]
    fn scenario_b_through_dispatcher() {
        let mut engine = setup();
        let key = disputed(&mut engine);

        let submitted = engine
            .propose(&at("dao", T0 + 300), &key, Outcome(2))
            .expect("dao resolves through propose");
        let Submission::Resolved(plan) = submitted else {
            panic!("expected resolution, got {submitted:?}");
        };
        assert_eq!(plan.path, SettlementPath::GovernanceResolved);
        assert_eq!(engine.balance(&addr("disputer")), tokens(100));
        assert_eq!(engine.balance(&addr("dao")), tokens(50));
    }

    #[test]
    fn scenario_c_dao_rejects_dispute() {
        let mut engine = setup();
        let key = disputed(&mut engine);

        let plan = engine
            .governance_approve(&at("dao", T0 + 300), &key)
            .expect("dao approves");
        assert_eq!(plan.path, SettlementPath::DisputeRejected);
        assert_eq!(engine.balance(&addr("oracle")), tokens(100));
        assert_eq!(engine.balance(&addr("dao")), tokens(50));
        assert_eq!(engine.balance(&addr("disputer")), TokenAmount::zero());
        assert_eq!(registry_view(&engine, &key).outcome_win, Some(Outcome(1)));
        assert_conserved(&engine);
    }

    #[test]
    fn scenario_d_silent_dao_times_out() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        let deadline = T0 + 200 + WINDOW + DECISION;

        assert_eq!(
            engine.timeout_cancel(&at("keeper", deadline - 1), &key),
            Err(EngineError::CantCancel)
        );
        let plan = engine
            .timeout_cancel(&at("keeper", deadline), &key)
            .expect("timeout");
        assert_eq!(plan.path, SettlementPath::TimedOut);
        assert_eq!(engine.balance(&addr("oracle")), tokens(100));
        assert_eq!(engine.balance(&addr("disputer")), tokens(50));
        assert_eq!(engine.balance(&addr("dao")), TokenAmount::zero());
        assert_eq!(registry_view(&engine, &key).state, ConditionState::Canceled);
        assert_conserved(&engine);
    }

    #[test]
    fn scenario_e_cancel_before_deadline_refunds_reporter() {
        let mut engine = setup();
        let key = create(&mut engine);
        cancel_on_registry(&mut engine, &key, T0 + 600);

        let plan = engine
            .handle_external_cancellation(&at("keeper", T0 + 700), &key)
            .expect("reconcile");
        assert_eq!(plan.path, SettlementPath::ExternallyCanceled);
        assert_eq!(engine.balance(&addr("oracle")), tokens(100));
        assert_eq!(engine.balance(&addr("dao")), TokenAmount::zero());
        assert_conserved(&engine);
    }

    #[test]
    fn scenario_e_cancel_after_deadline_forfeits_to_dao() {
        let mut engine = setup();
        let key = create(&mut engine);
        cancel_on_registry(&mut engine, &key, DEADLINE + 1);

        engine
            .handle_external_cancellation(&at("keeper", DEADLINE + 10), &key)
            .expect("reconcile");
        assert_eq!(engine.balance(&addr("oracle")), TokenAmount::zero());
        assert_eq!(engine.balance(&addr("dao")), tokens(100));
        assert_conserved(&engine);
    }

    #[test]
    fn cancel_exactly_at_deadline_forfeits() {
        let mut engine = setup();
        let key = create(&mut engine);
        cancel_on_registry(&mut engine, &key, DEADLINE);

        // Reconciled long after; the registry's cancellation time decides.
        engine
            .handle_external_cancellation(&at("keeper", DEADLINE + 86_400), &key)
            .expect("reconcile");
        assert_eq!(engine.balance(&addr("dao")), tokens(100));
    }

    #[test]
    fn cancel_of_disputed_condition_splits_forfeit() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        cancel_on_registry(&mut engine, &key, T0 + 300);

        engine
            .handle_external_cancellation(&at("keeper", T0 + 400), &key)
            .expect("reconcile");
        assert_eq!(engine.balance(&addr("oracle")), TokenAmount::zero());
        assert_eq!(engine.balance(&addr("disputer")), tokens(50));
        assert_eq!(engine.balance(&addr("dao")), tokens(100));
        assert_conserved(&engine);
    }

    // ========== Creation Errors ==========

    #[test]
    fn create_rejects_past_or_present_deadline() {
        let mut engine = setup();
        let err = engine.create_condition(
            &at("oracle", T0),
            &addr("core"),
            GameId(1),
            ConditionId(1),
            &ConditionParams::binary(1, 2),
            T0,
        );
        assert_eq!(err, Err(EngineError::IncorrectProposeDeadline));
    }

    #[test]
    fn create_rejects_duplicates() {
        let mut engine = setup();
        let key = create(&mut engine);
        let err = engine.create_condition(
            &at("oracle", T0 + 1),
            &addr("core"),
            GameId(1),
            ConditionId(1),
            &ConditionParams::binary(1, 2),
            DEADLINE,
        );
        assert_eq!(err, Err(EngineError::ConditionAlreadyCreated(key)));
    }

    #[test]
    fn create_rejects_condition_already_on_registry() {
        let mut engine = setup();
        engine
            .hub_mut()
            .core_mut(&addr("core"))
            .expect("core deployed")
            .create_condition(GameId(7), ConditionId(7), &ConditionParams::binary(1, 2), T0)
            .expect("direct registry create");

        let err = engine.create_condition(
            &at("oracle", T0),
            &addr("core"),
            GameId(7),
            ConditionId(7),
            &ConditionParams::binary(1, 2),
            DEADLINE,
        );
        assert_eq!(err, Err(EngineError::ConditionAlreadyCreated(ConditionKey::new("core", 7))));
        assert_eq!(engine.token().balance_of(&addr("engine")), TokenAmount::zero());
    }

    #[test]
    fn create_on_unknown_core_propagates_registry_error() {
        let mut engine = setup();
        let err = engine.create_condition(
            &at("oracle", T0),
            &addr("rogue-core"),
            GameId(1),
            ConditionId(1),
            &ConditionParams::binary(1, 2),
            DEADLINE,
        );
        assert_eq!(err, Err(EngineError::Registry(RegistryError::UnknownCore(addr("rogue-core")))));
    }

    #[test]
    fn create_requires_oracle() {
        let mut engine = setup();
        let err = engine.create_condition(
            &at("disputer", T0),
            &addr("core"),
            GameId(1),
            ConditionId(1),
            &ConditionParams::binary(1, 2),
            DEADLINE,
        );
        assert_eq!(err, Err(EngineError::OnlyOracle(addr("disputer"))));
    }

    #[test]
    fn failed_pull_leaves_no_trace() {
        let mut engine = setup();
        engine
            .access_mut()
            .grant_oracle(&addr("dao"), "poor-oracle")
            .expect("dao is admin");
        engine.token_mut().mint(&addr("poor-oracle"), tokens(10));
        engine.token_mut().approve(&addr("poor-oracle"), &addr("engine"), tokens(10));

        let err = engine.create_condition(
            &at("poor-oracle", T0),
            &addr("core"),
            GameId(1),
            ConditionId(1),
            &ConditionParams::binary(1, 2),
            DEADLINE,
        );
        assert!(matches!(err, Err(EngineError::Transfer(_))), "got {err:?}");
        assert!(engine.condition(&ConditionKey::new("core", 1)).is_none());
        assert!(engine.hub().core(&addr("core")).and_then(|c| c.condition(ConditionId(1))).is_none());
        assert!(engine.events().is_empty());
        assert_conserved(&engine);
    }

    // ========== Proposal Errors ==========

    #[test]
    fn only_reporter_proposes() {
        let mut engine = setup();
        let key = create(&mut engine);
        assert_eq!(
            engine.oracle_propose(&at("oracle-2", T0 + 1), &key, Outcome(1)),
            Err(EngineError::OnlyOracle(addr("oracle-2")))
        );
        assert_eq!(
            engine.propose(&at("stranger", T0 + 1), &key, Outcome(1)),
            Err(EngineError::OnlyOracle(addr("stranger")))
        );
    }

    #[test]
    fn propose_after_deadline_or_twice_fails() {
        let mut engine = setup();
        let key = create(&mut engine);
        assert_eq!(
            engine.oracle_propose(&at("oracle", DEADLINE + 1), &key, Outcome(1)),
            Err(EngineError::CantPropose)
        );
        engine
            .oracle_propose(&at("oracle", DEADLINE), &key, Outcome(1))
            .expect("deadline is inclusive");
        assert_eq!(
            engine.oracle_propose(&at("oracle", DEADLINE), &key, Outcome(2)),
            Err(EngineError::CantPropose)
        );
    }

    #[test]
    fn propose_on_canceled_condition_fails() {
        let mut engine = setup();
        let key = create(&mut engine);
        cancel_on_registry(&mut engine, &key, T0 + 10);
        assert_eq!(
            engine.oracle_propose(&at("oracle", T0 + 20), &key, Outcome(1)),
            Err(EngineError::ConditionCanceled(key))
        );
    }

    #[test]
    fn unknown_condition_reported() {
        let mut engine = setup();
        let key = ConditionKey::new("core", 404);
        assert_eq!(
            engine.dispute(&at("disputer", T0), &key),
            Err(EngineError::ConditionNotFound(key.clone()))
        );
        assert_eq!(
            engine.propose(&at("oracle", T0), &key, Outcome(1)),
            Err(EngineError::ConditionNotFound(key))
        );
    }

    // ========== Dispute Errors ==========

    #[test]
    fn dispute_requires_open_window() {
        let mut engine = setup();
        let key = create(&mut engine);
        assert_eq!(engine.dispute(&at("disputer", T0 + 50), &key), Err(EngineError::DisputeNotAllowed));

        engine
            .oracle_propose(&at("oracle", T0 + 100), &key, Outcome(1))
            .expect("propose");
        assert_eq!(
            engine.dispute(&at("disputer", T0 + 100 + WINDOW), &key),
            Err(EngineError::DisputeNotAllowed)
        );
        engine
            .dispute(&at("disputer", T0 + 100 + WINDOW - 1), &key)
            .expect("last second of the window");
        assert_eq!(
            engine.dispute(&at("disputer-2", T0 + 200), &key),
            Err(EngineError::DisputeNotAllowed)
        );
    }

    #[test]
    fn dispute_escrows_half_insurance() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        let record = engine.condition(&key).expect("record");
        assert_eq!(record.escrowed, tokens(150));
        assert_eq!(record.disputer(), Some(&addr("disputer")));
        assert_eq!(engine.token().balance_of(&addr("disputer")), tokens(9_950));
        assert_eq!(engine.outstanding_escrow(), tokens(150));
        assert_conserved(&engine);
    }

    #[test]
    fn reporter_may_dispute_own_proposal() {
        let mut engine = setup();
        let key = proposed(&mut engine);
        engine.dispute(&at("oracle", T0 + 150), &key).expect("self dispute");
        engine
            .governance_resolve(&at("dao", T0 + 300), &key, Outcome(2))
            .expect("dao resolves");
        // Reporter loses 100, regains 100 as disputer, forfeits 50 to the DAO.
        assert_eq!(engine.balance(&addr("oracle")), tokens(100));
        assert_eq!(engine.balance(&addr("dao")), tokens(50));
        assert_conserved(&engine);
    }

    #[test]
    fn dispute_on_canceled_condition_fails() {
        let mut engine = setup();
        let key = proposed(&mut engine);
        cancel_on_registry(&mut engine, &key, T0 + 150);
        assert_eq!(
            engine.dispute(&at("disputer", T0 + 200), &key),
            Err(EngineError::ConditionCanceled(key))
        );
    }

    // ========== Acceptance ==========

    #[test]
    fn accept_window_boundaries() {
        let mut engine = setup();
        let key = proposed(&mut engine);
        let window_end = T0 + 100 + WINDOW;
        assert_eq!(
            engine.accept_proposal(&at("keeper", window_end - 1), &key),
            Err(EngineError::CantAcceptSolution)
        );
        assert_eq!(
            engine.accept_proposal(&at("keeper", window_end + DECISION), &key),
            Err(EngineError::CantAcceptSolution)
        );
        let accepted = engine
            .accept_proposal(&at("keeper", window_end + DECISION - 1), &key)
            .expect("last second of the decision window");
        assert!(matches!(accepted, Acceptance::Accepted(_)));
    }

    #[test]
    fn accept_refused_on_disputed_record() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        assert_eq!(
            engine.accept_proposal(&at("keeper", T0 + 100 + WINDOW), &key),
            Err(EngineError::CantAcceptSolution)
        );
    }

    #[test]
    fn invalid_outcome_acceptance_is_deferred() {
        let mut engine = setup();
        let key = create(&mut engine);
        engine
            .oracle_propose(&at("oracle", T0 + 100), &key, Outcome(9))
            .expect("engine does not validate outcomes");
        engine.take_events();

        let result = engine
            .accept_proposal(&at("keeper", T0 + 100 + WINDOW), &key)
            .expect("absorbed");
        assert!(matches!(result, Acceptance::Deferred { reason: RegistryError::IncorrectOutcome { .. } }));
        assert_eq!(engine.balance(&addr("oracle")), TokenAmount::zero());
        assert_eq!(engine.condition(&key).map(|r| r.stage), Some(Stage::Proposed));
        assert!(matches!(engine.take_events().as_slice(), [EngineEvent::AcceptanceDeferred { .. }]));

        // The record stays open until the timeout path refunds the reporter.
        engine
            .timeout_cancel(&at("keeper", T0 + 100 + WINDOW + DECISION), &key)
            .expect("timeout");
        assert_eq!(engine.balance(&addr("oracle")), tokens(100));
        assert_conserved(&engine);
    }

    #[test]
    fn accept_on_canceled_condition_fails() {
        let mut engine = setup();
        let key = proposed(&mut engine);
        cancel_on_registry(&mut engine, &key, T0 + 150);
        assert_eq!(
            engine.accept_proposal(&at("keeper", T0 + 100 + WINDOW), &key),
            Err(EngineError::ConditionCanceled(key))
        );
    }

    // ========== Governance Decisions ==========

    #[test]
    fn governance_requires_dao() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        assert_eq!(
            engine.governance_cancel(&at("oracle", T0 + 300), &key),
            Err(EngineError::OnlyDao(addr("oracle")))
        );
        assert_eq!(
            engine.governance_approve(&at("disputer", T0 + 300), &key),
            Err(EngineError::OnlyDao(addr("disputer")))
        );
    }

    #[test]
    fn governance_requires_dispute() {
        let mut engine = setup();
        let key = proposed(&mut engine);
        assert_eq!(
            engine.governance_resolve(&at("dao", T0 + 300), &key, Outcome(2)),
            Err(EngineError::CantResolve)
        );
        assert_eq!(engine.governance_cancel(&at("dao", T0 + 300), &key), Err(EngineError::CantResolve));
    }

    #[test]
    fn governance_rejects_same_outcome() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        assert_eq!(
            engine.governance_resolve(&at("dao", T0 + 300), &key, Outcome(1)),
            Err(EngineError::SameSolutionAsProposed)
        );
    }

    #[test]
    fn governance_invalid_outcome_changes_nothing() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        let before = engine.snapshot();

        assert_eq!(
            engine.governance_resolve(&at("dao", T0 + 300), &key, Outcome(9)),
            Err(EngineError::IncorrectSolution(Outcome(9)))
        );
        let after = engine.snapshot();
        assert_eq!(before.conditions, after.conditions);
        assert_eq!(after.ledger.total(), TokenAmount::zero());
        assert_eq!(engine.audit().settlements_verified(), 0);
        assert_conserved(&engine);
    }

    #[test]
    fn approve_of_invalid_proposal_needs_cancel() {
        let mut engine = setup();
        let key = create(&mut engine);
        engine
            .oracle_propose(&at("oracle", T0 + 100), &key, Outcome(9))
            .expect("propose");
        engine.dispute(&at("disputer", T0 + 200), &key).expect("dispute");

        assert_eq!(
            engine.governance_approve(&at("dao", T0 + 300), &key),
            Err(EngineError::IncorrectSolution(Outcome(9)))
        );
        engine
            .governance_cancel(&at("dao", T0 + 300), &key)
            .expect("dao cancels");
        assert_eq!(engine.balance(&addr("disputer")), tokens(100));
        assert_eq!(engine.balance(&addr("dao")), tokens(50));
        assert_eq!(registry_view(&engine, &key).state, ConditionState::Canceled);
    }

    #[test]
    fn governance_closed_after_decision_deadline() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        let deadline = T0 + 200 + WINDOW + DECISION;
        assert_eq!(
            engine.governance_approve(&at("dao", deadline), &key),
            Err(EngineError::CantResolve)
        );
        engine
            .governance_approve(&at("dao", deadline - 1), &key)
            .expect("last second");
    }

    // ========== Timeout And Reconciliation ==========

    #[test]
    fn timeout_requires_proposal() {
        let mut engine = setup();
        let key = create(&mut engine);
        assert_eq!(
            engine.timeout_cancel(&at("keeper", T0 + 10 * DECISION), &key),
            Err(EngineError::CantCancel)
        );
    }

    #[test]
    fn undisputed_timeout_refunds_reporter() {
        let mut engine = setup();
        let key = proposed(&mut engine);
        let plan = engine
            .timeout_cancel(&at("keeper", T0 + 100 + WINDOW + DECISION), &key)
            .expect("timeout");
        assert_eq!(plan.payouts.len(), 1);
        assert_eq!(engine.balance(&addr("oracle")), tokens(100));
    }

    #[test]
    fn reconcile_requires_registry_cancellation() {
        let mut engine = setup();
        let key = create(&mut engine);
        assert_eq!(
            engine.handle_external_cancellation(&at("keeper", T0 + 10), &key),
            Err(EngineError::ConditionNotCanceled(key))
        );
    }

    // ========== Single Settlement ==========

    #[test]
    fn settled_record_refuses_every_path() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        engine
            .governance_resolve(&at("dao", T0 + 300), &key, Outcome(2))
            .expect("dao resolves");
        let done = Err(EngineError::ConditionAlreadyResolved(key.clone()));

        assert_eq!(engine.governance_resolve(&at("dao", T0 + 301), &key, Outcome(1)), done);
        assert_eq!(engine.governance_cancel(&at("dao", T0 + 301), &key), done);
        assert_eq!(engine.governance_approve(&at("dao", T0 + 301), &key), done);
        assert_eq!(engine.timeout_cancel(&at("keeper", T0 + 10 * DECISION), &key), done);
        assert_eq!(engine.handle_external_cancellation(&at("keeper", T0 + 301), &key), done);
        assert_eq!(
            engine.accept_proposal(&at("keeper", T0 + 100 + WINDOW), &key),
            Err(EngineError::ConditionAlreadyResolved(key.clone()))
        );

        let record = engine.condition(&key).expect("record");
        assert_eq!(record.paid_out(), record.escrowed);
        assert_eq!(engine.audit().settlements_verified(), 1);
    }

    // ========== Deadline Monotonicity ==========

    #[test]
    fn closed_windows_never_reopen() {
        let mut engine = setup();
        let key = create(&mut engine);
        for dt in [1, 60, 3_600, DECISION] {
            assert_eq!(
                engine.oracle_propose(&at("oracle", DEADLINE + dt), &key, Outcome(1)),
                Err(EngineError::CantPropose)
            );
        }

        let key = {
            let key = create_id(&mut engine, 2);
            engine
                .oracle_propose(&at("oracle", T0 + 100), &key, Outcome(1))
                .expect("propose");
            key
        };
        for dt in [0, 1, 3_600, DECISION] {
            assert_eq!(
                engine.dispute(&at("disputer", T0 + 100 + WINDOW + dt), &key),
                Err(EngineError::DisputeNotAllowed)
            );
        }
    }

    // ========== Parameter Snapshot Isolation ==========

    #[test]
    fn records_keep_their_parameters() {
        let mut engine = setup();
        let key = proposed(&mut engine);

        engine
            .change_insurance(&at("dao", T0 + 150), tokens(300))
            .expect("dao sets insurance");
        engine
            .change_dispute_period(&at("dao", T0 + 150), 60)
            .expect("dao sets window");

        // Old record: still 7200s window and a 50 stake.
        assert_eq!(
            engine.accept_proposal(&at("keeper", T0 + 100 + 60), &key),
            Err(EngineError::CantAcceptSolution)
        );
        engine.dispute(&at("disputer", T0 + 200), &key).expect("dispute");
        assert_eq!(engine.condition(&key).map(|r| r.escrowed), Some(tokens(150)));

        // New record: new parameters.
        let fresh = create_id(&mut engine, 2);
        let record = engine.condition(&fresh).expect("record");
        assert_eq!(record.insurance, tokens(300));
        assert_eq!(record.dispute_window, 60);
        assert_conserved(&engine);
    }

    // ========== Withdrawal And Ledger ==========

    #[test]
    fn withdraw_moves_tokens_out() {
        let mut engine = setup();
        let key = proposed(&mut engine);
        engine
            .accept_proposal(&at("keeper", T0 + 100 + WINDOW), &key)
            .expect("accept");

        engine.withdraw(&at("oracle", T0 + 8_000), tokens(40)).expect("withdraw");
        assert_eq!(engine.balance(&addr("oracle")), tokens(60));
        assert_eq!(engine.token().balance_of(&addr("oracle")), tokens(9_940));

        assert_eq!(
            engine.withdraw(&at("oracle", T0 + 8_000), tokens(61)),
            Err(EngineError::InsufficientBalance {
                available: tokens(60),
                requested: tokens(61),
            })
        );
        assert_eq!(
            engine.withdraw(&at("oracle", T0 + 8_000), TokenAmount::zero()),
            Err(EngineError::InvalidAmount(TokenAmount::zero()))
        );
        assert_conserved(&engine);
    }

    #[test]
    fn escrow_draws_on_ledger_first() {
        let mut engine = setup();
        let key = proposed(&mut engine);
        engine
            .accept_proposal(&at("keeper", T0 + 100 + WINDOW), &key)
            .expect("accept");
        let wallet = engine.token().balance_of(&addr("oracle"));

        engine
            .create_condition(
                &at("oracle", T0 + 8_000),
                &addr("core"),
                GameId(2),
                ConditionId(2),
                &ConditionParams::binary(1, 2),
                T0 + 9_000,
            )
            .expect("create from ledger balance");
        assert_eq!(engine.balance(&addr("oracle")), TokenAmount::zero());
        assert_eq!(engine.token().balance_of(&addr("oracle")), wallet);
        assert_conserved(&engine);
    }

    // ========== Governance Parameters ==========

    #[test]
    fn governance_parameter_guards() {
        let mut engine = setup();
        assert_eq!(
            engine.change_dispute_period(&at("dao", T0), 0),
            Err(EngineError::IncorrectDisputePeriod)
        );
        assert_eq!(
            engine.change_insurance(&at("oracle", T0), tokens(1)),
            Err(EngineError::OnlyDao(addr("oracle")))
        );
        assert_eq!(engine.params().dispute_window, WINDOW);
        assert_eq!(engine.decision_period(), DECISION);
    }

    #[test]
    fn ownership_transfer_moves_dao_rights() {
        let mut engine = setup();
        let key = disputed(&mut engine);
        engine
            .transfer_ownership(&at("dao", T0 + 250), addr("dao-2"))
            .expect("handover");
        assert_eq!(engine.dao(), &addr("dao-2"));
        assert_eq!(
            engine.governance_cancel(&at("dao", T0 + 300), &key),
            Err(EngineError::OnlyDao(addr("dao")))
        );
        engine
            .governance_cancel(&at("dao-2", T0 + 300), &key)
            .expect("new dao decides");
        assert_eq!(engine.balance(&addr("dao-2")), tokens(50));
    }

    // ========== Views And Events ==========

    #[test]
    fn events_follow_lifecycle() {
        let mut engine = setup();
        let key = proposed(&mut engine);
        engine
            .accept_proposal(&at("keeper", T0 + 100 + WINDOW), &key)
            .expect("accept");

        let events = engine.take_events();
        assert!(matches!(
            events.as_slice(),
            [
                EngineEvent::ConditionCreated { .. },
                EngineEvent::OutcomeProposed { .. },
                EngineEvent::ConditionSettled { path: SettlementPath::Accepted, .. },
            ]
        ));
        assert!(engine.take_events().is_empty());
    }

    #[test]
    fn snapshot_serializes() {
        let mut engine = setup();
        disputed(&mut engine);
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.outstanding_escrow, tokens(150));
        assert_eq!(snapshot.conditions.len(), 1);

        let json = serde_json::to_value(&snapshot).expect("serialize snapshot");
        assert_eq!(json["dao"], "dao");
        assert_eq!(json["decision_period"], DECISION);
        assert_eq!(json["conditions"][0]["stage"], "Disputed");
    }

    #[test]
    fn shared_engine_runs_operations() {
        let shared = SharedEngine::new(setup());
        let key = shared.with(|e| {
            let key = create(e);
            e.oracle_propose(&at("oracle", T0 + 100), &key, Outcome(1))
                .map(|_| key)
        });
        let key = key.expect("propose through handle");
        let accepted = shared.with(|e| e.accept_proposal(&at("keeper", T0 + 100 + WINDOW), &key));
        assert!(matches!(accepted, Ok(Acceptance::Accepted(_))));
        assert_eq!(shared.with(|e| e.balance(&addr("oracle"))), tokens(100));
    }
}
