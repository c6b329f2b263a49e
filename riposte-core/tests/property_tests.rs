//! Property-based tests using proptest
//!
//! Tests invariants that must hold for ALL inputs:
//! - Timing evaluation: total, monotonic in latency
//! - Resolution: feint rules, wrong action always fails, perfect scores highest
//! - Combo multiplier: bounded and non-decreasing
//! - Sequences: completion signalled exactly once, generator bounds
//! - Orchestrator: cancellation never mutates state, same seed same stream

use proptest::prelude::*;

use riposte_core::clock::TimerQueue;
use riposte_core::combat::{
    evaluate, AttackType, CombatResolver, DefenseAction, TimingQuality,
};
use riposte_core::engine::{CombatEvent, EngineConfig};
use riposte_core::sequence::{
    AttackSequenceScheduler, RoundGenerator, Sequence, SequenceEntry, SequenceSignal,
};
use riposte_core::turn::{EngineTimer, TurnOrchestrator};

fn resolver() -> CombatResolver {
    CombatResolver::new(&EngineConfig::default())
}

fn any_action() -> impl Strategy<Value = DefenseAction> {
    prop_oneof![
        Just(DefenseAction::None),
        Just(DefenseAction::Dodge),
        Just(DefenseAction::Parry),
    ]
}

fn any_timing() -> impl Strategy<Value = Option<TimingQuality>> {
    prop_oneof![
        Just(None),
        Just(Some(TimingQuality::Perfect)),
        Just(Some(TimingQuality::Good)),
        Just(Some(TimingQuality::Late)),
        Just(Some(TimingQuality::Miss)),
        Just(Some(TimingQuality::WrongAction)),
    ]
}

fn real_attack() -> impl Strategy<Value = AttackType> {
    prop_oneof![Just(AttackType::Normal), Just(AttackType::Heavy)]
}

fn any_attack() -> impl Strategy<Value = AttackType> {
    prop_oneof![
        Just(AttackType::Normal),
        Just(AttackType::Heavy),
        Just(AttackType::Feint),
    ]
}

// ============================================================
// Timing & Resolution Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_evaluate_is_total_and_monotonic(
        perfect in 0u64..500,
        good_extra in 0u64..500,
        total_extra in 0u64..3000,
        a in -1000i64..10_000,
        b in -1000i64..10_000,
    ) {
        let good = perfect + good_extra;
        let total = good + total_extra;
        let (early, late) = if a <= b { (a, b) } else { (b, a) };
        let q_early = evaluate(early, perfect, good, total);
        let q_late = evaluate(late, perfect, good, total);
        prop_assert_ne!(q_early, TimingQuality::WrongAction);
        prop_assert_ne!(q_late, TimingQuality::WrongAction);
        prop_assert!(q_early.rank() >= q_late.rank(), "{early}ms {q_early:?} vs {late}ms {q_late:?}");
    }

    #[test]
    fn prop_feint_only_rewards_stillness(action in any_action(), timing in any_timing()) {
        let record = resolver().resolve(AttackType::Feint, AttackType::Feint.expected_defense(), action, timing);
        if action == DefenseAction::None {
            prop_assert!(record.success);
            prop_assert_eq!(record.quality, TimingQuality::Perfect);
            prop_assert_eq!(record.health_delta, 0);
        } else {
            prop_assert!(!record.success);
            prop_assert_eq!(record.quality, TimingQuality::WrongAction);
            prop_assert_eq!(record.health_delta, -10);
        }
        prop_assert_eq!(record.counter_damage, 0);
    }

    #[test]
    fn prop_wrong_action_always_fails(attack in real_attack(), timing in any_timing()) {
        let expected = attack.expected_defense();
        let wrong = if expected == DefenseAction::Dodge { DefenseAction::Parry } else { DefenseAction::Dodge };
        let r = resolver();
        let record = r.resolve(attack, expected, wrong, timing);
        prop_assert!(!record.success);
        prop_assert_eq!(record.quality, TimingQuality::WrongAction);
        prop_assert_eq!(record.health_delta, -(r.damage_for(attack) as i32));
        prop_assert!(record.score_delta < 0);
    }

    #[test]
    fn prop_perfect_scores_highest(attack in real_attack(), timing in any_timing()) {
        let expected = attack.expected_defense();
        let r = resolver();
        let perfect = r.resolve(attack, expected, expected, Some(TimingQuality::Perfect));
        let other = r.resolve(attack, expected, expected, timing);
        prop_assert!(perfect.success);
        prop_assert!(perfect.score_delta >= other.score_delta);
    }

    #[test]
    fn prop_failures_never_heal(attack in any_attack(), action in any_action(), timing in any_timing()) {
        let record = resolver().resolve(attack, attack.expected_defense(), action, timing);
        if record.success {
            prop_assert_eq!(record.health_delta, 0);
            prop_assert!(record.score_delta > 0);
        } else {
            prop_assert!(record.health_delta < 0);
            prop_assert_eq!(record.counter_damage, 0);
        }
    }

    #[test]
    fn prop_combo_multiplier_bounded(combo in 0u32..10_000) {
        let r = resolver();
        let m = r.combo_multiplier(combo);
        prop_assert!((1.0..=3.0).contains(&m));
        prop_assert!(m <= r.combo_multiplier(combo + 1));
    }
}

// ============================================================
// Sequence Properties
// ============================================================

fn entry_strategy() -> impl Strategy<Value = SequenceEntry> {
    (0usize..3, any_attack(), 0u64..10_000).prop_map(|(enemy, attack_type, delay_ms)| SequenceEntry {
        enemy,
        attack_type,
        delay_ms,
    })
}

/// Run a sequence to the end with no player input; returns all signals.
fn run_unanswered(entries: Vec<SequenceEntry>) -> (Vec<SequenceSignal>, AttackSequenceScheduler) {
    let config = EngineConfig::default();
    let resolver = CombatResolver::new(&config);
    let mut timers: TimerQueue<EngineTimer> = TimerQueue::new(64);
    let mut scheduler = AttackSequenceScheduler::new(&config.timing);
    let mut events: Vec<CombatEvent> = Vec::new();
    let mut signals = scheduler
        .start(Sequence::custom(entries), &mut timers, &mut events)
        .unwrap();

    while let Some(deadline) = timers.next_deadline() {
        timers.advance_to(deadline);
        while let Some((_, payload)) = timers.pop_due() {
            let next = match payload {
                EngineTimer::SequenceEntry(t) => scheduler.on_entry_timer(t, &mut timers, &mut events).unwrap(),
                EngineTimer::Phase(t) => scheduler
                    .on_phase_timer(t, &mut timers, &resolver, &mut events)
                    .unwrap(),
                _ => Vec::new(),
            };
            signals.extend(next);
        }
    }
    (signals, scheduler)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_sequence_completes_exactly_once(entries in prop::collection::vec(entry_strategy(), 0..8)) {
        let total = entries.len();
        let (signals, scheduler) = run_unanswered(entries);
        let completions = signals.iter().filter(|s| matches!(s, SequenceSignal::Completed)).count();
        let resolved = signals.iter().filter(|s| matches!(s, SequenceSignal::Resolved { .. })).count();
        let progress = scheduler.progress();

        prop_assert_eq!(completions, 1);
        prop_assert!(matches!(signals.last(), Some(SequenceSignal::Completed)));
        prop_assert_eq!(progress.fired, total);
        prop_assert_eq!(progress.live, 0);
        prop_assert_eq!(resolved + progress.rejected, total);
    }

    #[test]
    fn prop_generated_sequences_respect_bounds(seed in any::<u64>(), round in 3u32..200, living in 1usize..=3) {
        let config = EngineConfig { seed, ..Default::default() };
        let mut generator = RoundGenerator::new(&config);
        let roster: Vec<usize> = (0..living).collect();
        let sequence = generator.generate_for(round, &roster);

        prop_assert!(!sequence.is_empty());
        prop_assert!(sequence.len() <= config.difficulty.max_attacks_per_round);
        for pair in sequence.entries.windows(2) {
            prop_assert!(pair[0].delay_ms <= pair[1].delay_ms);
            if living > 1 {
                prop_assert_ne!(pair[0].enemy, pair[1].enemy);
            }
        }
        prop_assert!(sequence.entries.iter().all(|e| e.enemy < living));
    }

    #[test]
    fn prop_generated_sequences_are_never_rejected(seed in any::<u64>(), round in 3u32..120) {
        let config = EngineConfig { seed, ..Default::default() };
        let mut generator = RoundGenerator::new(&config);
        let sequence = generator.generate(round, 3);
        let (_, scheduler) = run_unanswered(sequence.entries);
        prop_assert_eq!(scheduler.progress().rejected, 0);
    }
}

// ============================================================
// Orchestrator Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_cancel_never_mutates_state(cancel_at in 0u64..40_000, extra in 1u64..100_000) {
        let mut orch = TurnOrchestrator::new(EngineConfig::default()).unwrap();
        orch.start_round().unwrap();
        orch.advance_to(cancel_at).unwrap();
        let before = orch.state().clone();
        let was_running = !orch.is_finished();

        prop_assert_eq!(orch.cancel(), was_running);
        orch.drain_events();
        orch.advance(extra).unwrap();

        prop_assert_eq!(orch.state(), &before);
        prop_assert_eq!(orch.snapshot().pending_timers, 0);
        let no_attack_resolved = orch
            .drain_events()
            .iter()
            .all(|e| !matches!(e, CombatEvent::AttackResolved { .. }));
        prop_assert!(no_attack_resolved);
    }

    #[test]
    fn prop_same_seed_same_event_stream(seed in any::<u64>(), until in 0u64..80_000) {
        let config = EngineConfig { seed, ..Default::default() };
        let mut a = TurnOrchestrator::new(config.clone()).unwrap();
        let mut b = TurnOrchestrator::new(config).unwrap();
        a.start_round().unwrap();
        b.start_round().unwrap();
        a.advance_to(until).unwrap();
        b.advance_to(until).unwrap();
        prop_assert_eq!(a.drain_events(), b.drain_events());
        prop_assert_eq!(a.snapshot(), b.snapshot());
    }
}
