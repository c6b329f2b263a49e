//! Edge case & boundary tests
//!
//! Tests behavior at system boundaries:
//! - Timing band edges for dodge and parry
//! - Inputs outside the execution window, duplicates, no-input actions
//! - Cancellation from every turn and phase
//! - Scripted sequence reusing a busy attacker
//! - Enemies defeated mid-sequence
//! - Config files (RON / JSON / unsupported / invalid / degenerate)
//! - Clock overflow turning into a fault

use std::collections::VecDeque;

use riposte_core::combat::{evaluate, AttackType, DefenseAction, EnemyId, TimingQuality};
use riposte_core::engine::{CombatEvent, EngineConfig};
use riposte_core::error::{ClockError, ConfigError, EngineError};
use riposte_core::turn::{PlayerAction, TurnOrchestrator, TurnState};

// ============================================================
// Helpers
// ============================================================

// Default timeline: enemy turn at 5800, attacker 0 executes 7300..9300,
// attacker 1 executes 10300..12300, feint executes 13300..15300.
const ENEMY_TURN_AT: u64 = 5800;
const FIRST_WINDOW_AT: u64 = 7300;
const SECOND_WINDOW_AT: u64 = 10_300;

fn started() -> TurnOrchestrator {
    let mut orch = TurnOrchestrator::new(EngineConfig::default()).unwrap();
    orch.start_round().unwrap();
    orch
}

fn resolutions(events: &[CombatEvent]) -> Vec<(EnemyId, riposte_core::combat::ResolutionRecord)> {
    events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::AttackResolved { attacker, record } => Some((*attacker, record.clone())),
            _ => None,
        })
        .collect()
}

// ============================================================
// 1. Timing band edges
// ============================================================

#[test]
fn test_dodge_band_edges() {
    assert_eq!(evaluate(-50, 100, 250, 2000), TimingQuality::Perfect);
    assert_eq!(evaluate(0, 100, 250, 2000), TimingQuality::Perfect);
    assert_eq!(evaluate(100, 100, 250, 2000), TimingQuality::Perfect);
    assert_eq!(evaluate(101, 100, 250, 2000), TimingQuality::Good);
    assert_eq!(evaluate(250, 100, 250, 2000), TimingQuality::Good);
    assert_eq!(evaluate(251, 100, 250, 2000), TimingQuality::Late);
    assert_eq!(evaluate(2000, 100, 250, 2000), TimingQuality::Late);
    assert_eq!(evaluate(2001, 100, 250, 2000), TimingQuality::Miss);
    assert_eq!(evaluate(i64::MAX, 100, 250, 2000), TimingQuality::Miss);
}

#[test]
fn test_parry_band_edges_in_game() {
    for (latency, quality) in [
        (60, TimingQuality::Perfect),
        (61, TimingQuality::Good),
        (150, TimingQuality::Good),
        (151, TimingQuality::Late),
    ] {
        let mut orch = started();
        orch.advance_to(SECOND_WINDOW_AT + latency).unwrap();
        orch.drain_events();
        assert!(orch.submit_defense_action(1, DefenseAction::Parry).unwrap());
        let resolved = resolutions(&orch.drain_events());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].1.quality, quality, "latency {}", latency);
        assert_eq!(resolved[0].1.latency_ms, Some(latency));
    }
}

#[test]
fn test_last_millisecond_is_late_window_end_is_timeout() {
    let mut orch = started();
    orch.advance_to(FIRST_WINDOW_AT + 1999).unwrap();
    orch.drain_events();
    assert!(orch.submit_defense_action(0, DefenseAction::Dodge).unwrap());
    let late = resolutions(&orch.drain_events());
    assert_eq!(late[0].1.quality, TimingQuality::Late);
    assert_eq!(late[0].1.health_delta, -20);

    let mut orch = started();
    orch.advance_to(FIRST_WINDOW_AT + 2000).unwrap();
    let timed_out = resolutions(&orch.drain_events());
    assert_eq!(timed_out.len(), 1);
    assert_eq!(timed_out[0].1.quality, TimingQuality::Miss);
    assert_eq!(timed_out[0].1.latency_ms, None);
    // The timeout already resolved this attack
    assert!(!orch.submit_defense_action(0, DefenseAction::Dodge).unwrap());
}

// ============================================================
// 2. Ignored inputs
// ============================================================

#[test]
fn test_input_during_preparation_is_ignored() {
    let mut orch = started();
    orch.advance_to(ENEMY_TURN_AT + 100).unwrap();
    assert!(!orch.submit_defense_action(0, DefenseAction::Dodge).unwrap());
    orch.advance_to(FIRST_WINDOW_AT + 100).unwrap();
    assert!(orch.submit_defense_action(0, DefenseAction::Dodge).unwrap());
    let resolved = resolutions(&orch.drain_events());
    assert_eq!(resolved[0].1.quality, TimingQuality::Perfect);
}

#[test]
fn test_input_during_recovery_is_ignored() {
    let mut orch = started();
    orch.advance_to(FIRST_WINDOW_AT + 2100).unwrap();
    assert!(!orch.submit_defense_action(0, DefenseAction::Dodge).unwrap());
}

#[test]
fn test_no_input_action_and_unknown_ids_are_ignored() {
    let mut orch = started();
    orch.advance_to(FIRST_WINDOW_AT + 30).unwrap();
    assert!(!orch.submit_defense_action(0, DefenseAction::None).unwrap());
    assert!(!orch.submit_defense_action_id(0, 0).unwrap());
    assert!(!orch.submit_defense_action_id(0, 77).unwrap());
    // Parry (id 2) on a normal attack is answered, but wrongly
    assert!(orch.submit_defense_action_id(0, 2).unwrap());
    let resolved = resolutions(&orch.drain_events());
    assert_eq!(resolved[0].1.quality, TimingQuality::WrongAction);
    assert!(!orch.submit_defense_action_id(0, 1).unwrap());
}

#[test]
fn test_input_for_idle_attacker_is_ignored() {
    let mut orch = started();
    orch.advance_to(FIRST_WINDOW_AT + 30).unwrap();
    assert!(!orch.submit_defense_action(2, DefenseAction::Dodge).unwrap());
    assert!(!orch.submit_defense_action(99, DefenseAction::Dodge).unwrap());
}

#[test]
fn test_player_action_rejections() {
    let mut orch = started();
    assert!(!orch.submit_player_turn_action(PlayerAction::Heal, None).unwrap());
    assert!(!orch.submit_player_turn_action(PlayerAction::Attack, None).unwrap());
    assert!(!orch.submit_player_turn_action(PlayerAction::Attack, Some(7)).unwrap());
    assert_eq!(orch.turn_state(), TurnState::PlayerTurn);
    assert!(orch.submit_player_turn_action(PlayerAction::Attack, Some(2)).unwrap());
    assert!(!orch.submit_player_turn_action(PlayerAction::Defend, None).unwrap());
}

#[test]
fn test_zero_advance_is_noop() {
    let mut orch = started();
    orch.drain_events();
    orch.advance(0).unwrap();
    assert_eq!(orch.now(), 0);
    assert!(orch.drain_events().is_empty());
}

// ============================================================
// 3. Cancellation points
// ============================================================

#[test]
fn test_cancel_at_every_stage() {
    // player turn, transition, preparation, execution, recovery + preparation
    for at in [100, 5400, ENEMY_TURN_AT + 200, FIRST_WINDOW_AT + 100, FIRST_WINDOW_AT + 2100] {
        let mut orch = started();
        orch.advance_to(at).unwrap();
        orch.drain_events();
        let live = orch.snapshot().active_attackers;
        let before = orch.state().clone();

        assert!(orch.cancel(), "cancel at {}", at);
        assert!(!orch.cancel());
        assert_eq!(orch.turn_state(), TurnState::Cancelled);

        let events = orch.drain_events();
        let cancelled: Vec<EnemyId> = events
            .iter()
            .filter_map(|e| match e {
                CombatEvent::AttackCancelled { attacker } => Some(*attacker),
                _ => None,
            })
            .collect();
        assert_eq!(cancelled, live, "cancel at {}", at);
        assert!(resolutions(&events).is_empty());

        orch.advance(60_000).unwrap();
        assert_eq!(orch.state(), &before);
        assert!(orch.drain_events().is_empty());
        assert!(!orch.submit_defense_action(0, DefenseAction::Dodge).unwrap());
        assert!(!orch.start_round().unwrap());
    }
}

#[test]
fn test_cancel_after_game_over_is_noop() {
    let mut config = EngineConfig::default();
    config.player.max_health = 20;
    let mut orch = TurnOrchestrator::new(config).unwrap();
    orch.start_round().unwrap();
    orch.advance_to(FIRST_WINDOW_AT + 2000).unwrap();
    assert_eq!(orch.turn_state(), TurnState::GameOver);
    assert!(!orch.cancel());
    assert_eq!(orch.turn_state(), TurnState::GameOver);
}

// ============================================================
// 4. Scripted sequences
// ============================================================

#[test]
fn test_basic_round_rejects_busy_attacker() {
    let mut orch = started();
    // Round 2 enemy turn runs 22400..32400
    orch.advance_to(40_000).unwrap();
    let events = orch.drain_events();

    assert!(events.contains(&CombatEvent::AttackRejected {
        attacker: 0,
        index: 1
    }));
    assert!(events.contains(&CombatEvent::RoundEnded { round: 2 }));

    let round_two_start = events
        .iter()
        .position(|e| *e == CombatEvent::RoundStarted { round: 2 })
        .unwrap();
    let round_two = resolutions(&events[round_two_start..]);
    assert_eq!(round_two.len(), 3);
    // Tutorial: normal + heavy, basic: normal + heavy + normal
    assert_eq!(orch.state().player_health, 250 - 70 - 90);
}

#[test]
fn test_defeated_enemy_leaves_later_sequences() {
    let config = EngineConfig {
        enemy_max_health: 25,
        ..Default::default()
    };
    let mut orch = TurnOrchestrator::new(config).unwrap();
    orch.start_round().unwrap();
    orch.advance_to(SECOND_WINDOW_AT + 40).unwrap();
    assert!(orch.submit_defense_action(1, DefenseAction::Parry).unwrap());
    let events = orch.drain_events();
    assert!(events.contains(&CombatEvent::EnemyDefeated { enemy: 1 }));
    assert!(!orch.state().is_enemy_alive(1));

    orch.advance_to(40_000).unwrap();
    let later = orch.drain_events();
    assert!(later.contains(&CombatEvent::RoundEnded { round: 2 }));
    assert!(!later.iter().any(|e| matches!(
        e,
        CombatEvent::AttackStarted { attacker: 1, .. }
    )));
}

#[test]
fn test_enemy_killed_mid_sequence_stops_attacking() {
    let mut config = EngineConfig {
        enemy_count: 2,
        enemy_max_health: 25,
        ..Default::default()
    };
    config.player.max_health = 100_000;
    config.player.turns_enabled = false;
    let mut orch = TurnOrchestrator::new(config).unwrap();
    orch.start_round().unwrap();

    // Round 7 plays the defensive pattern: enemy 0 heavy, enemy 1 heavy,
    // enemy 0 normal, enemy 1 heavy. Only enemy 0's round-7 heavy is parried.
    let mut log: Vec<CombatEvent> = Vec::new();
    let mut defeated_at = None;
    let mut round = 0;
    while round < 9 && !orch.is_finished() {
        let Some(deadline) = orch.next_deadline() else {
            break;
        };
        orch.advance_to(deadline).unwrap();
        let mut queue: VecDeque<CombatEvent> = orch.drain_events().into();
        while let Some(event) = queue.pop_front() {
            match &event {
                CombatEvent::RoundStarted { round: r } => round = *r,
                CombatEvent::ExecutionWindowOpened {
                    attacker,
                    attack_type,
                } => {
                    let action = match attack_type {
                        AttackType::Normal => Some(DefenseAction::Dodge),
                        AttackType::Heavy if round == 7 && *attacker == 0 => Some(DefenseAction::Parry),
                        _ => None,
                    };
                    if let Some(action) = action {
                        orch.advance(40).unwrap();
                        assert!(orch.submit_defense_action(*attacker, action).unwrap());
                        queue.extend(orch.drain_events());
                    }
                }
                CombatEvent::EnemyDefeated { enemy: 0 } => defeated_at = Some(log.len()),
                _ => {}
            }
            log.push(event);
        }
    }

    let defeated_at = defeated_at.expect("enemy 0 should fall in round 7");
    assert_eq!(round, 9);
    assert!(!orch.state().is_enemy_alive(0));
    assert!(orch.state().is_enemy_alive(1));

    let after = &log[defeated_at..];
    assert!(!after.iter().any(|e| matches!(
        e,
        CombatEvent::AttackStarted { attacker: 0, .. }
            | CombatEvent::AttackResolved { attacker: 0, .. }
            | CombatEvent::AttackRejected { attacker: 0, .. }
    )));
    // Enemy 1 keeps attacking and round 7 still ends exactly once
    assert!(after
        .iter()
        .any(|e| matches!(e, CombatEvent::AttackStarted { attacker: 1, .. })));
    assert_eq!(
        after
            .iter()
            .filter(|e| **e == CombatEvent::RoundEnded { round: 7 })
            .count(),
        1
    );
    assert!(after.contains(&CombatEvent::RoundStarted { round: 8 }));
}

#[test]
fn test_feint_held_scores_without_input() {
    let mut orch = started();
    orch.advance_to(15_300).unwrap();
    let resolved = resolutions(&orch.drain_events());
    let feint = resolved.last().unwrap();
    assert_eq!(feint.0, 2);
    assert_eq!(feint.1.attack_type, AttackType::Feint);
    assert!(feint.1.success);
    assert_eq!(orch.state().combo_count, 1);
}

// ============================================================
// 5. Config files
// ============================================================

#[test]
fn test_load_ron_and_json_files() {
    let dir = tempfile::tempdir().unwrap();

    let ron_path = dir.path().join("engine.ron");
    std::fs::write(&ron_path, "(seed: 7, timing: (perfect_window_ms: 80))").unwrap();
    let ron_config = EngineConfig::load(&ron_path).unwrap();
    assert_eq!(ron_config.seed, 7);
    assert_eq!(ron_config.timing.perfect_window_ms, 80);
    assert_eq!(ron_config.timing.good_window_ms, 250);
    assert!(TurnOrchestrator::new(ron_config).is_ok());

    let json_path = dir.path().join("engine.json");
    std::fs::write(&json_path, r#"{"enemy_count": 2, "player": {"max_health": 100}}"#).unwrap();
    let json_config = EngineConfig::load(&json_path).unwrap();
    assert_eq!(json_config.enemy_count, 2);
    assert_eq!(json_config.player.max_health, 100);
    let orch = TurnOrchestrator::new(json_config).unwrap();
    assert_eq!(orch.state().enemy_healths.len(), 2);
}

#[test]
fn test_unsupported_and_missing_config_files() {
    let dir = tempfile::tempdir().unwrap();
    let toml_path = dir.path().join("engine.toml");
    std::fs::write(&toml_path, "seed = 1").unwrap();
    assert!(matches!(EngineConfig::load(&toml_path), Err(ConfigError::Invalid(_))));
    assert!(matches!(
        EngineConfig::load(dir.path().join("absent.ron")),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn test_degenerate_configs_rejected() {
    let no_health = EngineConfig {
        enemy_max_health: 0,
        ..Default::default()
    };
    assert!(matches!(
        TurnOrchestrator::new(no_health).err(),
        Some(EngineError::Config(ConfigError::Invalid(_)))
    ));

    let mut instant_transition = EngineConfig::default();
    instant_transition.player.turns_enabled = false;
    instant_transition.timing.transition_ms = 0;
    assert!(matches!(
        TurnOrchestrator::new(instant_transition).err(),
        Some(EngineError::Config(ConfigError::Invalid(_)))
    ));

    let mut instant_player_turn = EngineConfig::default();
    instant_player_turn.timing.player_turn_ms = 0;
    assert!(TurnOrchestrator::new(instant_player_turn).is_err());

    let json = r#"{"enemy_max_health": 0}"#;
    assert!(matches!(EngineConfig::from_json_str(json), Err(ConfigError::Invalid(_))));
}

#[test]
fn test_invalid_config_rejected_by_orchestrator() {
    let mut config = EngineConfig::default();
    config.timing.perfect_window_ms = 300;
    let err = TurnOrchestrator::new(config).err().unwrap();
    assert!(matches!(err, EngineError::Config(ConfigError::Invalid(_))));
}

// ============================================================
// 6. Clock faults
// ============================================================

#[test]
fn test_deadline_overflow_faults_engine() {
    let mut config = EngineConfig::default();
    config.timing.player_turn_ms = u64::MAX / 2;
    let mut orch = TurnOrchestrator::new(config).unwrap();
    orch.start_round().unwrap();

    // Round 2's player turn timer no longer fits on the clock
    let err = orch.advance(u64::MAX / 2 + 20_000).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Clock(ClockError::DeadlineOverflow { .. })
    ));
    assert_eq!(orch.turn_state(), TurnState::Faulted);
    assert_eq!(orch.snapshot().pending_timers, 0);
    assert!(matches!(orch.start_round(), Err(EngineError::Faulted)));
    assert!(!orch.cancel());
}
