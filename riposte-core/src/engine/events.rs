//! Host-facing event surface.
//!
//! The orchestrator appends [`CombatEvent`]s to an outbox in emission order.
//! A host either drains the outbox and matches on the enum, or routes each
//! event through a [`CombatObserver`].

use serde::{Deserialize, Serialize};

use crate::combat::{AttackPhase, AttackType, EnemyId, PlayerActionOutcome, ResolutionRecord};
use crate::turn::TurnKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatEvent {
    RoundStarted {
        round: u32,
    },
    RoundEnded {
        round: u32,
    },
    TurnChanged {
        turn: TurnKind,
        round: u32,
    },
    PhaseChanged {
        attacker: EnemyId,
        phase: AttackPhase,
        attack_type: AttackType,
    },
    /// Host should enable defensive input for this attacker
    ExecutionWindowOpened {
        attacker: EnemyId,
        attack_type: AttackType,
    },
    AttackStarted {
        attacker: EnemyId,
        attack_type: AttackType,
        index: usize,
        total: usize,
    },
    /// Spawn refused because the attacker already has a live attack
    AttackRejected {
        attacker: EnemyId,
        index: usize,
    },
    AttackResolved {
        attacker: EnemyId,
        record: ResolutionRecord,
    },
    AttackCompleted {
        attacker: EnemyId,
    },
    AttackCancelled {
        attacker: EnemyId,
    },
    PlayerActionResolved {
        outcome: PlayerActionOutcome,
    },
    EnemyDefeated {
        enemy: EnemyId,
    },
    GameOver {
        final_score: u64,
    },
    Victory {
        final_score: u64,
    },
    Faulted {
        reason: String,
    },
}

impl CombatEvent {
    /// Terminal events end the game; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::GameOver { .. } | Self::Victory { .. } | Self::Faulted { .. }
        )
    }

    /// Route to the matching observer callback, then to `on_event`.
    pub fn dispatch(&self, observer: &mut dyn CombatObserver) {
        match self {
            Self::PhaseChanged {
                attacker,
                phase,
                attack_type,
            } => observer.on_phase_change(*attacker, *phase, *attack_type),
            Self::ExecutionWindowOpened {
                attacker,
                attack_type,
            } => observer.on_execution_window_open(*attacker, *attack_type),
            Self::AttackResolved { attacker, record } => observer.on_attack_resolved(*attacker, record),
            Self::RoundStarted { round } => observer.on_round_start(*round),
            Self::RoundEnded { round } => observer.on_round_end(*round),
            Self::GameOver { final_score } => observer.on_game_over(*final_score),
            _ => {}
        }
        observer.on_event(self);
    }
}

/// Callback surface for hosts. Every method defaults to a no-op.
pub trait CombatObserver {
    fn on_phase_change(&mut self, _attacker: EnemyId, _phase: AttackPhase, _attack_type: AttackType) {}
    fn on_execution_window_open(&mut self, _attacker: EnemyId, _attack_type: AttackType) {}
    fn on_attack_resolved(&mut self, _attacker: EnemyId, _record: &ResolutionRecord) {}
    fn on_round_start(&mut self, _round: u32) {}
    fn on_round_end(&mut self, _round: u32) {}
    fn on_game_over(&mut self, _final_score: u64) {}
    fn on_event(&mut self, _event: &CombatEvent) {}
}

/// Dispatch a batch of drained events in order.
pub fn dispatch_all(events: &[CombatEvent], observer: &mut dyn CombatObserver) {
    for event in events {
        event.dispatch(observer);
    }
}
