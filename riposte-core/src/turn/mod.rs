//! Turn orchestration.
//!
//! [`TurnOrchestrator`] is the single owner of the clock, combat state and
//! every timed component. It alternates PLAYER_TURN / TRANSITION /
//! ENEMY_TURN, applies resolutions in arrival order, and stops for good on
//! game over, victory, host cancellation or a clock fault.
//!
//! The host drives it with `advance`/`advance_to` and feeds input through
//! `submit_defense_action` / `submit_player_turn_action`. Output is the
//! event outbox (`drain_events`) plus `snapshot()`.

use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

pub mod player;

use crate::analytics::{PerformanceStats, PerformanceTracker};
use crate::clock::{Millis, Scheduler, TimerHandle, TimerQueue};
use crate::combat::{
    CombatResolver, CombatState, DefenseAction, EnemyId, PhaseTimer, ResolutionModifiers,
    ResolutionRecord, SubmitOutcome,
};
use crate::engine::config::EngineConfig;
use crate::engine::events::CombatEvent;
use crate::error::{ClockError, EngineError};
use crate::sequence::{
    AttackSequenceScheduler, RoundGenerator, Sequence, SequenceProgress, SequenceSignal,
    SequenceTimer,
};

pub use player::PlayerAction;

/// Non-terminal turn kinds, as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnKind {
    PlayerTurn,
    EnemyTurn,
    Transition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnState {
    /// Created, `start_round` not called yet
    Idle,
    PlayerTurn,
    EnemyTurn,
    Transition { next: TurnKind },
    GameOver,
    Victory,
    /// Torn down by the host
    Cancelled,
    /// Clock failure; every timer was discarded
    Faulted,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::GameOver | Self::Victory | Self::Cancelled | Self::Faulted
        )
    }

    pub fn kind(&self) -> Option<TurnKind> {
        match self {
            Self::PlayerTurn => Some(TurnKind::PlayerTurn),
            Self::EnemyTurn => Some(TurnKind::EnemyTurn),
            Self::Transition { .. } => Some(TurnKind::Transition),
            _ => None,
        }
    }
}

/// Payload of every timer the orchestrator arms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineTimer {
    Phase(PhaseTimer),
    SequenceEntry(SequenceTimer),
    TransitionDone,
    PlayerTurnTimeout,
    PlayerActionSettled,
}

impl From<PhaseTimer> for EngineTimer {
    fn from(timer: PhaseTimer) -> Self {
        Self::Phase(timer)
    }
}

impl From<SequenceTimer> for EngineTimer {
    fn from(timer: SequenceTimer) -> Self {
        Self::SequenceEntry(timer)
    }
}

/// Per-round bookkeeping. Exists from round start to round end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundContext {
    pub round: u32,
    pub sequence: Option<Sequence>,
    pub active_attacks: BTreeSet<EnemyId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSnapshot {
    pub turn: TurnState,
    pub round: u32,
    pub turn_number: u32,
    pub now_ms: Millis,
    pub combat: CombatState,
    pub active_attackers: Vec<EnemyId>,
    pub sequence: SequenceProgress,
    pub pending_timers: usize,
    pub guard_active: bool,
    pub performance: PerformanceStats,
}

pub struct TurnOrchestrator {
    config: EngineConfig,
    timers: TimerQueue<EngineTimer>,
    resolver: CombatResolver,
    generator: RoundGenerator,
    scheduler: AttackSequenceScheduler,
    state: CombatState,
    tracker: PerformanceTracker,
    context: Option<RoundContext>,
    turn: TurnState,
    round: u32,
    turn_number: u32,
    turn_timer: Option<TimerHandle>,
    player_acted: bool,
    guard: bool,
    outbox: Vec<CombatEvent>,
}

impl TurnOrchestrator {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            timers: TimerQueue::new(config.max_pending_timers),
            resolver: CombatResolver::new(&config),
            generator: RoundGenerator::new(&config),
            scheduler: AttackSequenceScheduler::new(&config.timing),
            state: CombatState::new(&config),
            tracker: PerformanceTracker::new(),
            context: None,
            turn: TurnState::Idle,
            round: 0,
            turn_number: 0,
            turn_timer: None,
            player_acted: false,
            guard: false,
            outbox: Vec::new(),
            config,
        })
    }

    // =====================================================
    // Host API
    // =====================================================

    /// Begin round 1. Returns `false` if the game already started.
    pub fn start_round(&mut self) -> Result<bool, EngineError> {
        self.ensure_not_faulted()?;
        if self.turn != TurnState::Idle {
            return Ok(false);
        }
        self.round = 1;
        let result = self.begin_round();
        self.guard_clock(result)?;
        Ok(true)
    }

    /// Defensive input for `attacker`'s live attack. `false` means the input
    /// was ignored (no live attack, outside EXECUTION, already answered, or
    /// `DefenseAction::None`).
    pub fn submit_defense_action(
        &mut self,
        attacker: EnemyId,
        action: DefenseAction,
    ) -> Result<bool, EngineError> {
        self.ensure_not_faulted()?;
        if self.turn != TurnState::EnemyTurn {
            tracing::debug!(
                target: "riposte_core::turn",
                attacker,
                action = action.as_str(),
                "defense input outside enemy turn ignored"
            );
            return Ok(false);
        }

        let outcome = self.scheduler.submit(
            attacker,
            action,
            &mut self.timers,
            &self.resolver,
            &mut self.outbox,
        );
        match self.guard_clock(outcome)? {
            SubmitOutcome::Resolved(record) => {
                let follow_up = self.apply_resolution(attacker, record);
                let handled = self.handle_signals(follow_up);
                self.guard_clock(handled)?;
                self.sync_active_attacks();
                Ok(true)
            }
            SubmitOutcome::Ignored(reason) => {
                tracing::debug!(
                    target: "riposte_core::turn",
                    attacker,
                    action = action.as_str(),
                    ?reason,
                    "defense input ignored"
                );
                Ok(false)
            }
        }
    }

    /// Defensive input by raw action id (0 none, 1 dodge, 2 parry). Unknown
    /// ids are ignored.
    pub fn submit_defense_action_id(&mut self, attacker: EnemyId, action_id: u32) -> Result<bool, EngineError> {
        match DefenseAction::from_id(action_id) {
            Some(action) => self.submit_defense_action(attacker, action),
            None => {
                self.ensure_not_faulted()?;
                tracing::debug!(target: "riposte_core::turn", action_id, "unknown defense action id");
                Ok(false)
            }
        }
    }

    /// Player-turn choice. One per turn; rejected actions leave the turn open.
    pub fn submit_player_turn_action(
        &mut self,
        action: PlayerAction,
        target: Option<EnemyId>,
    ) -> Result<bool, EngineError> {
        self.ensure_not_faulted()?;
        if self.turn != TurnState::PlayerTurn || self.player_acted {
            return Ok(false);
        }

        let outcome = self.resolver.resolve_player_action(action, target, &self.state);
        if !outcome.success {
            tracing::debug!(
                target: "riposte_core::turn",
                action = action.as_str(),
                reason = %outcome.message,
                "player action rejected"
            );
            return Ok(false);
        }

        self.player_acted = true;
        let defeated = self.state.apply_player_outcome(&outcome);
        if outcome.guard {
            self.guard = true;
        }
        tracing::info!(
            target: "riposte_core::turn",
            round = self.round,
            action = action.as_str(),
            message = %outcome.message,
            "player action"
        );
        self.outbox.push(CombatEvent::PlayerActionResolved { outcome });

        if let Some(enemy) = defeated {
            self.outbox.push(CombatEvent::EnemyDefeated { enemy });
            if self.state.all_enemies_defeated() {
                self.finish(TurnState::Victory);
                return Ok(true);
            }
        }

        self.cancel_turn_timer();
        let armed = self.arm_turn_timer(
            self.config.timing.player_action_settle_ms,
            EngineTimer::PlayerActionSettled,
        );
        self.guard_clock(armed)?;
        Ok(true)
    }

    /// Tear everything down. Idempotent; returns `false` if already stopped.
    pub fn cancel(&mut self) -> bool {
        if self.turn.is_terminal() {
            return false;
        }
        tracing::info!(target: "riposte_core::turn", round = self.round, "orchestrator cancelled");
        self.stop_everything();
        self.turn = TurnState::Cancelled;
        true
    }

    /// Move the clock forward by `delta` ms, firing every timer due on the way.
    pub fn advance(&mut self, delta: Millis) -> Result<(), EngineError> {
        let target = self.timers.now().saturating_add(delta);
        self.advance_to(target)
    }

    /// Move the clock to `target`, firing due timers one at a time in
    /// deadline order. The clock reads each timer's deadline while it fires.
    pub fn advance_to(&mut self, target: Millis) -> Result<(), EngineError> {
        self.ensure_not_faulted()?;
        while !self.turn.is_terminal() {
            match self.timers.next_deadline() {
                Some(deadline) if deadline <= target => {
                    self.timers.advance_to(deadline);
                    while let Some((_, payload)) = self.timers.pop_due() {
                        let result = self.dispatch_timer(payload);
                        self.guard_clock(result)?;
                        if self.turn.is_terminal() {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        self.timers.advance_to(target);
        Ok(())
    }

    /// Take every event emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.outbox)
    }

    // =====================================================
    // Queries
    // =====================================================

    pub fn now(&self) -> Millis {
        self.timers.now()
    }

    /// Earliest armed timer, if any
    pub fn next_deadline(&mut self) -> Option<Millis> {
        self.timers.next_deadline()
    }

    pub fn turn_state(&self) -> TurnState {
        self.turn
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_finished(&self) -> bool {
        self.turn.is_terminal()
    }

    pub fn state(&self) -> &CombatState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn performance(&self) -> &PerformanceTracker {
        &self.tracker
    }

    pub fn round_context(&self) -> Option<&RoundContext> {
        self.context.as_ref()
    }

    pub fn sequence_progress(&self) -> SequenceProgress {
        self.scheduler.progress()
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        OrchestratorSnapshot {
            turn: self.turn,
            round: self.round,
            turn_number: self.turn_number,
            now_ms: self.timers.now(),
            combat: self.state.clone(),
            active_attackers: self.scheduler.live_attackers(),
            sequence: self.scheduler.progress(),
            pending_timers: self.timers.pending(),
            guard_active: self.guard,
            performance: self.tracker.stats(),
        }
    }

    // =====================================================
    // Turn flow
    // =====================================================

    fn begin_round(&mut self) -> Result<(), ClockError> {
        if self.state.all_enemies_defeated() {
            self.finish(TurnState::Victory);
            return Ok(());
        }
        self.context = Some(RoundContext {
            round: self.round,
            sequence: None,
            active_attacks: BTreeSet::new(),
        });
        tracing::info!(target: "riposte_core::turn", round = self.round, "round started");
        self.outbox.push(CombatEvent::RoundStarted { round: self.round });

        if self.config.player.turns_enabled {
            self.enter_player_turn()
        } else {
            self.enter_enemy_turn()
        }
    }

    fn enter_player_turn(&mut self) -> Result<(), ClockError> {
        self.set_turn(TurnState::PlayerTurn);
        self.player_acted = false;
        self.arm_turn_timer(self.config.timing.player_turn_ms, EngineTimer::PlayerTurnTimeout)
    }

    fn enter_enemy_turn(&mut self) -> Result<(), ClockError> {
        self.set_turn(TurnState::EnemyTurn);

        let living = self.state.living_enemies();
        let sequence = self.generator.generate_for(self.round, &living);
        if let Some(context) = self.context.as_mut() {
            context.sequence = Some(sequence.clone());
        }
        let signals = self
            .scheduler
            .start(sequence, &mut self.timers, &mut self.outbox)?;
        self.handle_signals(signals)
    }

    fn enter_transition(&mut self, next: TurnKind) -> Result<(), ClockError> {
        self.set_turn(TurnState::Transition { next });
        self.arm_turn_timer(self.config.timing.transition_ms, EngineTimer::TransitionDone)
    }

    fn end_enemy_turn(&mut self) -> Result<(), ClockError> {
        if let Some(context) = self.context.take() {
            if !context.active_attacks.is_empty() {
                tracing::warn!(
                    target: "riposte_core::turn",
                    round = context.round,
                    live = context.active_attacks.len(),
                    "round ended with live attacks"
                );
            }
        }
        self.guard = false;
        tracing::info!(
            target: "riposte_core::turn",
            round = self.round,
            health = self.state.player_health,
            score = self.state.score,
            "round ended"
        );
        self.outbox.push(CombatEvent::RoundEnded { round: self.round });

        let next = if self.config.player.turns_enabled {
            TurnKind::PlayerTurn
        } else {
            TurnKind::EnemyTurn
        };
        self.enter_transition(next)
    }

    fn on_transition_done(&mut self, next: TurnKind) -> Result<(), ClockError> {
        if self.context.is_none() {
            self.round += 1;
            return self.begin_round();
        }
        match next {
            TurnKind::EnemyTurn => self.enter_enemy_turn(),
            TurnKind::PlayerTurn => self.enter_player_turn(),
            TurnKind::Transition => Ok(()),
        }
    }

    fn dispatch_timer(&mut self, payload: EngineTimer) -> Result<(), ClockError> {
        match payload {
            EngineTimer::Phase(timer) => {
                let signals = self.scheduler.on_phase_timer(
                    timer,
                    &mut self.timers,
                    &self.resolver,
                    &mut self.outbox,
                )?;
                self.handle_signals(signals)?;
            }
            EngineTimer::SequenceEntry(timer) => {
                let signals =
                    self.scheduler
                        .on_entry_timer(timer, &mut self.timers, &mut self.outbox)?;
                self.handle_signals(signals)?;
            }
            EngineTimer::TransitionDone => {
                self.turn_timer = None;
                if let TurnState::Transition { next } = self.turn {
                    self.on_transition_done(next)?;
                }
            }
            EngineTimer::PlayerTurnTimeout => {
                self.turn_timer = None;
                if self.turn == TurnState::PlayerTurn {
                    tracing::debug!(target: "riposte_core::turn", round = self.round, "player turn timed out");
                    self.enter_transition(TurnKind::EnemyTurn)?;
                }
            }
            EngineTimer::PlayerActionSettled => {
                self.turn_timer = None;
                if self.turn == TurnState::PlayerTurn {
                    self.enter_transition(TurnKind::EnemyTurn)?;
                }
            }
        }
        self.sync_active_attacks();
        Ok(())
    }

    fn handle_signals(&mut self, signals: Vec<SequenceSignal>) -> Result<(), ClockError> {
        let mut queue = VecDeque::from(signals);
        while let Some(signal) = queue.pop_front() {
            if self.turn.is_terminal() {
                break;
            }
            match signal {
                SequenceSignal::Resolved { attacker, record } => {
                    queue.extend(self.apply_resolution(attacker, record));
                }
                SequenceSignal::Completed => {
                    if self.turn == TurnState::EnemyTurn {
                        self.end_enemy_turn()?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Finalize and apply one resolution, then check for game end. A kill
    /// retires the enemy from the running sequence; the returned signals
    /// come from that.
    fn apply_resolution(&mut self, attacker: EnemyId, record: ResolutionRecord) -> Vec<SequenceSignal> {
        let modifiers = ResolutionModifiers {
            combo: self.state.combo_count,
            guard: self.guard,
        };
        let record = self.resolver.finalize(record, &modifiers);
        self.tracker.record(&record);
        let defeated = self.state.apply_resolution(&record, attacker);

        tracing::debug!(
            target: "riposte_core::combat",
            attacker,
            success = record.success,
            quality = record.quality.as_str(),
            score_delta = record.score_delta,
            health_delta = record.health_delta,
            "attack resolved"
        );
        self.outbox.push(CombatEvent::AttackResolved { attacker, record });

        if let Some(enemy) = defeated {
            self.outbox.push(CombatEvent::EnemyDefeated { enemy });
        }
        if self.state.is_game_over() {
            self.finish(TurnState::GameOver);
        } else if self.state.all_enemies_defeated() {
            self.finish(TurnState::Victory);
        } else if let Some(enemy) = defeated {
            return self.scheduler.retire(enemy, &mut self.timers);
        }
        Vec::new()
    }

    /// Enter a terminal outcome, discarding every timer.
    fn finish(&mut self, outcome: TurnState) {
        self.stop_everything();
        self.turn = outcome;
        let final_score = self.state.score;
        tracing::info!(
            target: "riposte_core::turn",
            round = self.round,
            final_score,
            outcome = ?outcome,
            "game finished"
        );
        match outcome {
            TurnState::Victory => self.outbox.push(CombatEvent::Victory { final_score }),
            _ => self.outbox.push(CombatEvent::GameOver { final_score }),
        }
    }

    fn stop_everything(&mut self) {
        self.scheduler.cancel(&mut self.timers, &mut self.outbox);
        self.cancel_turn_timer();
        self.timers.clear();
        if let Some(context) = self.context.as_mut() {
            context.active_attacks.clear();
        }
    }

    /// Turn a clock failure into the faulted terminal state.
    fn guard_clock<V>(&mut self, result: Result<V, ClockError>) -> Result<V, EngineError> {
        result.map_err(|err| {
            tracing::error!(target: "riposte_core::turn", error = %err, "clock failure, engine faulted");
            self.stop_everything();
            self.turn = TurnState::Faulted;
            self.outbox.push(CombatEvent::Faulted {
                reason: err.to_string(),
            });
            EngineError::Clock(err)
        })
    }

    fn ensure_not_faulted(&self) -> Result<(), EngineError> {
        if self.turn == TurnState::Faulted {
            Err(EngineError::Faulted)
        } else {
            Ok(())
        }
    }

    fn set_turn(&mut self, turn: TurnState) {
        self.turn = turn;
        if let Some(kind) = turn.kind() {
            self.turn_number += 1;
            tracing::debug!(target: "riposte_core::turn", round = self.round, ?kind, "turn changed");
            self.outbox.push(CombatEvent::TurnChanged {
                turn: kind,
                round: self.round,
            });
        }
    }

    fn arm_turn_timer(&mut self, delay: Millis, payload: EngineTimer) -> Result<(), ClockError> {
        let handle = self.timers.schedule_after(delay, payload)?;
        self.turn_timer = Some(handle);
        Ok(())
    }

    fn cancel_turn_timer(&mut self) {
        if let Some(handle) = self.turn_timer.take() {
            self.timers.cancel(handle);
        }
    }

    fn sync_active_attacks(&mut self) {
        if let Some(context) = self.context.as_mut() {
            context.active_attacks = self.scheduler.live_attackers().into_iter().collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{AttackPhase, AttackType};

    fn orchestrator() -> TurnOrchestrator {
        TurnOrchestrator::new(EngineConfig::default()).unwrap()
    }

    /// Advance until the next execution window opens; returns the attacker.
    fn next_window(orch: &mut TurnOrchestrator) -> Option<(EnemyId, AttackType)> {
        for _ in 0..10_000 {
            let deadline = orch.next_deadline()?;
            orch.advance_to(deadline).unwrap();
            for event in orch.drain_events() {
                if let CombatEvent::ExecutionWindowOpened {
                    attacker,
                    attack_type,
                } = event
                {
                    return Some((attacker, attack_type));
                }
            }
        }
        None
    }

    #[test]
    fn test_start_enters_player_turn() {
        let mut orch = orchestrator();
        assert!(orch.start_round().unwrap());
        assert!(!orch.start_round().unwrap());
        assert_eq!(orch.turn_state(), TurnState::PlayerTurn);
        assert_eq!(orch.round(), 1);
        let events = orch.drain_events();
        assert_eq!(events[0], CombatEvent::RoundStarted { round: 1 });
        assert!(matches!(
            events[1],
            CombatEvent::TurnChanged {
                turn: TurnKind::PlayerTurn,
                round: 1
            }
        ));
    }

    #[test]
    fn test_player_turn_timeout_leads_to_enemy_turn() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        orch.advance(5000).unwrap();
        assert_eq!(
            orch.turn_state(),
            TurnState::Transition {
                next: TurnKind::EnemyTurn
            }
        );
        orch.advance(800).unwrap();
        assert_eq!(orch.turn_state(), TurnState::EnemyTurn);
        assert!(orch.round_context().unwrap().sequence.is_some());
    }

    #[test]
    fn test_defense_ignored_outside_enemy_turn() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        assert!(!orch.submit_defense_action(0, DefenseAction::Dodge).unwrap());
    }

    #[test]
    fn test_perfect_dodge_applies_score() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        let (attacker, attack_type) = next_window(&mut orch).unwrap();
        assert_eq!(attack_type, AttackType::Normal);
        orch.advance(50).unwrap();
        assert!(orch
            .submit_defense_action(attacker, DefenseAction::Dodge)
            .unwrap());
        assert_eq!(orch.state().score, 100);
        assert_eq!(orch.state().combo_count, 1);
        // Second input for the same attack is ignored
        assert!(!orch
            .submit_defense_action(attacker, DefenseAction::Dodge)
            .unwrap());
    }

    #[test]
    fn test_unknown_action_id_ignored() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        let (attacker, _) = next_window(&mut orch).unwrap();
        assert!(!orch.submit_defense_action_id(attacker, 9).unwrap());
        assert!(orch.submit_defense_action_id(attacker, 1).unwrap());
    }

    #[test]
    fn test_round_advances_after_enemy_turn() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        // Player turn 5000 + transition 800 + tutorial 6000 + attack 4000
        orch.advance(15_800).unwrap();
        let events = orch.drain_events();
        assert!(events.contains(&CombatEvent::RoundEnded { round: 1 }));
        orch.advance(800).unwrap();
        assert_eq!(orch.round(), 2);
        assert_eq!(orch.turn_state(), TurnState::PlayerTurn);
        assert!(orch.drain_events().contains(&CombatEvent::RoundStarted { round: 2 }));
    }

    #[test]
    fn test_tutorial_timeouts_damage_player() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        orch.advance(15_800).unwrap();
        // Normal + heavy missed, feint held
        assert_eq!(orch.state().player_health, 250 - 20 - 50);
        assert_eq!(orch.performance().total_actions(), 3);
    }

    #[test]
    fn test_defend_halves_enemy_damage() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        assert!(orch
            .submit_player_turn_action(PlayerAction::Defend, None)
            .unwrap());
        assert!(!orch
            .submit_player_turn_action(PlayerAction::Defend, None)
            .unwrap());
        orch.advance(20_000).unwrap();
        assert_eq!(orch.state().player_health, 250 - 10 - 25);
    }

    #[test]
    fn test_player_action_shortens_turn() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        orch.submit_player_turn_action(PlayerAction::Attack, Some(0))
            .unwrap();
        orch.advance(1000).unwrap();
        assert!(matches!(orch.turn_state(), TurnState::Transition { .. }));
        assert_eq!(orch.state().enemy_healths[0], 30);
    }

    #[test]
    fn test_heal_at_full_health_keeps_turn_open() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        assert!(!orch
            .submit_player_turn_action(PlayerAction::Heal, None)
            .unwrap());
        assert!(orch
            .submit_player_turn_action(PlayerAction::Attack, Some(1))
            .unwrap());
    }

    #[test]
    fn test_cancel_is_terminal_and_idempotent() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        orch.advance(7000).unwrap();
        assert!(orch.cancel());
        assert!(!orch.cancel());
        assert_eq!(orch.snapshot().pending_timers, 0);
        let health = orch.state().player_health;
        orch.advance(100_000).unwrap();
        assert_eq!(orch.state().player_health, health);
    }

    #[test]
    fn test_game_over_halts_everything() {
        let config = EngineConfig {
            player: crate::engine::config::PlayerConfig {
                max_health: 60,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut orch = TurnOrchestrator::new(config).unwrap();
        orch.start_round().unwrap();
        orch.advance(1_000_000).unwrap();
        assert_eq!(orch.turn_state(), TurnState::GameOver);
        assert_eq!(orch.state().player_health, 0);
        let events = orch.drain_events();
        let last = events.last().unwrap();
        assert!(matches!(last, CombatEvent::GameOver { .. }));
        assert_eq!(orch.snapshot().pending_timers, 0);
    }

    #[test]
    fn test_clock_fault_is_terminal() {
        let config = EngineConfig {
            max_pending_timers: 2,
            ..Default::default()
        };
        let mut orch = TurnOrchestrator::new(config).unwrap();
        orch.start_round().unwrap();
        // Enemy turn arms three entry timers at once
        let err = orch.advance(10_000).unwrap_err();
        assert!(matches!(err, EngineError::Clock(ClockError::CapacityExceeded { .. })));
        assert_eq!(orch.turn_state(), TurnState::Faulted);
        assert!(matches!(orch.advance(1), Err(EngineError::Faulted)));
        assert!(matches!(
            orch.submit_defense_action(0, DefenseAction::Dodge),
            Err(EngineError::Faulted)
        ));
        assert!(orch
            .drain_events()
            .iter()
            .any(|e| matches!(e, CombatEvent::Faulted { .. })));
    }

    #[test]
    fn test_turns_disabled_goes_straight_to_enemy_turn() {
        let mut config = EngineConfig::default();
        config.player.turns_enabled = false;
        let mut orch = TurnOrchestrator::new(config).unwrap();
        orch.start_round().unwrap();
        assert_eq!(orch.turn_state(), TurnState::EnemyTurn);
        assert!(!orch
            .submit_player_turn_action(PlayerAction::Defend, None)
            .unwrap());
    }

    #[test]
    fn test_phase_events_in_order() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        orch.advance(5800 + 4000).unwrap();
        let phases: Vec<AttackPhase> = orch
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                CombatEvent::PhaseChanged {
                    attacker: 0, phase, ..
                } => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                AttackPhase::Preparation,
                AttackPhase::Execution,
                AttackPhase::Recovery
            ]
        );
    }

    #[test]
    fn test_snapshot_serializes() {
        let mut orch = orchestrator();
        orch.start_round().unwrap();
        orch.advance(6000).unwrap();
        let snapshot = orch.snapshot();
        assert_eq!(snapshot.turn, TurnState::EnemyTurn);
        assert_eq!(snapshot.active_attackers, vec![0]);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("EnemyTurn"));
    }

    #[test]
    fn test_round_with_empty_roster_is_victory() {
        let mut orch = orchestrator();
        orch.state.enemy_healths.iter_mut().for_each(|h| *h = 0);
        assert!(orch.start_round().unwrap());
        assert_eq!(orch.turn_state(), TurnState::Victory);
        assert_eq!(orch.timers.pending(), 0);
        let events = orch.drain_events();
        assert_eq!(events, vec![CombatEvent::Victory { final_score: 0 }]);
        // Nothing left to run
        orch.advance(1_000_000).unwrap();
        assert_eq!(orch.round(), 1);
        assert!(orch.drain_events().is_empty());
    }
}
