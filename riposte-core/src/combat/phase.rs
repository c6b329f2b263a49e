//! Per-attack state machine: PREPARATION → EXECUTION → RECOVERY → done.
//!
//! The controller owns exactly one armed timer at a time. The orchestrator
//! routes that timer back through [`AttackPhaseController::on_timer`]; the
//! controller never waits on its own.

use serde::{Deserialize, Serialize};

use super::resolver::{CombatResolver, ResolutionRecord};
use super::timing::TimingWindows;
use super::{AttackPhase, AttackType, DefenseAction, EnemyId};
use crate::clock::{Millis, Scheduler, TimerHandle};
use crate::engine::config::TimingConfig;
use crate::engine::events::CombatEvent;
use crate::error::ClockError;

/// Unique id of one spawned attack, never reused within an orchestrator
pub type InstanceId = u64;

/// Timer payload addressing one controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseTimer {
    pub attacker: EnemyId,
    pub instance: InstanceId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackInstance {
    pub instance_id: InstanceId,
    pub attacker: EnemyId,
    pub attack_type: AttackType,
    pub phase: AttackPhase,
    pub phase_start: Millis,
    /// Index of the sequence entry that spawned this attack
    pub sequence_id: usize,
}

/// Result of routing a phase timer to its controller
#[derive(Debug, Clone, PartialEq)]
pub enum PhaseStep {
    /// Moved to the next phase, nothing to apply
    Advanced(AttackPhase),
    /// Execution window elapsed without input
    Resolved(ResolutionRecord),
    /// Recovery finished; the attacker is free
    Done,
    /// Timer arrived for a finished controller
    Stale,
}

/// Why a defensive input was not evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IgnoreReason {
    /// `DefenseAction::None` is not an input event
    NoInput,
    /// Input arrived during preparation or recovery
    OutsideExecution(AttackPhase),
    Finished,
    /// No live attack for that attacker
    NoActiveAttack,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Resolved(ResolutionRecord),
    Ignored(IgnoreReason),
}

#[derive(Debug)]
pub struct AttackPhaseController {
    instance: AttackInstance,
    timing: TimingConfig,
    timer: Option<TimerHandle>,
    done: bool,
}

impl AttackPhaseController {
    /// Create the controller and enter PREPARATION.
    pub fn spawn<T, S>(
        instance_id: InstanceId,
        attacker: EnemyId,
        attack_type: AttackType,
        sequence_id: usize,
        timing: &TimingConfig,
        timers: &mut S,
        events: &mut Vec<CombatEvent>,
    ) -> Result<Self, ClockError>
    where
        S: Scheduler<T> + ?Sized,
        T: From<PhaseTimer>,
    {
        let mut controller = Self {
            instance: AttackInstance {
                instance_id,
                attacker,
                attack_type,
                phase: AttackPhase::Preparation,
                phase_start: timers.now(),
                sequence_id,
            },
            timing: timing.clone(),
            timer: None,
            done: false,
        };
        controller.enter(AttackPhase::Preparation, timers, events)?;
        Ok(controller)
    }

    pub fn instance(&self) -> &AttackInstance {
        &self.instance
    }

    pub fn attacker(&self) -> EnemyId {
        self.instance.attacker
    }

    /// Current phase, `None` once done or cancelled
    pub fn phase(&self) -> Option<AttackPhase> {
        (!self.done).then_some(self.instance.phase)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// Handle expiry of the current phase timer.
    pub fn on_timer<T, S>(
        &mut self,
        timers: &mut S,
        resolver: &CombatResolver,
        events: &mut Vec<CombatEvent>,
    ) -> Result<PhaseStep, ClockError>
    where
        S: Scheduler<T> + ?Sized,
        T: From<PhaseTimer>,
    {
        if self.done {
            return Ok(PhaseStep::Stale);
        }
        self.timer = None;

        let current = self.instance.phase;
        // Silence for the whole window: a miss, or a read feint
        let silent = (current == AttackPhase::Execution).then(|| {
            let attack_type = self.instance.attack_type;
            resolver.resolve(
                attack_type,
                attack_type.expected_defense(),
                DefenseAction::None,
                None,
            )
        });

        match current.next() {
            Some(next) => {
                self.enter(next, timers, events)?;
                Ok(match silent {
                    Some(record) => PhaseStep::Resolved(record),
                    None => PhaseStep::Advanced(next),
                })
            }
            None => {
                self.done = true;
                tracing::debug!(
                    target: "riposte_core::combat",
                    attacker = self.instance.attacker,
                    instance = self.instance.instance_id,
                    "attack complete"
                );
                events.push(CombatEvent::AttackCompleted {
                    attacker: self.instance.attacker,
                });
                Ok(PhaseStep::Done)
            }
        }
    }

    /// Evaluate a defensive input. Only the first input inside EXECUTION
    /// counts; the controller moves to RECOVERY immediately after it.
    pub fn submit<T, S>(
        &mut self,
        action: DefenseAction,
        timers: &mut S,
        resolver: &CombatResolver,
        events: &mut Vec<CombatEvent>,
    ) -> Result<SubmitOutcome, ClockError>
    where
        S: Scheduler<T> + ?Sized,
        T: From<PhaseTimer>,
    {
        if action == DefenseAction::None {
            return Ok(SubmitOutcome::Ignored(IgnoreReason::NoInput));
        }
        if self.done {
            return Ok(SubmitOutcome::Ignored(IgnoreReason::Finished));
        }
        if self.instance.phase != AttackPhase::Execution {
            return Ok(SubmitOutcome::Ignored(IgnoreReason::OutsideExecution(
                self.instance.phase,
            )));
        }

        let latency = timers.now().saturating_sub(self.instance.phase_start);
        let graded = TimingWindows::for_action(&self.timing, action).grade(latency);
        let attack_type = self.instance.attack_type;
        let mut record = resolver.resolve(
            attack_type,
            attack_type.expected_defense(),
            action,
            Some(graded.quality),
        );
        record.latency_ms = Some(latency);

        if let Some(handle) = self.timer.take() {
            timers.cancel(handle);
        }
        self.enter(AttackPhase::Recovery, timers, events)?;
        Ok(SubmitOutcome::Resolved(record))
    }

    /// Tear down from any phase without producing a resolution. Returns
    /// `false` if already done.
    pub fn cancel<T, S>(&mut self, timers: &mut S, events: &mut Vec<CombatEvent>) -> bool
    where
        S: Scheduler<T> + ?Sized,
    {
        if self.done {
            return false;
        }
        if let Some(handle) = self.timer.take() {
            timers.cancel(handle);
        }
        self.done = true;
        tracing::debug!(
            target: "riposte_core::combat",
            attacker = self.instance.attacker,
            phase = self.instance.phase.as_str(),
            "attack cancelled"
        );
        events.push(CombatEvent::AttackCancelled {
            attacker: self.instance.attacker,
        });
        true
    }

    fn enter<T, S>(
        &mut self,
        phase: AttackPhase,
        timers: &mut S,
        events: &mut Vec<CombatEvent>,
    ) -> Result<(), ClockError>
    where
        S: Scheduler<T> + ?Sized,
        T: From<PhaseTimer>,
    {
        let duration = match phase {
            AttackPhase::Preparation => self.timing.preparation_ms,
            AttackPhase::Execution => self.timing.execution_ms,
            AttackPhase::Recovery => self.timing.recovery_ms,
        };
        let handle = timers.schedule_after(
            duration,
            T::from(PhaseTimer {
                attacker: self.instance.attacker,
                instance: self.instance.instance_id,
            }),
        )?;

        self.instance.phase = phase;
        self.instance.phase_start = timers.now();
        self.timer = Some(handle);

        tracing::debug!(
            target: "riposte_core::combat",
            attacker = self.instance.attacker,
            phase = phase.as_str(),
            attack_type = self.instance.attack_type.as_str(),
            "phase transition"
        );
        let attacker = self.instance.attacker;
        let attack_type = self.instance.attack_type;
        events.push(CombatEvent::PhaseChanged {
            attacker,
            phase,
            attack_type,
        });
        if phase == AttackPhase::Execution {
            events.push(CombatEvent::ExecutionWindowOpened {
                attacker,
                attack_type,
            });
        }
        Ok(())
    }
}
