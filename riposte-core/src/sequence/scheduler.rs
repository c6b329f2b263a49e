//! Fires sequence entries at their offsets and owns the spawned attacks.
//!
//! Completion waits on controller drain, not just timer exhaustion: the
//! `Completed` signal is emitted once, after every entry has fired and every
//! spawned controller has reached DONE.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::Sequence;
use crate::clock::{Scheduler, TimerHandle};
use crate::combat::{
    AttackPhaseController, CombatResolver, DefenseAction, EnemyId, IgnoreReason, InstanceId,
    PhaseStep, PhaseTimer, ResolutionRecord, SubmitOutcome,
};
use crate::engine::config::TimingConfig;
use crate::engine::events::CombatEvent;
use crate::error::ClockError;

/// Timer payload for one sequence entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceTimer {
    pub run: u32,
    pub index: usize,
}

/// What the owner must act on
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceSignal {
    /// An execution window closed with no input
    Resolved {
        attacker: EnemyId,
        record: ResolutionRecord,
    },
    /// Every entry fired and every attack drained
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceProgress {
    pub fired: usize,
    pub total: usize,
    pub live: usize,
    pub rejected: usize,
    /// Entries dropped because their enemy was defeated mid-run
    pub retired: usize,
    pub completed: bool,
}

#[derive(Debug)]
pub struct AttackSequenceScheduler {
    timing: TimingConfig,
    run: u32,
    sequence: Option<Sequence>,
    entry_timers: Vec<Option<TimerHandle>>,
    fired: usize,
    rejected: usize,
    retired_entries: usize,
    retired: BTreeSet<EnemyId>,
    controllers: BTreeMap<EnemyId, AttackPhaseController>,
    next_instance: InstanceId,
    active: bool,
    completed: bool,
}

impl AttackSequenceScheduler {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            timing: timing.clone(),
            run: 0,
            sequence: None,
            entry_timers: Vec::new(),
            fired: 0,
            rejected: 0,
            retired_entries: 0,
            retired: BTreeSet::new(),
            controllers: BTreeMap::new(),
            next_instance: 0,
            active: false,
            completed: false,
        }
    }

    /// Arm one timer per entry. Restarting while a run is live cancels it
    /// first. An empty sequence completes immediately.
    pub fn start<T, S>(
        &mut self,
        sequence: Sequence,
        timers: &mut S,
        events: &mut Vec<CombatEvent>,
    ) -> Result<Vec<SequenceSignal>, ClockError>
    where
        S: Scheduler<T> + ?Sized,
        T: From<PhaseTimer> + From<SequenceTimer>,
    {
        self.cancel(timers, events);

        self.run = self.run.wrapping_add(1);
        self.fired = 0;
        self.rejected = 0;
        self.retired_entries = 0;
        self.retired.clear();
        self.completed = false;
        self.active = true;
        self.entry_timers = Vec::with_capacity(sequence.entries.len());

        tracing::debug!(
            target: "riposte_core::sequence",
            round = sequence.round,
            pattern = sequence.pattern.as_str(),
            attacks = sequence.entries.len(),
            "sequence started"
        );

        for (index, entry) in sequence.entries.iter().enumerate() {
            let handle = timers.schedule_after(
                entry.delay_ms,
                T::from(SequenceTimer {
                    run: self.run,
                    index,
                }),
            )?;
            self.entry_timers.push(Some(handle));
        }
        self.sequence = Some(sequence);

        let mut signals = Vec::new();
        self.check_completion(&mut signals);
        Ok(signals)
    }

    /// An entry's offset elapsed: spawn its attack, or reject it if the
    /// attacker is still busy.
    pub fn on_entry_timer<T, S>(
        &mut self,
        timer: SequenceTimer,
        timers: &mut S,
        events: &mut Vec<CombatEvent>,
    ) -> Result<Vec<SequenceSignal>, ClockError>
    where
        S: Scheduler<T> + ?Sized,
        T: From<PhaseTimer> + From<SequenceTimer>,
    {
        let mut signals = Vec::new();
        if !self.active || timer.run != self.run {
            return Ok(signals);
        }
        let Some(slot) = self.entry_timers.get_mut(timer.index) else {
            return Ok(signals);
        };
        if slot.take().is_none() {
            return Ok(signals);
        }
        let Some(entry) = self
            .sequence
            .as_ref()
            .and_then(|s| s.entries.get(timer.index).copied())
        else {
            return Ok(signals);
        };
        self.fired += 1;
        let total = self.entry_timers.len();

        if self.retired.contains(&entry.enemy) {
            self.retired_entries += 1;
            tracing::debug!(
                target: "riposte_core::sequence",
                attacker = entry.enemy,
                index = timer.index,
                "entry for defeated enemy skipped"
            );
        } else if self.controllers.contains_key(&entry.enemy) {
            self.rejected += 1;
            tracing::warn!(
                target: "riposte_core::sequence",
                attacker = entry.enemy,
                index = timer.index,
                "attacker already has a live attack, spawn rejected"
            );
            events.push(CombatEvent::AttackRejected {
                attacker: entry.enemy,
                index: timer.index,
            });
        } else {
            let instance = self.next_instance;
            self.next_instance += 1;
            events.push(CombatEvent::AttackStarted {
                attacker: entry.enemy,
                attack_type: entry.attack_type,
                index: timer.index,
                total,
            });
            let controller = AttackPhaseController::spawn(
                instance,
                entry.enemy,
                entry.attack_type,
                timer.index,
                &self.timing,
                timers,
                events,
            )?;
            self.controllers.insert(entry.enemy, controller);
        }

        self.check_completion(&mut signals);
        Ok(signals)
    }

    /// Route a phase timer to its controller.
    pub fn on_phase_timer<T, S>(
        &mut self,
        timer: PhaseTimer,
        timers: &mut S,
        resolver: &CombatResolver,
        events: &mut Vec<CombatEvent>,
    ) -> Result<Vec<SequenceSignal>, ClockError>
    where
        S: Scheduler<T> + ?Sized,
        T: From<PhaseTimer> + From<SequenceTimer>,
    {
        let mut signals = Vec::new();
        let Some(controller) = self.controllers.get_mut(&timer.attacker) else {
            return Ok(signals);
        };
        if controller.instance().instance_id != timer.instance {
            return Ok(signals);
        }

        match controller.on_timer(timers, resolver, events)? {
            PhaseStep::Resolved(record) => signals.push(SequenceSignal::Resolved {
                attacker: timer.attacker,
                record,
            }),
            PhaseStep::Done => {
                self.controllers.remove(&timer.attacker);
                self.check_completion(&mut signals);
            }
            PhaseStep::Advanced(_) | PhaseStep::Stale => {}
        }
        Ok(signals)
    }

    /// Forward a defensive input to the attacker's live controller.
    pub fn submit<T, S>(
        &mut self,
        attacker: EnemyId,
        action: DefenseAction,
        timers: &mut S,
        resolver: &CombatResolver,
        events: &mut Vec<CombatEvent>,
    ) -> Result<SubmitOutcome, ClockError>
    where
        S: Scheduler<T> + ?Sized,
        T: From<PhaseTimer>,
    {
        match self.controllers.get_mut(&attacker) {
            Some(controller) => controller.submit(action, timers, resolver, events),
            None => Ok(SubmitOutcome::Ignored(IgnoreReason::NoActiveAttack)),
        }
    }

    /// Take a defeated enemy out of the current run. Its pending entries are
    /// cancelled and counted as fired so completion still arrives once. A
    /// live controller for it plays out its recovery.
    pub fn retire<T, S>(&mut self, enemy: EnemyId, timers: &mut S) -> Vec<SequenceSignal>
    where
        S: Scheduler<T> + ?Sized,
    {
        let mut signals = Vec::new();
        if !self.active || !self.retired.insert(enemy) {
            return signals;
        }
        let Some(sequence) = self.sequence.as_ref() else {
            return signals;
        };
        let mut dropped = 0;
        for (slot, entry) in self.entry_timers.iter_mut().zip(&sequence.entries) {
            if entry.enemy != enemy {
                continue;
            }
            if let Some(handle) = slot.take() {
                timers.cancel(handle);
                dropped += 1;
            }
        }
        self.fired += dropped;
        self.retired_entries += dropped;
        tracing::debug!(
            target: "riposte_core::sequence",
            enemy,
            dropped,
            "defeated enemy retired from sequence"
        );
        self.check_completion(&mut signals);
        signals
    }

    /// Clear every pending entry timer and live controller. No completion
    /// signal follows. Returns `false` if there was nothing to cancel.
    pub fn cancel<T, S>(&mut self, timers: &mut S, events: &mut Vec<CombatEvent>) -> bool
    where
        S: Scheduler<T> + ?Sized,
    {
        if !self.active && self.controllers.is_empty() {
            return false;
        }
        for handle in self.entry_timers.iter_mut().filter_map(Option::take) {
            timers.cancel(handle);
        }
        for controller in self.controllers.values_mut() {
            controller.cancel(timers, events);
        }
        self.controllers.clear();
        self.active = false;
        tracing::debug!(target: "riposte_core::sequence", run = self.run, "sequence cancelled");
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_attacking(&self, attacker: EnemyId) -> bool {
        self.controllers.contains_key(&attacker)
    }

    pub fn live_attackers(&self) -> Vec<EnemyId> {
        self.controllers.keys().copied().collect()
    }

    pub fn controller(&self, attacker: EnemyId) -> Option<&AttackPhaseController> {
        self.controllers.get(&attacker)
    }

    pub fn progress(&self) -> SequenceProgress {
        SequenceProgress {
            fired: self.fired,
            total: self.entry_timers.len(),
            live: self.controllers.len(),
            rejected: self.rejected,
            retired: self.retired_entries,
            completed: self.completed,
        }
    }

    fn check_completion(&mut self, signals: &mut Vec<SequenceSignal>) {
        if self.active
            && !self.completed
            && self.fired == self.entry_timers.len()
            && self.controllers.is_empty()
        {
            self.completed = true;
            self.active = false;
            tracing::debug!(
                target: "riposte_core::sequence",
                fired = self.fired,
                rejected = self.rejected,
                "sequence complete"
            );
            signals.push(SequenceSignal::Completed);
        }
    }
}
