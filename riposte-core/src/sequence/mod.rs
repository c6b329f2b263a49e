//! Attack sequences: what enemies do during one enemy turn.
//!
//! - `generator`: builds a [`Sequence`] per round (scripted, milestone, procedural)
//! - `scheduler`: fires each entry at its offset and drives the spawned attacks

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::combat::{AttackType, EnemyId};

pub mod generator;
pub mod scheduler;

pub use generator::RoundGenerator;
pub use scheduler::{AttackSequenceScheduler, SequenceProgress, SequenceSignal, SequenceTimer};

/// One scheduled attack, `delay_ms` after sequence start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub enemy: EnemyId,
    pub attack_type: AttackType,
    pub delay_ms: Millis,
}

/// How a round's sequence was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    Tutorial,
    Basic,
    Rapid,
    Defensive,
    Deceptive,
    Beginner,
    Intermediate,
    Advanced,
    Custom,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tutorial => "tutorial",
            Self::Basic => "basic",
            Self::Rapid => "rapid",
            Self::Defensive => "defensive",
            Self::Deceptive => "deceptive",
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub round: u32,
    pub pattern: PatternKind,
    pub entries: Vec<SequenceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStats {
    pub total_attacks: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_enemy: BTreeMap<EnemyId, usize>,
    /// Offset of the last entry
    pub span_ms: Millis,
}

impl Sequence {
    /// Hand-built sequence, e.g. for tests or host-authored encounters
    pub fn custom(entries: Vec<SequenceEntry>) -> Self {
        Self {
            round: 0,
            pattern: PatternKind::Custom,
            entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> SequenceStats {
        let mut by_type = BTreeMap::new();
        let mut by_enemy = BTreeMap::new();
        for entry in &self.entries {
            *by_type.entry(entry.attack_type.as_str().to_string()).or_insert(0) += 1;
            *by_enemy.entry(entry.enemy).or_insert(0) += 1;
        }
        SequenceStats {
            total_attacks: self.entries.len(),
            by_type,
            by_enemy,
            span_ms: self.entries.iter().map(|e| e.delay_ms).max().unwrap_or(0),
        }
    }
}

// =====================================================
// Hand-authored tables
// =====================================================

const fn entry(enemy: EnemyId, attack_type: AttackType, delay_ms: Millis) -> SequenceEntry {
    SequenceEntry {
        enemy,
        attack_type,
        delay_ms,
    }
}

/// Round 1: one of each type, well spaced
pub const TUTORIAL_SEQUENCE: [SequenceEntry; 3] = [
    entry(0, AttackType::Normal, 0),
    entry(1, AttackType::Heavy, 3000),
    entry(2, AttackType::Feint, 6000),
];

/// Round 2. Enemy 0 attacks twice in quick succession; the second swing
/// is rejected while the first is still live.
pub const BASIC_SEQUENCE: [SequenceEntry; 4] = [
    entry(0, AttackType::Normal, 0),
    entry(0, AttackType::Normal, 2000),
    entry(1, AttackType::Heavy, 4000),
    entry(2, AttackType::Normal, 6000),
];

/// Milestone patterns as (enemy, type); timing comes from round pacing
pub const RAPID_PATTERN: [(EnemyId, AttackType); 5] = [
    (0, AttackType::Normal),
    (1, AttackType::Normal),
    (2, AttackType::Heavy),
    (0, AttackType::Normal),
    (1, AttackType::Feint),
];

pub const DEFENSIVE_PATTERN: [(EnemyId, AttackType); 4] = [
    (0, AttackType::Heavy),
    (1, AttackType::Heavy),
    (2, AttackType::Normal),
    (0, AttackType::Heavy),
];

pub const DECEPTIVE_PATTERN: [(EnemyId, AttackType); 5] = [
    (0, AttackType::Feint),
    (1, AttackType::Normal),
    (2, AttackType::Feint),
    (1, AttackType::Feint),
    (0, AttackType::Heavy),
];
