use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use super::{
    PatternKind, Sequence, SequenceEntry, BASIC_SEQUENCE, DECEPTIVE_PATTERN, DEFENSIVE_PATTERN,
    RAPID_PATTERN, TUTORIAL_SEQUENCE,
};
use crate::clock::Millis;
use crate::combat::{AttackType, EnemyId};
use crate::engine::config::{DifficultyConfig, EngineConfig};

/// Attack-type weights (normal, heavy, feint) per procedural tier
const BEGINNER_WEIGHTS: [u32; 3] = [70, 25, 5];
const INTERMEDIATE_WEIGHTS: [u32; 3] = [50, 35, 15];
const ADVANCED_WEIGHTS: [u32; 3] = [40, 35, 25];

/// Last round of the beginner / intermediate tiers
const BEGINNER_MAX_ROUND: u32 = 3;
const INTERMEDIATE_MAX_ROUND: u32 = 10;

/// Entry timers are armed before the previous attack's completion timer, so
/// an enemy is reused at least one tick after its last attack finishes.
const REUSE_GAP_MS: Millis = 1;

/// Seeded per-round sequence builder
#[derive(Debug, Clone)]
pub struct RoundGenerator {
    rng: Xoshiro256PlusPlus,
    difficulty: DifficultyConfig,
    /// Spawn-to-done time of one attack
    attack_duration: Millis,
}

impl RoundGenerator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(config.seed),
            difficulty: config.difficulty.clone(),
            attack_duration: config.timing.attack_duration(),
        }
    }

    pub fn pattern_for(&self, round: u32) -> PatternKind {
        if round <= self.difficulty.scripted_rounds {
            return if round <= 1 {
                PatternKind::Tutorial
            } else {
                PatternKind::Basic
            };
        }
        if round % 10 == 0 {
            PatternKind::Deceptive
        } else if round % 7 == 0 {
            PatternKind::Defensive
        } else if round % 5 == 0 {
            PatternKind::Rapid
        } else if round <= BEGINNER_MAX_ROUND {
            PatternKind::Beginner
        } else if round <= INTERMEDIATE_MAX_ROUND {
            PatternKind::Intermediate
        } else {
            PatternKind::Advanced
        }
    }

    /// `max(min, 1 - log2(round + 1) * factor)`
    pub fn speed_multiplier(&self, round: u32) -> f32 {
        let raw = 1.0 - (round as f32 + 1.0).log2() * self.difficulty.speed_log_factor;
        raw.max(self.difficulty.min_speed_multiplier)
    }

    /// Procedural sequence length for a round, bounded above
    pub fn attack_count(&self, round: u32) -> usize {
        let d = &self.difficulty;
        let growth = round.checked_div(d.attack_count_step_rounds).unwrap_or(0) as usize;
        (d.base_attack_count + growth).min(d.max_attacks_per_round)
    }

    /// Gap between consecutive generated attacks
    pub fn attack_spacing(&self, round: u32) -> Millis {
        (self.difficulty.base_attack_spacing_ms as f64 * self.speed_multiplier(round) as f64).round()
            as Millis
    }

    /// Sequence for a full roster of `enemy_count` enemies.
    pub fn generate(&mut self, round: u32, enemy_count: usize) -> Sequence {
        let roster: Vec<EnemyId> = (0..enemy_count).collect();
        self.generate_for(round, &roster)
    }

    /// Sequence drawing only from `living` enemies.
    pub fn generate_for(&mut self, round: u32, living: &[EnemyId]) -> Sequence {
        let pattern = self.pattern_for(round);
        let entries = if living.is_empty() {
            Vec::new()
        } else {
            match pattern {
                PatternKind::Tutorial => fold_scripted(&TUTORIAL_SEQUENCE, living),
                PatternKind::Basic => fold_scripted(&BASIC_SEQUENCE, living),
                PatternKind::Rapid => self.from_pattern(&RAPID_PATTERN, round, living),
                PatternKind::Defensive => self.from_pattern(&DEFENSIVE_PATTERN, round, living),
                PatternKind::Deceptive => self.from_pattern(&DECEPTIVE_PATTERN, round, living),
                PatternKind::Beginner => self.procedural(&BEGINNER_WEIGHTS, round, living),
                PatternKind::Intermediate => self.procedural(&INTERMEDIATE_WEIGHTS, round, living),
                PatternKind::Advanced | PatternKind::Custom => {
                    self.procedural(&ADVANCED_WEIGHTS, round, living)
                }
            }
        };

        tracing::debug!(
            target: "riposte_core::sequence",
            round,
            pattern = pattern.as_str(),
            attacks = entries.len(),
            "sequence generated"
        );
        Sequence {
            round,
            pattern,
            entries,
        }
    }

    fn from_pattern(
        &mut self,
        pattern: &[(EnemyId, AttackType)],
        round: u32,
        living: &[EnemyId],
    ) -> Vec<SequenceEntry> {
        let mut timeline = Timeline::new(self.attack_spacing(round), self.attack_duration);
        let mut last: Option<usize> = None;
        for &(id, attack_type) in pattern {
            let mut slot = id % living.len();
            if last == Some(slot) && living.len() > 1 {
                slot = (slot + 1) % living.len();
            }
            last = Some(slot);
            timeline.push(living[slot], attack_type);
        }
        timeline.entries
    }

    fn procedural(&mut self, weights: &[u32; 3], round: u32, living: &[EnemyId]) -> Vec<SequenceEntry> {
        let kinds = AttackType::all();
        let dist = match WeightedIndex::new(weights) {
            Ok(dist) => dist,
            Err(_) => return Vec::new(),
        };
        let mut timeline = Timeline::new(self.attack_spacing(round), self.attack_duration);
        let mut last: Option<EnemyId> = None;

        for _ in 0..self.attack_count(round) {
            let attack_type = kinds[dist.sample(&mut self.rng)];
            let mut enemy = living[self.rng.gen_range(0..living.len())];
            while living.len() > 1 && last == Some(enemy) {
                enemy = living[self.rng.gen_range(0..living.len())];
            }
            last = Some(enemy);
            timeline.push(enemy, attack_type);
        }
        timeline.entries
    }
}

/// Lays entries out at a fixed spacing, pushing an entry back while its
/// enemy is still busy with a previous attack.
struct Timeline {
    spacing: Millis,
    attack_duration: Millis,
    cursor: Millis,
    busy_until: HashMap<EnemyId, Millis>,
    entries: Vec<SequenceEntry>,
}

impl Timeline {
    fn new(spacing: Millis, attack_duration: Millis) -> Self {
        Self {
            spacing,
            attack_duration,
            cursor: 0,
            busy_until: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn push(&mut self, enemy: EnemyId, attack_type: AttackType) {
        let free_at = self.busy_until.get(&enemy).copied().unwrap_or(0);
        let delay_ms = self.cursor.max(free_at);
        self.busy_until.insert(
            enemy,
            delay_ms
                .saturating_add(self.attack_duration)
                .saturating_add(REUSE_GAP_MS),
        );
        self.cursor = delay_ms.saturating_add(self.spacing);
        self.entries.push(SequenceEntry {
            enemy,
            attack_type,
            delay_ms,
        });
    }
}

/// Map hand-authored enemy ids onto the living roster. Timing is kept as
/// written.
fn fold_scripted(script: &[SequenceEntry], living: &[EnemyId]) -> Vec<SequenceEntry> {
    script
        .iter()
        .map(|e| SequenceEntry {
            enemy: living[e.enemy % living.len()],
            ..*e
        })
        .collect()
}
