use serde::{Deserialize, Serialize};

use super::resolver::{PlayerActionOutcome, ResolutionRecord};
use super::EnemyId;
use crate::engine::config::EngineConfig;

/// Shared health/score/combo state. Written only from resolver output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatState {
    pub player_health: u32,
    pub max_health: u32,
    pub score: u64,
    pub combo_count: u32,
    pub best_combo: u32,
    pub enemy_healths: Vec<u32>,
}

impl CombatState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            player_health: config.player.max_health,
            max_health: config.player.max_health,
            score: 0,
            combo_count: 0,
            best_combo: 0,
            enemy_healths: vec![config.enemy_max_health; config.enemy_count],
        }
    }

    /// Apply a finalized defense resolution. Returns the attacker if the
    /// counter-attack defeated it.
    pub fn apply_resolution(&mut self, record: &ResolutionRecord, attacker: EnemyId) -> Option<EnemyId> {
        self.apply_health_delta(record.health_delta);
        self.apply_score_delta(record.score_delta);

        if record.success {
            self.combo_count += 1;
            self.best_combo = self.best_combo.max(self.combo_count);
        } else {
            self.combo_count = 0;
        }

        if record.counter_damage > 0 {
            return self.damage_enemy(attacker, record.counter_damage);
        }
        None
    }

    /// Apply a successful player-turn outcome. Returns the enemy it defeated.
    pub fn apply_player_outcome(&mut self, outcome: &PlayerActionOutcome) -> Option<EnemyId> {
        if !outcome.success {
            return None;
        }
        self.player_health = (self.player_health + outcome.healed).min(self.max_health);
        self.apply_score_delta(outcome.score_delta);
        match outcome.target {
            Some(enemy) if outcome.damage_dealt > 0 => self.damage_enemy(enemy, outcome.damage_dealt),
            _ => None,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.player_health == 0
    }

    pub fn all_enemies_defeated(&self) -> bool {
        self.enemy_healths.iter().all(|&h| h == 0)
    }

    pub fn is_enemy_alive(&self, enemy: EnemyId) -> bool {
        self.enemy_healths.get(enemy).is_some_and(|&h| h > 0)
    }

    /// Indices of enemies still standing, in roster order
    pub fn living_enemies(&self) -> Vec<EnemyId> {
        self.enemy_healths
            .iter()
            .enumerate()
            .filter(|&(_, &h)| h > 0)
            .map(|(i, _)| i)
            .collect()
    }

    fn apply_health_delta(&mut self, delta: i32) {
        if delta < 0 {
            self.player_health = self.player_health.saturating_sub(delta.unsigned_abs());
        } else {
            self.player_health = self
                .player_health
                .saturating_add(delta as u32)
                .min(self.max_health);
        }
    }

    fn apply_score_delta(&mut self, delta: i32) {
        if delta < 0 {
            self.score = self.score.saturating_sub(u64::from(delta.unsigned_abs()));
        } else {
            self.score = self.score.saturating_add(delta as u64);
        }
    }

    fn damage_enemy(&mut self, enemy: EnemyId, amount: u32) -> Option<EnemyId> {
        let health = self.enemy_healths.get_mut(enemy)?;
        if *health == 0 {
            return None;
        }
        *health = health.saturating_sub(amount);
        (*health == 0).then_some(enemy)
    }
}
