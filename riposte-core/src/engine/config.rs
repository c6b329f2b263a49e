use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::clock::Millis;
use crate::constants::*;
use crate::error::ConfigError;

/// Top-level engine tuning. `Default` mirrors `constants.rs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: u64,
    pub enemy_count: usize,
    pub enemy_max_health: u32,
    pub timing: TimingConfig,
    pub scoring: ScoreConfig,
    pub damage: DamageConfig,
    pub player: PlayerConfig,
    pub difficulty: DifficultyConfig,
    pub max_pending_timers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            enemy_count: ENEMY_COUNT,
            enemy_max_health: ENEMY_MAX_HEALTH,
            timing: TimingConfig::default(),
            scoring: ScoreConfig::default(),
            damage: DamageConfig::default(),
            player: PlayerConfig::default(),
            difficulty: DifficultyConfig::default(),
            max_pending_timers: MAX_PENDING_TIMERS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub preparation_ms: Millis,
    pub execution_ms: Millis,
    pub recovery_ms: Millis,
    pub perfect_window_ms: Millis,
    pub good_window_ms: Millis,
    pub parry_window_scale: f32,
    pub transition_ms: Millis,
    pub player_turn_ms: Millis,
    pub player_action_settle_ms: Millis,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            preparation_ms: PREPARATION_MS,
            execution_ms: EXECUTION_MS,
            recovery_ms: RECOVERY_MS,
            perfect_window_ms: PERFECT_WINDOW_MS,
            good_window_ms: GOOD_WINDOW_MS,
            parry_window_scale: PARRY_WINDOW_SCALE,
            transition_ms: TURN_TRANSITION_MS,
            player_turn_ms: PLAYER_TURN_MS,
            player_action_settle_ms: PLAYER_ACTION_SETTLE_MS,
        }
    }
}

impl TimingConfig {
    /// Wall time one attack occupies its attacker, spawn to DONE
    pub fn attack_duration(&self) -> Millis {
        self.preparation_ms
            .saturating_add(self.execution_ms)
            .saturating_add(self.recovery_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    pub dodge_perfect: i32,
    pub dodge_good: i32,
    pub parry_perfect: i32,
    pub parry_good: i32,
    pub counter_bonus: i32,
    pub feint_success: i32,
    pub failure: i32,
    pub combo_multiplier: f32,
    pub max_combo_multiplier: f32,
    pub heal: i32,
    pub player_attack: i32,
    pub enemy_defeat_bonus: i32,
    pub defend: i32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            dodge_perfect: DODGE_PERFECT_SCORE,
            dodge_good: DODGE_GOOD_SCORE,
            parry_perfect: PARRY_PERFECT_SCORE,
            parry_good: PARRY_GOOD_SCORE,
            counter_bonus: COUNTER_BONUS_SCORE,
            feint_success: FEINT_SUCCESS_SCORE,
            failure: FAILURE_SCORE,
            combo_multiplier: COMBO_MULTIPLIER,
            max_combo_multiplier: MAX_COMBO_MULTIPLIER,
            heal: HEAL_SCORE,
            player_attack: PLAYER_ATTACK_SCORE,
            enemy_defeat_bonus: ENEMY_DEFEAT_BONUS,
            defend: DEFEND_SCORE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageConfig {
    pub normal: u32,
    pub heavy: u32,
    pub feint_penalty: u32,
    pub counter: u32,
}

impl Default for DamageConfig {
    fn default() -> Self {
        Self {
            normal: NORMAL_DAMAGE,
            heavy: HEAVY_DAMAGE,
            feint_penalty: FEINT_PENALTY,
            counter: COUNTER_DAMAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub max_health: u32,
    pub heal_amount: u32,
    pub attack_damage: u32,
    pub defend_reduction: f32,
    /// When false, rounds skip straight to the enemy turn
    pub turns_enabled: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_health: PLAYER_MAX_HEALTH,
            heal_amount: HEAL_AMOUNT,
            attack_damage: PLAYER_ATTACK_DAMAGE,
            defend_reduction: DEFEND_REDUCTION,
            turns_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyConfig {
    pub base_attack_count: usize,
    pub attack_count_step_rounds: u32,
    pub max_attacks_per_round: usize,
    pub base_attack_spacing_ms: Millis,
    pub speed_log_factor: f32,
    pub min_speed_multiplier: f32,
    pub scripted_rounds: u32,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            base_attack_count: BASE_ATTACK_COUNT,
            attack_count_step_rounds: ATTACK_COUNT_STEP_ROUNDS,
            max_attacks_per_round: MAX_ATTACKS_PER_ROUND,
            base_attack_spacing_ms: BASE_ATTACK_SPACING_MS,
            speed_log_factor: SPEED_LOG_FACTOR,
            min_speed_multiplier: MIN_SPEED_MULTIPLIER,
            scripted_rounds: SCRIPTED_ROUNDS,
        }
    }
}

impl EngineConfig {
    pub fn from_ron_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.ron` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("ron") => Self::from_ron_str(&content),
            Some("json") => Self::from_json_str(&content),
            other => Err(ConfigError::Invalid(format!(
                "unsupported config extension: {:?}",
                other
            ))),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        if t.preparation_ms == 0 || t.execution_ms == 0 || t.recovery_ms == 0 {
            return Err(ConfigError::Invalid(
                "phase durations must be non-zero".into(),
            ));
        }
        if t.transition_ms == 0 || t.player_turn_ms == 0 {
            return Err(ConfigError::Invalid(
                "transition and player turn durations must be non-zero".into(),
            ));
        }
        if t.perfect_window_ms > t.good_window_ms {
            return Err(ConfigError::Invalid(format!(
                "perfect window ({}ms) exceeds good window ({}ms)",
                t.perfect_window_ms, t.good_window_ms
            )));
        }
        if t.good_window_ms > t.execution_ms {
            return Err(ConfigError::Invalid(format!(
                "good window ({}ms) exceeds execution duration ({}ms)",
                t.good_window_ms, t.execution_ms
            )));
        }
        if !(t.parry_window_scale > 0.0 && t.parry_window_scale <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "parry window scale {} outside (0, 1]",
                t.parry_window_scale
            )));
        }
        if self.enemy_count == 0 {
            return Err(ConfigError::Invalid("enemy_count must be at least 1".into()));
        }
        if self.enemy_max_health == 0 {
            return Err(ConfigError::Invalid("enemy_max_health must be non-zero".into()));
        }
        if self.player.max_health == 0 {
            return Err(ConfigError::Invalid("player max_health must be non-zero".into()));
        }
        let d = &self.difficulty;
        if !(d.min_speed_multiplier > 0.0 && d.min_speed_multiplier <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "min speed multiplier {} outside (0, 1]",
                d.min_speed_multiplier
            )));
        }
        if d.max_attacks_per_round < d.base_attack_count {
            return Err(ConfigError::Invalid(format!(
                "max attacks per round ({}) below base attack count ({})",
                d.max_attacks_per_round, d.base_attack_count
            )));
        }
        if self.max_pending_timers == 0 {
            return Err(ConfigError::Invalid("max_pending_timers must be non-zero".into()));
        }
        Ok(())
    }
}
