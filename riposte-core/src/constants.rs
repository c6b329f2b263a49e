//! Centralized tuning constants for the combat timing core.
//!
//! These are the defaults behind `EngineConfig::default()`. Runtime code reads
//! the config, never these constants directly, so a loaded config file can
//! override any of them.

use crate::clock::Millis;

// =====================================================
// Attack phases
// =====================================================

/// Telegraph duration before an attack lands
pub const PREPARATION_MS: Millis = 1500;

/// Window in which a defensive input is evaluated
pub const EXECUTION_MS: Millis = 2000;

/// Settle time after a resolution before the attacker is freed
pub const RECOVERY_MS: Millis = 500;

// =====================================================
// Timing windows
// =====================================================

/// Latency (from execution start) graded PERFECT
pub const PERFECT_WINDOW_MS: Millis = 100;

/// Latency graded GOOD
pub const GOOD_WINDOW_MS: Millis = 250;

/// Parry bands are this fraction of the dodge bands (tighter = riskier)
pub const PARRY_WINDOW_SCALE: f32 = 0.6;

// =====================================================
// Turn flow
// =====================================================

/// Non-interactive buffer between turns
pub const TURN_TRANSITION_MS: Millis = 800;

/// Time the player has to pick a player-turn action
pub const PLAYER_TURN_MS: Millis = 5000;

/// Delay between a player-turn action and the end of the turn
pub const PLAYER_ACTION_SETTLE_MS: Millis = 1000;

// =====================================================
// Scoring
// =====================================================

pub const DODGE_PERFECT_SCORE: i32 = 100;
pub const DODGE_GOOD_SCORE: i32 = 50;
pub const PARRY_PERFECT_SCORE: i32 = 200;
pub const PARRY_GOOD_SCORE: i32 = 100;

/// Extra score on any successful parry (counter-attack landed)
pub const COUNTER_BONUS_SCORE: i32 = 150;

/// Score for holding still through a feint
pub const FEINT_SUCCESS_SCORE: i32 = 100;

/// Score change on any failed defense
pub const FAILURE_SCORE: i32 = -50;

/// Multiplier applied per prior consecutive success
pub const COMBO_MULTIPLIER: f32 = 1.1;

/// Upper bound on the compounded combo multiplier
pub const MAX_COMBO_MULTIPLIER: f32 = 3.0;

pub const HEAL_SCORE: i32 = 10;
pub const PLAYER_ATTACK_SCORE: i32 = 25;
pub const ENEMY_DEFEAT_BONUS: i32 = 50;
pub const DEFEND_SCORE: i32 = 10;

// =====================================================
// Damage & health
// =====================================================

pub const NORMAL_DAMAGE: u32 = 20;
pub const HEAVY_DAMAGE: u32 = 50;

/// Health lost when reacting to a feint
pub const FEINT_PENALTY: u32 = 10;

/// Damage dealt back to the attacker on a successful parry
pub const COUNTER_DAMAGE: u32 = 25;

pub const PLAYER_MAX_HEALTH: u32 = 250;
pub const ENEMY_MAX_HEALTH: u32 = 50;
pub const ENEMY_COUNT: usize = 3;

pub const HEAL_AMOUNT: u32 = 30;
pub const PLAYER_ATTACK_DAMAGE: u32 = 20;

/// Fraction of incoming health damage absorbed while guarding
pub const DEFEND_REDUCTION: f32 = 0.5;

// =====================================================
// Difficulty progression
// =====================================================

pub const BASE_ATTACK_COUNT: usize = 3;

/// +1 attack every N rounds
pub const ATTACK_COUNT_STEP_ROUNDS: u32 = 3;

pub const MAX_ATTACKS_PER_ROUND: usize = 8;

/// Nominal gap between consecutive attacks at speed 1.0
pub const BASE_ATTACK_SPACING_MS: Millis = 2000;

/// speed = max(MIN_SPEED_MULTIPLIER, 1 - log2(round + 1) * SPEED_LOG_FACTOR)
pub const SPEED_LOG_FACTOR: f32 = 0.08;
pub const MIN_SPEED_MULTIPLIER: f32 = 0.6;

/// Rounds played from hand-authored sequences
pub const SCRIPTED_ROUNDS: u32 = 2;

// =====================================================
// Engine
// =====================================================

/// Upper bound on simultaneously pending timers
pub const MAX_PENDING_TIMERS: usize = 256;

pub const DEFAULT_SEED: u64 = 42;
