//! Combat resolution rules.
//!
//! `resolve` is pure and combo-free. Streak and guard effects are layered on
//! afterwards by `finalize`, using state the orchestrator owns.

use serde::{Deserialize, Serialize};

use super::state::CombatState;
use super::timing::TimingQuality;
use super::{AttackType, DefenseAction, EnemyId};
use crate::clock::Millis;
use crate::engine::config::{DamageConfig, EngineConfig, PlayerConfig, ScoreConfig};
use crate::turn::player::PlayerAction;

/// Outcome of one defensive exchange. Produced once per attack instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub success: bool,
    pub quality: TimingQuality,
    pub score_delta: i32,
    /// Change to player health (never positive for defenses)
    pub health_delta: i32,
    /// Damage dealt back to the attacker by a successful parry
    pub counter_damage: u32,
    pub message: String,
    pub attack_type: AttackType,
    pub action: DefenseAction,
    /// Reaction latency, when an input was observed
    pub latency_ms: Option<Millis>,
}

/// Streak/guard context applied on top of a base resolution
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionModifiers {
    /// Consecutive successes before this one
    pub combo: u32,
    /// Player chose Defend on the preceding player turn
    pub guard: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerActionOutcome {
    pub action: PlayerAction,
    pub success: bool,
    pub target: Option<EnemyId>,
    pub healed: u32,
    pub damage_dealt: u32,
    pub defeated: bool,
    pub guard: bool,
    pub score_delta: i32,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct CombatResolver {
    scoring: ScoreConfig,
    damage: DamageConfig,
    player: PlayerConfig,
}

impl CombatResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            scoring: config.scoring.clone(),
            damage: config.damage.clone(),
            player: config.player.clone(),
        }
    }

    /// Health lost when an attack of this type lands
    pub fn damage_for(&self, attack_type: AttackType) -> u32 {
        match attack_type {
            AttackType::Normal => self.damage.normal,
            AttackType::Heavy => self.damage.heavy,
            AttackType::Feint => self.damage.feint_penalty,
        }
    }

    /// Resolve one exchange. `timing` is `None` when no input was observed.
    ///
    /// Never fails: inconsistent combinations produce a Miss-grade failure
    /// with a diagnostic message so the turn loop keeps moving.
    pub fn resolve(
        &self,
        attack_type: AttackType,
        expected: DefenseAction,
        action: DefenseAction,
        timing: Option<TimingQuality>,
    ) -> ResolutionRecord {
        // Feints invert the rules: only silence through the window succeeds
        if attack_type == AttackType::Feint {
            return if action == DefenseAction::None {
                self.record(
                    true,
                    TimingQuality::Perfect,
                    self.scoring.feint_success,
                    0,
                    0,
                    "Feint read - held steady",
                    attack_type,
                    action,
                )
            } else {
                self.record(
                    false,
                    TimingQuality::WrongAction,
                    self.scoring.failure,
                    -(self.damage.feint_penalty as i32),
                    0,
                    "Fell for the feint",
                    attack_type,
                    action,
                )
            };
        }

        let damage = -(self.damage_for(attack_type) as i32);

        if expected != attack_type.expected_defense() {
            return self.record(
                false,
                TimingQuality::Miss,
                self.scoring.failure,
                damage,
                0,
                &format!(
                    "Unresolvable exchange: {} attack cannot expect {}",
                    attack_type.as_str(),
                    expected.as_str()
                ),
                attack_type,
                action,
            );
        }

        if action == DefenseAction::None {
            return self.record(
                false,
                TimingQuality::Miss,
                self.scoring.failure,
                damage,
                0,
                "Too slow - the attack landed",
                attack_type,
                action,
            );
        }

        if action != expected {
            return self.record(
                false,
                TimingQuality::WrongAction,
                self.scoring.failure,
                damage,
                0,
                &format!("Wrong defense - needed {}", expected.as_str()),
                attack_type,
                action,
            );
        }

        let parry = action == DefenseAction::Parry;
        match timing {
            Some(quality @ (TimingQuality::Perfect | TimingQuality::Good)) => {
                let perfect = quality == TimingQuality::Perfect;
                let mut score = match (parry, perfect) {
                    (true, true) => self.scoring.parry_perfect,
                    (true, false) => self.scoring.parry_good,
                    (false, true) => self.scoring.dodge_perfect,
                    (false, false) => self.scoring.dodge_good,
                };
                let mut counter = 0;
                if parry {
                    score += self.scoring.counter_bonus;
                    counter = self.damage.counter;
                }
                let message = match (parry, perfect) {
                    (true, true) => "Perfect parry! Counter-attack",
                    (true, false) => "Parried - counter-attack",
                    (false, true) => "Perfect dodge!",
                    (false, false) => "Dodged",
                };
                self.record(true, quality, score, 0, counter, message, attack_type, action)
            }
            Some(TimingQuality::Late) => self.record(
                false,
                TimingQuality::Late,
                self.scoring.failure,
                damage,
                0,
                "Too late - the attack landed",
                attack_type,
                action,
            ),
            Some(TimingQuality::Miss) | None => self.record(
                false,
                TimingQuality::Miss,
                self.scoring.failure,
                damage,
                0,
                "Missed the window",
                attack_type,
                action,
            ),
            Some(TimingQuality::WrongAction) => self.record(
                false,
                TimingQuality::Miss,
                self.scoring.failure,
                damage,
                0,
                "Unresolvable exchange: matching action graded as wrong",
                attack_type,
                action,
            ),
        }
    }

    /// Apply combo scaling to successful score gains and the guard to
    /// health losses.
    pub fn finalize(&self, mut record: ResolutionRecord, modifiers: &ResolutionModifiers) -> ResolutionRecord {
        if record.success && record.score_delta > 0 {
            let multiplier = self.combo_multiplier(modifiers.combo);
            record.score_delta = (record.score_delta as f32 * multiplier).round() as i32;
        }
        if modifiers.guard && record.health_delta < 0 {
            let kept = 1.0 - self.player.defend_reduction.clamp(0.0, 1.0);
            record.health_delta = (record.health_delta as f32 * kept).round() as i32;
        }
        record
    }

    /// `combo_multiplier ^ combo`, capped
    pub fn combo_multiplier(&self, combo: u32) -> f32 {
        let exponent = combo.min(i32::MAX as u32) as i32;
        self.scoring
            .combo_multiplier
            .powi(exponent)
            .min(self.scoring.max_combo_multiplier)
            .max(1.0)
    }

    /// Resolve a player-turn action against the current state. Unsuccessful
    /// outcomes are rejected submissions and must not be applied.
    pub fn resolve_player_action(
        &self,
        action: PlayerAction,
        target: Option<EnemyId>,
        state: &CombatState,
    ) -> PlayerActionOutcome {
        let mut outcome = PlayerActionOutcome {
            action,
            success: false,
            target: None,
            healed: 0,
            damage_dealt: 0,
            defeated: false,
            guard: false,
            score_delta: 0,
            message: String::new(),
        };

        match action {
            PlayerAction::Heal => {
                let missing = state.max_health.saturating_sub(state.player_health);
                let healed = self.player.heal_amount.min(missing);
                if healed == 0 {
                    outcome.message = "Already at full health".into();
                } else {
                    outcome.success = true;
                    outcome.healed = healed;
                    outcome.score_delta = self.scoring.heal;
                    outcome.message = format!("Healed {} HP", healed);
                }
            }
            PlayerAction::Attack => match target {
                Some(enemy) if state.is_enemy_alive(enemy) => {
                    let health = state.enemy_healths[enemy];
                    let dealt = self.player.attack_damage.min(health);
                    outcome.success = true;
                    outcome.target = Some(enemy);
                    outcome.damage_dealt = dealt;
                    outcome.defeated = dealt == health;
                    outcome.score_delta = self.scoring.player_attack;
                    if outcome.defeated {
                        outcome.score_delta += self.scoring.enemy_defeat_bonus;
                        outcome.message = format!("Enemy {} defeated", enemy);
                    } else {
                        outcome.message = format!("Hit enemy {} for {}", enemy, dealt);
                    }
                }
                Some(enemy) => {
                    outcome.message = format!("Enemy {} is not a valid target", enemy);
                }
                None => {
                    outcome.message = "Attack needs a target".into();
                }
            },
            PlayerAction::Defend => {
                outcome.success = true;
                outcome.guard = true;
                outcome.score_delta = self.scoring.defend;
                outcome.message = "Guard raised".into();
            }
        }
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        success: bool,
        quality: TimingQuality,
        score_delta: i32,
        health_delta: i32,
        counter_damage: u32,
        message: &str,
        attack_type: AttackType,
        action: DefenseAction,
    ) -> ResolutionRecord {
        ResolutionRecord {
            success,
            quality,
            score_delta,
            health_delta,
            counter_damage,
            message: message.to_string(),
            attack_type,
            action,
            latency_ms: None,
        }
    }
}
