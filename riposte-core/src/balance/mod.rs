//! Monte-Carlo balance simulation
//!
//! Plays many complete games with scripted bots of different skill levels
//! against the real orchestrator and its virtual clock, then checks that
//! better reflexes actually translate into better results.
//! Uses rayon to spread games across CPU cores; each game stays
//! single-threaded.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::clock::Millis;
use crate::combat::{AttackType, DefenseAction, EnemyId};
use crate::engine::config::EngineConfig;
use crate::engine::events::{CombatEvent, CombatObserver};
use crate::error::EngineError;
use crate::logging::TimingSpan;
use crate::turn::{PlayerAction, TurnKind, TurnOrchestrator};

/// Health fraction below which bots heal instead of attacking
const BOT_HEAL_THRESHOLD: f64 = 0.6;

/// Hard stop on simulation steps per game
const MAX_SIM_STEPS: usize = 1_000_000;

/// Scripted player for simulations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotProfile {
    pub name: String,
    pub reaction_mean_ms: f64,
    /// Uniform spread around the mean
    pub reaction_jitter_ms: f64,
    /// Chance of picking the right defense for non-feints
    pub accuracy: f64,
    /// Chance of holding still through a feint
    pub feint_discipline: f64,
}

impl BotProfile {
    pub fn novice() -> Self {
        Self {
            name: "novice".into(),
            reaction_mean_ms: 420.0,
            reaction_jitter_ms: 180.0,
            accuracy: 0.65,
            feint_discipline: 0.4,
        }
    }

    pub fn casual() -> Self {
        Self {
            name: "casual".into(),
            reaction_mean_ms: 260.0,
            reaction_jitter_ms: 120.0,
            accuracy: 0.8,
            feint_discipline: 0.6,
        }
    }

    pub fn skilled() -> Self {
        Self {
            name: "skilled".into(),
            reaction_mean_ms: 150.0,
            reaction_jitter_ms: 70.0,
            accuracy: 0.9,
            feint_discipline: 0.8,
        }
    }

    pub fn expert() -> Self {
        Self {
            name: "expert".into(),
            reaction_mean_ms: 70.0,
            reaction_jitter_ms: 35.0,
            accuracy: 0.97,
            feint_discipline: 0.95,
        }
    }

    /// Presets in ascending skill order
    pub fn presets() -> Vec<BotProfile> {
        vec![Self::novice(), Self::casual(), Self::skilled(), Self::expert()]
    }

    pub fn by_name(name: &str) -> Option<BotProfile> {
        Self::presets().into_iter().find(|p| p.name == name)
    }

    /// Decide the answer to an opened execution window: the action and its
    /// delay, or `None` to stay still.
    fn react(&self, attack_type: AttackType, rng: &mut impl Rng) -> Option<(DefenseAction, Millis)> {
        let action = if attack_type == AttackType::Feint {
            if rng.gen_bool(self.feint_discipline.clamp(0.0, 1.0)) {
                return None;
            }
            if rng.gen_bool(0.5) {
                DefenseAction::Dodge
            } else {
                DefenseAction::Parry
            }
        } else {
            let expected = attack_type.expected_defense();
            if rng.gen_bool(self.accuracy.clamp(0.0, 1.0)) {
                expected
            } else if expected == DefenseAction::Dodge {
                DefenseAction::Parry
            } else {
                DefenseAction::Dodge
            }
        };
        let jitter = if self.reaction_jitter_ms > 0.0 {
            rng.gen_range(-self.reaction_jitter_ms..=self.reaction_jitter_ms)
        } else {
            0.0
        };
        let delay = (self.reaction_mean_ms + jitter).max(0.0).round() as Millis;
        Some((action, delay))
    }
}

/// Outcome of one simulated game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub profile: String,
    pub seed: u64,
    /// Rounds fully completed
    pub rounds_survived: u32,
    pub final_score: u64,
    pub final_health: u32,
    pub victory: bool,
    pub game_over: bool,
    pub resolutions: u32,
    pub success_rate: f64,
    pub perfect_rate: f64,
    pub best_combo: u32,
}

#[derive(Debug, Clone, Copy)]
struct PendingInput {
    at: Millis,
    attacker: EnemyId,
    action: DefenseAction,
}

struct Silent;

impl CombatObserver for Silent {}

/// Play one game with `profile` until it ends or `max_rounds` complete.
pub fn simulate_game(
    config: &EngineConfig,
    profile: &BotProfile,
    seed: u64,
    max_rounds: u32,
) -> Result<GameSummary, EngineError> {
    play_game(config, profile, seed, max_rounds, &mut Silent)
}

/// [`simulate_game`], routing every emitted event through `observer`.
pub fn play_game(
    config: &EngineConfig,
    profile: &BotProfile,
    seed: u64,
    max_rounds: u32,
    observer: &mut dyn CombatObserver,
) -> Result<GameSummary, EngineError> {
    let config = EngineConfig {
        seed,
        ..config.clone()
    };
    let execution_ms = config.timing.execution_ms;
    let mut orch = TurnOrchestrator::new(config)?;
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed.rotate_left(17) ^ 0x9E37_79B9_7F4A_7C15);
    let mut pending: Vec<PendingInput> = Vec::new();
    let mut rounds_survived = 0;

    orch.start_round()?;

    for _ in 0..MAX_SIM_STEPS {
        for event in orch.drain_events() {
            event.dispatch(observer);
            match event {
                CombatEvent::ExecutionWindowOpened {
                    attacker,
                    attack_type,
                } => {
                    if let Some((action, delay)) = profile.react(attack_type, &mut rng) {
                        if delay < execution_ms {
                            pending.push(PendingInput {
                                at: orch.now() + delay,
                                attacker,
                                action,
                            });
                        }
                    }
                }
                CombatEvent::TurnChanged {
                    turn: TurnKind::PlayerTurn,
                    ..
                } => play_player_turn(&mut orch)?,
                CombatEvent::RoundEnded { .. } => rounds_survived += 1,
                _ => {}
            }
        }

        if orch.is_finished() {
            break;
        }
        if rounds_survived >= max_rounds {
            orch.cancel();
            break;
        }

        pending.sort_by_key(|p| p.at);
        let next_input = pending.first().map(|p| p.at);
        let next_deadline = orch.next_deadline();
        let input_first = match (next_input, next_deadline) {
            (Some(at), Some(deadline)) => at < deadline,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if input_first {
            let input = pending.remove(0);
            orch.advance_to(input.at)?;
            orch.submit_defense_action(input.attacker, input.action)?;
        } else if let Some(deadline) = next_deadline {
            orch.advance_to(deadline)?;
        } else {
            break;
        }
    }

    let state = orch.state();
    let performance = orch.performance();
    let stats = performance.stats();
    Ok(GameSummary {
        profile: profile.name.clone(),
        seed,
        rounds_survived,
        final_score: state.score,
        final_health: state.player_health,
        victory: orch.turn_state() == crate::turn::TurnState::Victory,
        game_over: orch.turn_state() == crate::turn::TurnState::GameOver,
        resolutions: stats.total_actions,
        success_rate: stats.success_rate,
        perfect_rate: performance.perfect_rate(),
        best_combo: state.best_combo,
    })
}

/// Heal when hurt, otherwise hit the weakest living enemy; defend as fallback.
fn play_player_turn(orch: &mut TurnOrchestrator) -> Result<(), EngineError> {
    let state = orch.state();
    let hurt = (state.player_health as f64) < state.max_health as f64 * BOT_HEAL_THRESHOLD;
    let target = state
        .living_enemies()
        .into_iter()
        .min_by_key(|&e| state.enemy_healths[e]);

    if hurt && orch.submit_player_turn_action(PlayerAction::Heal, None)? {
        return Ok(());
    }
    if target.is_some() && orch.submit_player_turn_action(PlayerAction::Attack, target)? {
        return Ok(());
    }
    orch.submit_player_turn_action(PlayerAction::Defend, None)?;
    Ok(())
}

// =====================================================
// Batch simulation
// =====================================================

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub game_count: u64,
    pub max_rounds: u32,
    pub base_seed: u64,
    /// Profiles in ascending skill order
    pub profiles: Vec<BotProfile>,
    pub engine: EngineConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            game_count: 200,
            max_rounds: 20,
            base_seed: 42,
            profiles: BotProfile::presets(),
            engine: EngineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    pub profile: String,
    pub games: u64,
    pub failed_games: u64,
    pub avg_rounds: f64,
    pub std_rounds: f64,
    pub min_rounds: u32,
    pub max_rounds: u32,
    pub avg_score: f64,
    pub success_rate: f64,
    pub perfect_rate: f64,
    pub win_rate: f64,
    pub death_rate: f64,
}

/// Whether more skilled profiles do better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyGrade {
    Excellent, // ordered, best/worst score ratio >= 1.5
    Good,      // ordered
    Fair,      // one inversion
    Poor,      // several inversions
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceReport {
    pub total_games: u64,
    pub max_rounds: u32,
    pub profiles: Vec<ProfileReport>,
    /// Adjacent profile pairs where the less skilled one scored higher
    pub ordering_inversions: u32,
    pub grade: DifficultyGrade,
}

/// Per-game seed from `(base_seed, game_index)`
pub fn derive_seed(base_seed: u64, game_index: u64) -> u64 {
    let mut hasher = Sha3_256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(game_index.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[0..8]);
    u64::from_le_bytes(bytes)
}

/// Run every profile over the same set of seeded games in parallel.
pub fn run_balance_simulation(config: &SimConfig) -> BalanceReport {
    let _span = TimingSpan::new("balance_simulation");
    let seeds: Vec<u64> = (0..config.game_count)
        .map(|i| derive_seed(config.base_seed, i))
        .collect();

    let jobs: Vec<(usize, u64)> = (0..config.profiles.len())
        .flat_map(|p| seeds.iter().map(move |&s| (p, s)))
        .collect();

    let results: Vec<(usize, Result<GameSummary, EngineError>)> = jobs
        .par_iter()
        .map(|&(p, seed)| {
            (
                p,
                simulate_game(&config.engine, &config.profiles[p], seed, config.max_rounds),
            )
        })
        .collect();

    let profiles: Vec<ProfileReport> = config
        .profiles
        .iter()
        .enumerate()
        .map(|(p, profile)| {
            let mut games = Vec::new();
            let mut failed = 0;
            for (idx, result) in &results {
                if *idx != p {
                    continue;
                }
                match result {
                    Ok(summary) => games.push(summary),
                    Err(err) => {
                        failed += 1;
                        tracing::warn!(profile = %profile.name, error = %err, "simulated game failed");
                    }
                }
            }
            summarize(&profile.name, &games, failed)
        })
        .collect();

    let ordering_inversions = profiles
        .windows(2)
        .filter(|pair| pair[0].avg_score > pair[1].avg_score)
        .count() as u32;
    let spread = match (profiles.first(), profiles.last()) {
        (Some(worst), Some(best)) if worst.avg_score > 0.0 => best.avg_score / worst.avg_score,
        (Some(_), Some(best)) if best.avg_score > 0.0 => f64::INFINITY,
        _ => 1.0,
    };
    let grade = match ordering_inversions {
        0 if spread >= 1.5 => DifficultyGrade::Excellent,
        0 => DifficultyGrade::Good,
        1 => DifficultyGrade::Fair,
        _ => DifficultyGrade::Poor,
    };

    tracing::info!(
        games = config.game_count,
        profiles = profiles.len(),
        inversions = ordering_inversions,
        grade = ?grade,
        "balance simulation complete"
    );

    BalanceReport {
        total_games: config.game_count * config.profiles.len() as u64,
        max_rounds: config.max_rounds,
        profiles,
        ordering_inversions,
        grade,
    }
}

fn summarize(name: &str, games: &[&GameSummary], failed: u64) -> ProfileReport {
    if games.is_empty() {
        return ProfileReport {
            profile: name.to_string(),
            games: 0,
            failed_games: failed,
            avg_rounds: 0.0,
            std_rounds: 0.0,
            min_rounds: 0,
            max_rounds: 0,
            avg_score: 0.0,
            success_rate: 0.0,
            perfect_rate: 0.0,
            win_rate: 0.0,
            death_rate: 0.0,
        };
    }
    let n = games.len() as f64;
    let mean = |f: &dyn Fn(&GameSummary) -> f64| games.iter().map(|g| f(g)).sum::<f64>() / n;

    let avg_rounds = mean(&|g| g.rounds_survived as f64);
    let variance = mean(&|g| (g.rounds_survived as f64 - avg_rounds).powi(2));

    ProfileReport {
        profile: name.to_string(),
        games: games.len() as u64,
        failed_games: failed,
        avg_rounds,
        std_rounds: variance.sqrt(),
        min_rounds: games.iter().map(|g| g.rounds_survived).min().unwrap_or(0),
        max_rounds: games.iter().map(|g| g.rounds_survived).max().unwrap_or(0),
        avg_score: mean(&|g| g.final_score as f64),
        success_rate: mean(&|g| g.success_rate),
        perfect_rate: mean(&|g| g.perfect_rate),
        win_rate: mean(&|g| if g.victory { 1.0 } else { 0.0 }),
        death_rate: mean(&|g| if g.game_over { 1.0 } else { 0.0 }),
    }
}
