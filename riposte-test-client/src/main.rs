/// Autoplay client: one bot-driven game, printed event by event
///
/// Usage: cargo run --bin autoplay -- --profile skilled --seed 7 --rounds 10 [--config engine.ron]
use anyhow::{bail, Context, Result};
use riposte_core::balance::{play_game, BotProfile};
use riposte_core::combat::{AttackPhase, AttackType, EnemyId, ResolutionRecord};
use riposte_core::engine::{CombatEvent, CombatObserver, EngineConfig};
use riposte_core::logging::{init_tracing, LogLevel, TracingConfig};
use tracing::info;

/// Prints the game as it unfolds
#[derive(Default)]
struct Narrator {
    verbose: bool,
    resolved: u32,
}

impl CombatObserver for Narrator {
    fn on_phase_change(&mut self, attacker: EnemyId, phase: AttackPhase, attack_type: AttackType) {
        if self.verbose {
            println!(
                "    enemy {} {:<6} -> {}",
                attacker,
                attack_type.as_str(),
                phase.as_str()
            );
        }
    }

    fn on_attack_resolved(&mut self, attacker: EnemyId, record: &ResolutionRecord) {
        self.resolved += 1;
        let latency = record
            .latency_ms
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".into());
        println!(
            "  [{:>3}] enemy {} {:<6} {:<6} {:<12} {:>6} latency {:>6}  hp {:+}  {}",
            self.resolved,
            attacker,
            record.attack_type.as_str(),
            record.action.as_str(),
            record.quality.as_str(),
            record.score_delta,
            latency,
            record.health_delta,
            record.message
        );
    }

    fn on_round_start(&mut self, round: u32) {
        println!("\n--- Round {} ---", round);
    }

    fn on_round_end(&mut self, round: u32) {
        println!("--- Round {} cleared ---", round);
    }

    fn on_game_over(&mut self, final_score: u64) {
        println!("\n*** GAME OVER - final score {} ***", final_score);
    }

    fn on_event(&mut self, event: &CombatEvent) {
        match event {
            CombatEvent::PlayerActionResolved { outcome } => {
                println!("  player {}: {}", outcome.action.as_str(), outcome.message);
            }
            CombatEvent::EnemyDefeated { enemy } => println!("  enemy {} defeated!", enemy),
            CombatEvent::AttackRejected { attacker, index } => {
                println!("  entry {} skipped: enemy {} still attacking", index, attacker);
            }
            CombatEvent::Victory { final_score } => {
                println!("\n*** VICTORY - final score {} ***", final_score);
            }
            CombatEvent::Faulted { reason } => println!("\n!!! engine faulted: {}", reason),
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    init_tracing(&TracingConfig::with_level(if verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    }));

    let profile_name = parse_str_arg(&args, "--profile").unwrap_or_else(|| "skilled".into());
    let Some(profile) = BotProfile::by_name(&profile_name) else {
        bail!(
            "unknown profile '{}' (expected novice, casual, skilled or expert)",
            profile_name
        );
    };
    let seed = parse_arg(&args, "--seed").unwrap_or(42);
    let rounds = parse_arg(&args, "--rounds").unwrap_or(10) as u32;
    let config = match parse_str_arg(&args, "--config") {
        Some(path) => EngineConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => EngineConfig::default(),
    };

    println!("=== Riposte Autoplay ===");
    println!("  Profile: {}", profile.name);
    println!("  Seed:    {}", seed);
    println!("  Rounds:  {}", rounds);

    let mut narrator = Narrator {
        verbose,
        ..Default::default()
    };
    let summary = play_game(&config, &profile, seed, rounds, &mut narrator)
        .context("game aborted")?;
    info!(score = summary.final_score, rounds = summary.rounds_survived, "autoplay finished");

    println!("\n=== Summary ===");
    println!("  Rounds survived: {}", summary.rounds_survived);
    println!("  Final score:     {}", summary.final_score);
    println!("  Final health:    {}", summary.final_health);
    println!("  Success rate:    {:.1}%", summary.success_rate);
    println!("  Perfect rate:    {:.1}%", summary.perfect_rate * 100.0);
    println!("  Best combo:      {}", summary.best_combo);
    println!(
        "\n{}",
        serde_json::to_string_pretty(&summary).context("serializing summary")?
    );
    Ok(())
}

fn parse_arg(args: &[String], flag: &str) -> Option<u64> {
    parse_str_arg(args, flag).and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
