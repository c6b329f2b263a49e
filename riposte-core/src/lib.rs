//! Riposte - Combat Timing Core
//!
//! This crate provides the deterministic rules engine for a turn-based
//! reflex combat game:
//! - Virtual clock with cancellable timers (no wall-clock reads)
//! - Attack phases (preparation, execution, recovery) per attacker
//! - Timing evaluation and defensive resolution (dodge, parry, feints)
//! - Scripted and procedurally generated attack sequences per round
//! - Turn orchestration (player turn, transition, enemy turn)
//! - Performance analytics and Monte-Carlo balance simulation
//!
//! Rendering, input devices, audio and persistence belong to the host.
//! The host advances the clock, submits input, and drains [`CombatEvent`]s.

pub mod analytics;
pub mod balance;
pub mod clock;
pub mod combat;
pub mod constants;
pub mod engine;
pub mod error;
pub mod logging;
pub mod sequence;
pub mod turn;

pub use clock::{Millis, Scheduler, TimerHandle, TimerQueue};
pub use combat::{AttackPhase, AttackType, CombatResolver, CombatState, DefenseAction, EnemyId};
pub use engine::{CombatEvent, CombatObserver, EngineConfig};
pub use error::{ClockError, ConfigError, EngineError};
pub use turn::{OrchestratorSnapshot, PlayerAction, TurnKind, TurnOrchestrator, TurnState};
