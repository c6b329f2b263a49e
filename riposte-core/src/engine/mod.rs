//! Engine integration layer
//!
//! - `config`: tunables with RON/JSON loading and validation
//! - `events`: the host-facing event enum and observer trait

pub mod config;
pub mod events;

pub use config::{DamageConfig, DifficultyConfig, EngineConfig, PlayerConfig, ScoreConfig, TimingConfig};
pub use events::{dispatch_all, CombatEvent, CombatObserver};
