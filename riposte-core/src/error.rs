use thiserror::Error;

use crate::clock::Millis;

/// Failure of the timer primitive. Always fatal to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClockError {
    #[error("timer deadline overflows the clock: now {now}ms + {delay}ms")]
    DeadlineOverflow { now: Millis, delay: Millis },
    #[error("timer capacity exceeded ({capacity} pending)")]
    CapacityExceeded { capacity: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("clock failure: {0}")]
    Clock(#[from] ClockError),
    #[error("engine is faulted and no longer accepts input")]
    Faulted,
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
