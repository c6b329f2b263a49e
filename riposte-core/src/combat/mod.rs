//! Attack/defense vocabulary shared by every combat component.
//!
//! - `timing`: latency → quality tier
//! - `resolver`: (attack, expected, action, quality) → resolution record
//! - `phase`: per-attack PREPARATION → EXECUTION → RECOVERY state machine
//! - `state`: health/score/combo, mutated only through resolver output

use serde::{Deserialize, Serialize};

pub mod phase;
pub mod resolver;
pub mod state;
pub mod timing;

pub use phase::{
    AttackInstance, AttackPhaseController, IgnoreReason, InstanceId, PhaseStep, PhaseTimer,
    SubmitOutcome,
};
pub use resolver::{CombatResolver, PlayerActionOutcome, ResolutionModifiers, ResolutionRecord};
pub use state::CombatState;
pub use timing::{evaluate, TimingQuality, TimingResult, TimingWindows};

/// Index of an enemy in the roster
pub type EnemyId = usize;

/// Attack kinds an enemy can telegraph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackType {
    Normal, // answer with dodge
    Heavy,  // answer with parry
    Feint,  // answer with nothing
}

impl AttackType {
    /// The single, total attack → defense mapping.
    pub fn expected_defense(&self) -> DefenseAction {
        match self {
            Self::Normal => DefenseAction::Dodge,
            Self::Heavy => DefenseAction::Parry,
            Self::Feint => DefenseAction::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Heavy => "heavy",
            Self::Feint => "feint",
        }
    }

    pub fn all() -> [AttackType; 3] {
        [Self::Normal, Self::Heavy, Self::Feint]
    }
}

/// Player defensive input. `None` also stands for "no input observed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefenseAction {
    None,
    Dodge, // low risk
    Parry, // tighter window, counter-attacks on success
}

impl DefenseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Dodge => "dodge",
            Self::Parry => "parry",
        }
    }

    /// Decode a host-supplied action id. Unknown ids are rejected, not defaulted.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::None),
            1 => Some(Self::Dodge),
            2 => Some(Self::Parry),
            _ => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "dodge" => Some(Self::Dodge),
            "parry" => Some(Self::Parry),
            _ => None,
        }
    }
}

/// Phases of a live attack. The terminal "inactive" state is the absence of
/// a phase (see `AttackPhaseController::phase`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttackPhase {
    Preparation, // telegraph
    Execution,   // input window
    Recovery,    // settle
}

impl AttackPhase {
    /// Strictly linear successor; `None` after recovery.
    pub fn next(&self) -> Option<AttackPhase> {
        match self {
            Self::Preparation => Some(Self::Execution),
            Self::Execution => Some(Self::Recovery),
            Self::Recovery => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparation => "preparation",
            Self::Execution => "execution",
            Self::Recovery => "recovery",
        }
    }
}
