use serde::{Deserialize, Serialize};

/// Action chosen during the player's own turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerAction {
    Heal,
    Attack, // needs a living target
    Defend, // guards through the next enemy turn
}

impl PlayerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heal => "heal",
            Self::Attack => "attack",
            Self::Defend => "defend",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "heal" => Some(Self::Heal),
            "attack" => Some(Self::Attack),
            "defend" => Some(Self::Defend),
            _ => None,
        }
    }

    pub fn needs_target(&self) -> bool {
        matches!(self, Self::Attack)
    }
}
