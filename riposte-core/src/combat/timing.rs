//! Timing-window evaluation.
//!
//! Bands are inclusive upper bounds checked in order:
//! `latency <= perfect` → Perfect, `<= good` → Good, `<= total` → Late, else Miss.

use serde::{Deserialize, Serialize};

use super::DefenseAction;
use crate::clock::Millis;
use crate::engine::config::TimingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimingQuality {
    Perfect,
    Good,
    Late,
    Miss,
    WrongAction,
}

impl TimingQuality {
    /// Ordinal for comparisons (higher is better). WrongAction ranks lowest.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Perfect => 4,
            Self::Good => 3,
            Self::Late => 2,
            Self::Miss => 1,
            Self::WrongAction => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Good => "good",
            Self::Late => "late",
            Self::Miss => "miss",
            Self::WrongAction => "wrong_action",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingResult {
    pub quality: TimingQuality,
    pub latency_ms: Millis,
}

/// Classify a reaction latency. Total over all inputs; negative latency
/// counts as zero.
pub fn evaluate(latency_ms: i64, perfect_ms: Millis, good_ms: Millis, total_ms: Millis) -> TimingQuality {
    let latency = latency_ms.max(0) as u64;
    if latency <= perfect_ms {
        TimingQuality::Perfect
    } else if latency <= good_ms {
        TimingQuality::Good
    } else if latency <= total_ms {
        TimingQuality::Late
    } else {
        TimingQuality::Miss
    }
}

/// Concrete band edges for one defensive action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingWindows {
    pub perfect_ms: Millis,
    pub good_ms: Millis,
    pub total_ms: Millis,
}

impl TimingWindows {
    /// Dodge uses the configured bands; parry shrinks perfect/good by the
    /// parry scale. The total window is always the execution duration.
    pub fn for_action(config: &TimingConfig, action: DefenseAction) -> Self {
        let scale = match action {
            DefenseAction::Parry => config.parry_window_scale,
            DefenseAction::Dodge | DefenseAction::None => 1.0,
        };
        Self {
            perfect_ms: scale_ms(config.perfect_window_ms, scale),
            good_ms: scale_ms(config.good_window_ms, scale),
            total_ms: config.execution_ms,
        }
    }

    pub fn grade(&self, latency_ms: Millis) -> TimingResult {
        let latency = i64::try_from(latency_ms).unwrap_or(i64::MAX);
        TimingResult {
            quality: evaluate(latency, self.perfect_ms, self.good_ms, self.total_ms),
            latency_ms,
        }
    }
}

fn scale_ms(ms: Millis, scale: f32) -> Millis {
    (ms as f64 * scale as f64).round() as Millis
}
