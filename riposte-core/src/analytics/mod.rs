//! Player performance analytics
//!
//! Tracks every defensive resolution for feedback and balance work:
//! - Lifetime totals per timing quality
//! - Success streaks
//! - Recent-window trend (improving / stable / declining)
//! - Coarse feedback tier from the success rate
//!
//! Use cases:
//! - In-game feedback between rounds
//! - Monte-Carlo balance reports (see `balance`)

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::combat::{ResolutionRecord, TimingQuality};

/// Resolutions kept for trend analysis
pub const HISTORY_SIZE: usize = 50;

/// Resolutions looked at for the recent trend
pub const RECENT_WINDOW: usize = 10;

/// Average-score swing (points) between window halves that counts as a trend
pub const TREND_THRESHOLD: f64 = 10.0;

/// Resolutions needed before feedback is given
pub const MIN_ACTIONS_FOR_FEEDBACK: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackTier {
    Excellent, // >= 90%
    Good,      // >= 70%
    Fair,      // >= 50%
    Struggling,
}

impl FeedbackTier {
    pub fn from_success_rate(rate: f64) -> Self {
        if rate >= 90.0 {
            Self::Excellent
        } else if rate >= 70.0 {
            Self::Good
        } else if rate >= 50.0 {
            Self::Fair
        } else {
            Self::Struggling
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent! Your timing is flawless.",
            Self::Good => "Good work! Tighten your timing a little.",
            Self::Fair => "Not bad. Focus on the rhythm of the attacks.",
            Self::Struggling => "Take your time and watch the telegraphs.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct HistoryEntry {
    success: bool,
    quality: TimingQuality,
    score_delta: i32,
}

/// Snapshot of tracked performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_actions: u32,
    pub successes: u32,
    /// Percent, 0-100
    pub success_rate: f64,
    pub average_score: f64,
    pub perfect_hits: u32,
    pub good_hits: u32,
    pub late_hits: u32,
    pub misses: u32,
    pub wrong_actions: u32,
    pub current_streak: u32,
    pub best_streak: u32,
    pub average_latency_ms: Option<f64>,
    pub trend: Trend,
    pub feedback: Option<FeedbackTier>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceTracker {
    history: VecDeque<HistoryEntry>,
    total_actions: u32,
    successes: u32,
    perfect_hits: u32,
    good_hits: u32,
    late_hits: u32,
    misses: u32,
    wrong_actions: u32,
    total_score: i64,
    current_streak: u32,
    best_streak: u32,
    latency_sum: u64,
    latency_samples: u32,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: &ResolutionRecord) {
        self.total_actions += 1;
        self.total_score += i64::from(record.score_delta);

        if record.success {
            self.successes += 1;
            self.current_streak += 1;
            self.best_streak = self.best_streak.max(self.current_streak);
        } else {
            self.current_streak = 0;
        }

        match record.quality {
            TimingQuality::Perfect => self.perfect_hits += 1,
            TimingQuality::Good => self.good_hits += 1,
            TimingQuality::Late => self.late_hits += 1,
            TimingQuality::Miss => self.misses += 1,
            TimingQuality::WrongAction => self.wrong_actions += 1,
        }

        if let Some(latency) = record.latency_ms {
            self.latency_sum += latency;
            self.latency_samples += 1;
        }

        if self.history.len() == HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            success: record.success,
            quality: record.quality,
            score_delta: record.score_delta,
        });
    }

    pub fn total_actions(&self) -> u32 {
        self.total_actions
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_actions == 0 {
            return 0.0;
        }
        self.successes as f64 / self.total_actions as f64 * 100.0
    }

    /// Share of resolutions graded Perfect, 0-1
    pub fn perfect_rate(&self) -> f64 {
        if self.total_actions == 0 {
            return 0.0;
        }
        self.perfect_hits as f64 / self.total_actions as f64
    }

    /// Compare the two halves of the most recent window.
    pub fn trend(&self) -> Trend {
        let recent: Vec<i32> = self
            .history
            .iter()
            .rev()
            .take(RECENT_WINDOW)
            .rev()
            .map(|e| e.score_delta)
            .collect();
        if recent.len() < 2 {
            return Trend::Stable;
        }
        let (first, second) = recent.split_at(recent.len() / 2);
        let mean = |s: &[i32]| s.iter().map(|&v| v as f64).sum::<f64>() / s.len() as f64;
        let difference = mean(second) - mean(first);
        if difference > TREND_THRESHOLD {
            Trend::Improving
        } else if difference < -TREND_THRESHOLD {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    /// Success rate over the most recent window, percent
    pub fn recent_success_rate(&self) -> Option<f64> {
        let recent: Vec<_> = self.history.iter().rev().take(RECENT_WINDOW).collect();
        if recent.is_empty() {
            return None;
        }
        let ok = recent.iter().filter(|e| e.success).count();
        Some(ok as f64 / recent.len() as f64 * 100.0)
    }

    pub fn feedback(&self) -> Option<FeedbackTier> {
        (self.total_actions >= MIN_ACTIONS_FOR_FEEDBACK)
            .then(|| FeedbackTier::from_success_rate(self.success_rate()))
    }

    pub fn stats(&self) -> PerformanceStats {
        let average_score = if self.total_actions == 0 {
            0.0
        } else {
            self.total_score as f64 / self.total_actions as f64
        };
        PerformanceStats {
            total_actions: self.total_actions,
            successes: self.successes,
            success_rate: self.success_rate(),
            average_score,
            perfect_hits: self.perfect_hits,
            good_hits: self.good_hits,
            late_hits: self.late_hits,
            misses: self.misses,
            wrong_actions: self.wrong_actions,
            current_streak: self.current_streak,
            best_streak: self.best_streak,
            average_latency_ms: (self.latency_samples > 0)
                .then(|| self.latency_sum as f64 / self.latency_samples as f64),
            trend: self.trend(),
            feedback: self.feedback(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
