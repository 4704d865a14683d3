// THEORY:
// The individual forecaster turns one grower's recent trap history into a
// bounded risk score. It is a pure function of the reading window: no clock, no
// state, no I/O.
//
// Algorithm:
// 1.  Map each reading's count to the 0-4 ordinal scale.
// 2.  Weight reading i (0 = most recent) by exp(-0.2 * i) and build the
//     weighted share of each ordinal level, in percent.
// 3.  Score = sum(share[l] / 100 * l / 4): a linear walk across the scale.
// 4.  Correct, in this order:
//     a. low-majority (levels 0+1 > 60%) halves the score, otherwise a
//        high-majority (levels 3+4 > 40%) multiplies it by 1.3;
//     b. independently, if at least 80% of the five most recent readings are
//        level 0 or 1, the score is multiplied by 0.4.
//     Both may apply, and the order and thresholds are part of the contract.
// 5.  Clamp to [0, 1] and band into low / medium / high.

use crate::core_modules::classifier::pest_level;
use crate::store::PestReading;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Readings consumed per forecast.
pub const HISTORY_WINDOW: usize = 20;

const RECENCY_DECAY: f64 = 0.2;
const RECENT_WINDOW: usize = 5;
const LEVELS: usize = 5;

const LOW_MAJORITY_SHARE: f64 = 60.0;
const LOW_MAJORITY_FACTOR: f64 = 0.5;
const HIGH_MAJORITY_SHARE: f64 = 40.0;
const HIGH_MAJORITY_FACTOR: f64 = 1.3;
const RECENT_CALM_FRACTION: f64 = 0.8;
const RECENT_CALM_FACTOR: f64 = 0.4;

const NO_DATA_SCORE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::High
        } else if score >= 0.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostics attached to an assessment. Not fed back into the algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RiskDetails {
    NoData,
    Distribution {
        /// Weighted share of each ordinal level, percent, one decimal.
        level_percentages: [f64; LEVELS],
        /// Score before the corrective multipliers, 0-1 scale, one decimal.
        weighted_score: f64,
        total_readings: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub details: RiskDetails,
}

/// Forecasts risk from a most-recent-first window. Only the first
/// [`HISTORY_WINDOW`] readings are considered.
pub fn forecast(history: &[PestReading]) -> RiskAssessment {
    let levels: Vec<u8> = history
        .iter()
        .take(HISTORY_WINDOW)
        .map(|r| pest_level(r.estimated_pest_count))
        .collect();
    forecast_levels(&levels)
}

/// Same as [`forecast`], over precomputed ordinal levels (most recent first).
pub fn forecast_levels(levels: &[u8]) -> RiskAssessment {
    if levels.is_empty() {
        return RiskAssessment {
            risk_score: NO_DATA_SCORE,
            risk_level: RiskLevel::Low,
            details: RiskDetails::NoData,
        };
    }

    let shares = weighted_shares(levels);
    let weighted_score: f64 = shares
        .iter()
        .enumerate()
        .map(|(level, share)| share / 100.0 * level as f64 / 4.0)
        .sum();

    let mut score = weighted_score;
    if shares[0] + shares[1] > LOW_MAJORITY_SHARE {
        score *= LOW_MAJORITY_FACTOR;
    } else if shares[3] + shares[4] > HIGH_MAJORITY_SHARE {
        score *= HIGH_MAJORITY_FACTOR;
    }

    let recent = &levels[..levels.len().min(RECENT_WINDOW)];
    let calm = recent.iter().filter(|&&l| l <= 1).count();
    if calm as f64 / recent.len() as f64 >= RECENT_CALM_FRACTION {
        score *= RECENT_CALM_FACTOR;
    }

    let risk_score = score.clamp(0.0, 1.0);
    RiskAssessment {
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        details: RiskDetails::Distribution {
            level_percentages: shares.map(round1),
            weighted_score: round1(weighted_score),
            total_readings: levels.len(),
        },
    }
}

/// Percentage of total recency weight held by each level.
fn weighted_shares(levels: &[u8]) -> [f64; LEVELS] {
    let mut weights = [0.0; LEVELS];
    let mut total = 0.0;
    for (i, &level) in levels.iter().enumerate() {
        let w = (-RECENCY_DECAY * i as f64).exp();
        weights[(level as usize).min(LEVELS - 1)] += w;
        total += w;
    }
    weights.map(|w| w / total * 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
