// THEORY:
// The classifier maps a blob count onto a five-step ordinal scale. The same
// count breakpoints are the common scale for the individual forecaster and the
// community aggregator, so they live here once as `pest_level`.
//
// The upload classifier additionally escalates one step when a large share of
// the trap is dark: heavy coverage usually means insects have merged into
// regions that the blob count under-reports.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound (inclusive) of each count bucket below the top one.
const COUNT_BREAKPOINTS: [i64; 4] = [2, 5, 12, 25];

/// Dark-pixel share at which the category is escalated by one step.
pub const DARK_RATIO_ESCALATION: f64 = 0.15;

/// Ordinal pest amount for a single trap reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PestCategory {
    #[serde(rename = "very low")]
    VeryLow,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "high")]
    High,
    #[serde(rename = "very high")]
    VeryHigh,
}

impl PestCategory {
    const ALL: [PestCategory; 5] = [
        PestCategory::VeryLow,
        PestCategory::Low,
        PestCategory::Moderate,
        PestCategory::High,
        PestCategory::VeryHigh,
    ];

    pub fn from_level(level: u8) -> Self {
        Self::ALL[(level as usize).min(Self::ALL.len() - 1)]
    }

    /// Position on the 0-4 scale.
    pub fn level(self) -> u8 {
        self as u8
    }

    /// One step up, saturating at `VeryHigh`.
    pub fn escalate(self) -> Self {
        Self::from_level(self.level() + 1)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PestCategory::VeryLow => "very low",
            PestCategory::Low => "low",
            PestCategory::Moderate => "moderate",
            PestCategory::High => "high",
            PestCategory::VeryHigh => "very high",
        }
    }
}

impl fmt::Display for PestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal 0-4 from a pest count alone. Missing and negative counts count as 0.
pub fn pest_level(count: Option<i64>) -> u8 {
    let count = count.unwrap_or(0).max(0);
    COUNT_BREAKPOINTS
        .iter()
        .position(|&upper| count <= upper)
        .unwrap_or(COUNT_BREAKPOINTS.len()) as u8
}

/// Category for an uploaded trap: bucket by count, then escalate once on heavy
/// dark coverage. A non-finite ratio is treated as 0.
pub fn classify(estimated_count: Option<i64>, dark_pixel_ratio: f64) -> PestCategory {
    let category = PestCategory::from_level(pest_level(estimated_count));
    if dark_pixel_ratio.is_finite() && dark_pixel_ratio >= DARK_RATIO_ESCALATION {
        category.escalate()
    } else {
        category
    }
}
