// THEORY:
// Heat stress is scored additively: each of the four microclimate inputs
// contributes points from its own tier table, the sum is clamped to 0-100, and
// the sum is banded into a five-step level. Tiers within one input do not
// stack; only the highest tier reached counts.
//
// Inputs arrive from forms and sensors as loose values, so validation is a
// separate step (`MicroclimateInput::validate`) that happens before any
// scoring. The scorer itself only ever sees finite numbers.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// (exclusive lower bound in degrees C, points), highest tier first.
const AIR_TEMPERATURE_TIERS: [(f64, u32); 4] = [(35.0, 50), (32.0, 35), (30.0, 20), (25.0, 10)];
const SOIL_TEMPERATURE_TIERS: [(f64, u32); 4] = [(30.0, 25), (28.0, 15), (26.0, 10), (24.0, 5)];
/// (exclusive upper bound in percent, points), lowest tier first.
const SOIL_MOISTURE_TIERS: [(f64, u32); 3] = [(20.0, 15), (30.0, 10), (40.0, 5)];
const HUMIDITY_TIERS: [(f64, u32); 2] = [(30.0, 10), (50.0, 5)];

const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatStressLevel {
    Minimal,
    Low,
    Moderate,
    High,
    Critical,
}

impl HeatStressLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            70.. => HeatStressLevel::Critical,
            50..=69 => HeatStressLevel::High,
            30..=49 => HeatStressLevel::Moderate,
            15..=29 => HeatStressLevel::Low,
            _ => HeatStressLevel::Minimal,
        }
    }

    /// Parses a stored label. Unknown or missing labels are `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "minimal" => Some(HeatStressLevel::Minimal),
            "low" => Some(HeatStressLevel::Low),
            "moderate" => Some(HeatStressLevel::Moderate),
            "high" => Some(HeatStressLevel::High),
            "critical" => Some(HeatStressLevel::Critical),
            _ => None,
        }
    }

    /// Position on the 0-4 scale.
    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeatStressLevel::Minimal => "minimal",
            HeatStressLevel::Low => "low",
            HeatStressLevel::Moderate => "moderate",
            HeatStressLevel::High => "high",
            HeatStressLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for HeatStressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated microclimate readings: degrees C and percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatStressInputs {
    pub air_temperature: f64,
    pub soil_temperature: f64,
    pub soil_moisture: f64,
    pub relative_humidity: f64,
}

/// Raw, possibly incomplete microclimate values as submitted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MicroclimateInput {
    pub air_temperature: Option<f64>,
    pub soil_temperature: Option<f64>,
    pub soil_moisture: Option<f64>,
    pub relative_humidity: Option<f64>,
}

impl MicroclimateInput {
    /// Parses text form fields. Blank fields become `None`; anything else must parse as a number.
    pub fn from_fields(
        air_temperature: &str,
        soil_temperature: &str,
        soil_moisture: &str,
        relative_humidity: &str,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            air_temperature: parse_field("air_temperature", air_temperature)?,
            soil_temperature: parse_field("soil_temperature", soil_temperature)?,
            soil_moisture: parse_field("soil_moisture", soil_moisture)?,
            relative_humidity: parse_field("relative_humidity", relative_humidity)?,
        })
    }

    /// Rejects missing or non-finite values.
    pub fn validate(&self) -> Result<HeatStressInputs, ValidationError> {
        Ok(HeatStressInputs {
            air_temperature: require("air_temperature", self.air_temperature)?,
            soil_temperature: require("soil_temperature", self.soil_temperature)?,
            soil_moisture: require("soil_moisture", self.soil_moisture)?,
            relative_humidity: require("relative_humidity", self.relative_humidity)?,
        })
    }
}

fn parse_field(field: &'static str, raw: &str) -> Result<Option<f64>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| ValidationError::new(field, format!("{raw:?} is not a number")))
}

fn require(field: &'static str, value: Option<f64>) -> Result<f64, ValidationError> {
    match value {
        None => Err(ValidationError::new(field, "missing")),
        Some(v) if !v.is_finite() => Err(ValidationError::new(field, "not a finite number")),
        Some(v) => Ok(v),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatStressAssessment {
    /// Additive points, 0-100.
    pub score: u32,
    pub level: HeatStressLevel,
}

/// Additive point score, clamped to 0-100.
pub fn heat_stress_score(inputs: &HeatStressInputs) -> u32 {
    let total = points_above(inputs.air_temperature, &AIR_TEMPERATURE_TIERS)
        + points_above(inputs.soil_temperature, &SOIL_TEMPERATURE_TIERS)
        + points_below(inputs.soil_moisture, &SOIL_MOISTURE_TIERS)
        + points_below(inputs.relative_humidity, &HUMIDITY_TIERS);
    total.min(MAX_SCORE)
}

fn points_above(value: f64, tiers: &[(f64, u32)]) -> u32 {
    tiers
        .iter()
        .find(|(bound, _)| value > *bound)
        .map_or(0, |&(_, points)| points)
}

fn points_below(value: f64, tiers: &[(f64, u32)]) -> u32 {
    tiers
        .iter()
        .find(|(bound, _)| value < *bound)
        .map_or(0, |&(_, points)| points)
}

pub fn score_heat_stress(inputs: &HeatStressInputs) -> HeatStressAssessment {
    let score = heat_stress_score(inputs);
    HeatStressAssessment {
        score,
        level: HeatStressLevel::from_score(score),
    }
}
