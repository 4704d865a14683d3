// Advice text keyed by the ordinal outputs of the scorers. Static lookups only;
// presentation (translation, markup) belongs to the caller.

use crate::core_modules::classifier::PestCategory;
use crate::core_modules::forecaster::RiskLevel;
use crate::core_modules::heat_stress::HeatStressLevel;

pub fn pest_advice(category: PestCategory) -> &'static str {
    match category {
        PestCategory::VeryLow => "Very few insects on the trap. Keep monitoring weekly.",
        PestCategory::Low => "Low insect presence. Continue regular monitoring and field hygiene.",
        PestCategory::Moderate => {
            "Moderate insect presence. Inspect plants closely and replace traps more often."
        }
        PestCategory::High => {
            "High insect presence. Scout the field now and prepare a control measure."
        }
        PestCategory::VeryHigh => {
            "Very high insect presence. Act immediately and consult your extension officer."
        }
    }
}

pub fn risk_advice(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "Pest risk is low. Keep uploading trap photos to track changes.",
        RiskLevel::Medium => "Pest risk is rising. Increase trap checks to twice a week.",
        RiskLevel::High => "Pest risk is high. Apply control measures and check traps daily.",
    }
}

pub fn heat_advice(level: HeatStressLevel) -> &'static str {
    match level {
        HeatStressLevel::Minimal => "Conditions are comfortable for the crop.",
        HeatStressLevel::Low => "Mild heat. Keep soil moisture steady.",
        HeatStressLevel::Moderate => {
            "Moderate heat stress. Irrigate early in the day and mulch exposed soil."
        }
        HeatStressLevel::High => {
            "High heat stress. Irrigate more often and provide shade where possible."
        }
        HeatStressLevel::Critical => {
            "Critical heat stress. Irrigate immediately and avoid field work at midday."
        }
    }
}
