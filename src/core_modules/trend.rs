// THEORY:
// The community aggregator summarizes what everyone in an area has reported
// recently. Pest counts and heat-stress labels are two instances of one shape:
//
// 1.  **Ordinal mapping**: every row becomes a 0-4 level (pest count buckets,
//     or the stored heat label).
// 2.  **Averaging**: plain mean of the levels; no recency weighting here.
// 3.  **Banding**: the mean is looked up in a descending threshold table that
//     yields the trend label, the level label and a fixed confidence.
// 4.  **Context**: share of rows at level 3 or above, rows in the last 24 hours
//     relative to an injected `now`, and the area's participant count, which the
//     caller fetches separately over all history.
//
// The shape lives once in `aggregate`; a `TrendProfile` supplies the per-kind
// constants. Nothing here touches the store: fetching, and turning a store
// failure into the degraded "error" trend, is the caller's job.

use crate::core_modules::classifier::pest_level;
use crate::core_modules::heat_stress::HeatStressLevel;
use crate::store::{MicroclimateReading, PestReading};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

const HIGH_ACTIVITY_LEVEL: u8 = 3;
const RECENT_ACTIVITY_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendKind {
    Pest,
    Heat,
}

/// Which window of community rows to aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendScope {
    #[default]
    Recent,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// One row of a threshold table.
#[derive(Debug, Clone, Copy)]
pub struct TrendBand {
    /// Inclusive lower bound on the average level.
    pub min_average: f64,
    pub trend: &'static str,
    pub level: &'static str,
    pub confidence: Confidence,
    pub summary: &'static str,
}

/// Per-kind constants for [`aggregate`].
#[derive(Debug, Clone, Copy)]
pub struct TrendProfile {
    pub kind: TrendKind,
    /// Descending by `min_average`.
    pub bands: &'static [TrendBand],
    /// Used when no band matches.
    pub floor: TrendBand,
    pub no_data_level: &'static str,
}

pub const PEST_PROFILE: TrendProfile = TrendProfile {
    kind: TrendKind::Pest,
    bands: &[
        TrendBand {
            min_average: 3.5,
            trend: "rising_significantly",
            level: "high",
            confidence: Confidence::High,
            summary: "Pest activity in this area is rising significantly.",
        },
        TrendBand {
            min_average: 2.5,
            trend: "rising_moderately",
            level: "moderate",
            confidence: Confidence::Medium,
            summary: "Pest activity in this area is rising moderately.",
        },
        TrendBand {
            min_average: 1.5,
            trend: "stable_moderate",
            level: "moderate",
            confidence: Confidence::High,
            summary: "Pest activity in this area is stable at a moderate level.",
        },
    ],
    floor: TrendBand {
        min_average: 0.0,
        trend: "stable_low",
        level: "low",
        confidence: Confidence::High,
        summary: "Pest activity in this area is low and stable.",
    },
    no_data_level: "low",
};

pub const HEAT_PROFILE: TrendProfile = TrendProfile {
    kind: TrendKind::Heat,
    bands: &[
        TrendBand {
            min_average: 3.5,
            trend: "critical_conditions",
            level: "critical",
            confidence: Confidence::High,
            summary: "Farms in this area report critical heat stress.",
        },
        TrendBand {
            min_average: 2.5,
            trend: "elevated_conditions",
            level: "high",
            confidence: Confidence::Medium,
            summary: "Farms in this area report elevated heat stress.",
        },
        TrendBand {
            min_average: 1.5,
            trend: "moderate_conditions",
            level: "moderate",
            confidence: Confidence::Medium,
            summary: "Farms in this area report moderate heat stress.",
        },
        TrendBand {
            min_average: 0.5,
            trend: "mild_conditions",
            level: "low",
            confidence: Confidence::High,
            summary: "Farms in this area report mild heat stress.",
        },
    ],
    floor: TrendBand {
        min_average: 0.0,
        trend: "optimal_conditions",
        level: "minimal",
        confidence: Confidence::High,
        summary: "Growing conditions in this area are optimal.",
    },
    no_data_level: "minimal",
};

impl TrendProfile {
    pub fn for_kind(kind: TrendKind) -> &'static TrendProfile {
        match kind {
            TrendKind::Pest => &PEST_PROFILE,
            TrendKind::Heat => &HEAT_PROFILE,
        }
    }

    pub fn band_for(&self, average: f64) -> &TrendBand {
        self.bands
            .iter()
            .find(|band| average >= band.min_average)
            .unwrap_or(&self.floor)
    }
}

/// Unweighted means of the sampled heat rows, for descriptive text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateMeans {
    pub air_temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub soil_moisture: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityTrend {
    pub kind: TrendKind,
    pub trend: String,
    /// Pest: low/moderate/high. Heat: minimal..critical. "unknown" when degraded.
    pub level: String,
    pub description: String,
    /// Distinct submitters in the area over all history.
    pub participation: u64,
    /// Share of sampled rows at level 3 or above.
    pub participation_rate: f64,
    pub average_level: f64,
    pub confidence: Confidence,
    pub sample_size: usize,
    pub recent_activity: usize,
    pub recent_activity_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub climate: Option<ClimateMeans>,
}

impl CommunityTrend {
    pub fn no_data(kind: TrendKind) -> Self {
        let profile = TrendProfile::for_kind(kind);
        Self {
            kind,
            trend: "no_data".to_string(),
            level: profile.no_data_level.to_string(),
            description: "No community reports for this area yet.".to_string(),
            participation: 0,
            participation_rate: 0.0,
            average_level: 0.0,
            confidence: Confidence::Low,
            sample_size: 0,
            recent_activity: 0,
            recent_activity_text: recent_activity_text(0),
            climate: None,
        }
    }

    /// Stand-in result when the underlying data could not be fetched.
    pub fn degraded(kind: TrendKind) -> Self {
        Self {
            trend: "error".to_string(),
            level: "unknown".to_string(),
            description: "Community trend is temporarily unavailable.".to_string(),
            ..Self::no_data(kind)
        }
    }
}

/// The shared aggregation routine. Returns the no-data result for an empty window.
pub fn aggregate<T>(
    profile: &TrendProfile,
    rows: &[T],
    ordinal: impl Fn(&T) -> u8,
    created_at: impl Fn(&T) -> DateTime<Utc>,
    participants: u64,
    now: DateTime<Utc>,
) -> CommunityTrend {
    if rows.is_empty() {
        return CommunityTrend::no_data(profile.kind);
    }

    let n = rows.len();
    let levels: Vec<u8> = rows.iter().map(&ordinal).collect();
    let average_level = levels.iter().map(|&l| l as f64).sum::<f64>() / n as f64;
    let high = levels.iter().filter(|&&l| l >= HIGH_ACTIVITY_LEVEL).count();
    let participation_rate = high as f64 / n as f64;

    let since = now - Duration::hours(RECENT_ACTIVITY_HOURS);
    let recent_activity = rows.iter().filter(|&r| created_at(r) >= since).count();

    let band = profile.band_for(average_level);
    CommunityTrend {
        kind: profile.kind,
        trend: band.trend.to_string(),
        level: band.level.to_string(),
        description: format!(
            "{} {:.0}% of {} recent reports show high levels.",
            band.summary,
            participation_rate * 100.0,
            n
        ),
        participation: participants,
        participation_rate,
        average_level,
        confidence: band.confidence,
        sample_size: n,
        recent_activity,
        recent_activity_text: recent_activity_text(recent_activity),
        climate: None,
    }
}

pub fn pest_trend(
    readings: &[PestReading],
    participants: u64,
    now: DateTime<Utc>,
) -> CommunityTrend {
    aggregate(
        &PEST_PROFILE,
        readings,
        |r| pest_level(r.estimated_pest_count),
        |r| r.created_at,
        participants,
        now,
    )
}

pub fn heat_trend(
    readings: &[MicroclimateReading],
    participants: u64,
    now: DateTime<Utc>,
) -> CommunityTrend {
    let mut trend = aggregate(
        &HEAT_PROFILE,
        readings,
        |r| {
            r.heat_stress_level
                .as_deref()
                .and_then(HeatStressLevel::parse)
                .map_or(0, HeatStressLevel::level)
        },
        |r| r.created_at,
        participants,
        now,
    );
    if readings.is_empty() {
        return trend;
    }

    let means = ClimateMeans {
        air_temperature: mean(readings.iter().map(|r| r.air_temperature)),
        relative_humidity: mean(readings.iter().map(|r| r.relative_humidity)),
        soil_moisture: mean(readings.iter().map(|r| r.soil_moisture)),
    };
    let mut context = Vec::new();
    if let Some(t) = means.air_temperature {
        context.push(format!("air {t:.1}\u{b0}C"));
    }
    if let Some(h) = means.relative_humidity {
        context.push(format!("humidity {h:.0}%"));
    }
    if let Some(m) = means.soil_moisture {
        context.push(format!("soil moisture {m:.0}%"));
    }
    if !context.is_empty() {
        trend.description = format!("{} Average {}.", trend.description, context.join(", "));
    }
    trend.climate = Some(means);
    trend
}

/// Mean of the present, finite values.
fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn recent_activity_text(count: usize) -> String {
    match count {
        0 => "No reports in the last 24 hours".to_string(),
        1 => "1 report in the last 24 hours".to_string(),
        n => format!("{n} reports in the last 24 hours"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{epoch, heat_reading, pest_history};

    fn pest_rows(counts: &[i64]) -> Vec<PestReading> {
        let counts: Vec<Option<i64>> = counts.iter().map(|&c| Some(c)).collect();
        pest_history("ana", "KE", &counts)
    }

    fn heat_rows(levels: &[Option<&str>]) -> Vec<MicroclimateReading> {
        levels
            .iter()
            .enumerate()
            .map(|(i, level)| {
                let at = epoch() - Duration::hours(i as i64);
                heat_reading(i as u64, "ana", "KE", *level, at)
            })
            .collect()
    }

    #[test]
    fn empty_windows_report_no_data() {
        let pest = pest_trend(&[], 0, epoch());
        assert_eq!(pest.trend, "no_data");
        assert_eq!(pest.level, "low");
        assert_eq!(pest.confidence, Confidence::Low);
        assert_eq!(pest.participation, 0);

        let heat = heat_trend(&[], 0, epoch());
        assert_eq!(heat.trend, "no_data");
        assert_eq!(heat.level, "minimal");
        assert!(heat.climate.is_none());
    }

    #[test]
    fn pest_bands() {
        let cases: [(&[i64], &str, &str, Confidence); 4] = [
            (&[100, 100, 30, 30], "rising_significantly", "high", Confidence::High),
            (&[20, 20, 20], "rising_moderately", "moderate", Confidence::Medium),
            (&[8, 8, 3, 20], "stable_moderate", "moderate", Confidence::High),
            (&[0, 1, 4, 8], "stable_low", "low", Confidence::High),
        ];
        for (counts, trend, level, confidence) in cases {
            let result = pest_trend(&pest_rows(counts), 7, epoch());
            assert_eq!(result.trend, trend, "{counts:?}");
            assert_eq!(result.level, level, "{counts:?}");
            assert_eq!(result.confidence, confidence, "{counts:?}");
            assert_eq!(result.participation, 7);
            assert_eq!(result.sample_size, counts.len());
        }
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert_eq!(PEST_PROFILE.band_for(3.5).trend, "rising_significantly");
        assert_eq!(PEST_PROFILE.band_for(3.49).trend, "rising_moderately");
        assert_eq!(PEST_PROFILE.band_for(1.5).trend, "stable_moderate");
        assert_eq!(PEST_PROFILE.band_for(1.49).trend, "stable_low");
        assert_eq!(HEAT_PROFILE.band_for(0.5).trend, "mild_conditions");
        assert_eq!(HEAT_PROFILE.band_for(0.49).trend, "optimal_conditions");
    }

    #[test]
    fn participation_rate_counts_high_levels() {
        // Levels 4, 3, 0, 0.
        let result = pest_trend(&pest_rows(&[50, 20, 0, 0]), 2, epoch());
        assert_eq!(result.participation_rate, 0.5);
        assert_eq!(result.average_level, 1.75);
        assert!(result.description.contains("50% of 4"));
    }

    #[test]
    fn recent_activity_uses_injected_now() {
        // Rows at now, -1h, ..., -29h.
        let rows = pest_rows(&[1; 30]);
        let at_epoch = pest_trend(&rows, 1, epoch());
        assert_eq!(at_epoch.recent_activity, 25);
        assert_eq!(at_epoch.recent_activity_text, "25 reports in the last 24 hours");

        let next_day = pest_trend(&rows, 1, epoch() + Duration::hours(23));
        assert_eq!(next_day.recent_activity, 2);

        let much_later = pest_trend(&rows, 1, epoch() + Duration::days(30));
        assert_eq!(much_later.recent_activity, 0);
        assert_eq!(much_later.recent_activity_text, "No reports in the last 24 hours");
    }

    #[test]
    fn heat_bands_and_unknown_labels() {
        let rows = heat_rows(&[Some("critical"), Some("critical"), Some("high")]);
        let critical = heat_trend(&rows, 3, epoch());
        assert_eq!(critical.trend, "critical_conditions");
        assert_eq!(critical.level, "critical");

        let elevated = heat_trend(&heat_rows(&[Some("high"), Some("high")]), 3, epoch());
        assert_eq!(elevated.trend, "elevated_conditions");
        assert_eq!(elevated.confidence, Confidence::Medium);

        // Unknown and missing labels count as level 0: (2 + 0 + 0) / 3.
        let rows = heat_rows(&[Some("moderate"), Some("scorching"), None]);
        let mixed = heat_trend(&rows, 3, epoch());
        assert!((mixed.average_level - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(mixed.trend, "mild_conditions");
        assert_eq!(mixed.level, "low");

        let calm = heat_trend(&heat_rows(&[Some("minimal")]), 1, epoch());
        assert_eq!(calm.trend, "optimal_conditions");
        assert_eq!(calm.level, "minimal");
    }

    #[test]
    fn heat_trend_reports_climate_means() {
        let mut rows = heat_rows(&[Some("low"), Some("low")]);
        rows[0].air_temperature = Some(34.0);
        rows[1].air_temperature = Some(30.0);
        rows[1].relative_humidity = None;
        let result = heat_trend(&rows, 1, epoch());
        let climate = result.climate.unwrap();
        assert_eq!(climate.air_temperature, Some(32.0));
        assert_eq!(climate.relative_humidity, Some(55.0));
        assert_eq!(climate.soil_moisture, Some(35.0));
        assert!(result.description.contains("air 32.0"));
    }

    #[test]
    fn degraded_result_shape() {
        let result = CommunityTrend::degraded(TrendKind::Heat);
        assert_eq!(result.trend, "error");
        assert_eq!(result.level, "unknown");
        assert_eq!(result.confidence, Confidence::Low);
        assert_eq!(result.kind, TrendKind::Heat);
    }

    #[test]
    fn aggregation_is_repeatable() {
        let rows = pest_rows(&[3, 40, 7, 0, 13]);
        let first = pest_trend(&rows, 4, epoch());
        assert_eq!(pest_trend(&rows, 4, epoch()), first);
    }
}
