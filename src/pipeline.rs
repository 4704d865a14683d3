// THEORY:
// The `pipeline` module is the top-level API for the engine. `TrapAnalyzer`
// bundles the configuration and exposes the operations a web or CLI front end
// calls, each one a thin composition of the pure `core_modules`:
//
// - `segment_image` / `analyze_upload`: photo -> blob count -> category.
// - `forecast_individual_risk`: one grower's history -> risk score.
// - `aggregate_community_trend`: an area's history -> trend label.
// - `score_heat_stress`: four readings -> stress level.
//
// The analyzer holds no mutable state, so one instance can be shared freely
// across requests. Error policy differs per operation on purpose: a broken
// image or an unreachable store is a hard failure for the caller's own
// analyses, while community trends degrade to an "error" result so a dashboard
// keeps rendering.

use crate::config::AppConfig;
use crate::core_modules::advice::{heat_advice, pest_advice, risk_advice};
use crate::core_modules::classifier::{self, PestCategory};
use crate::core_modules::forecaster::{self, RiskAssessment};
use crate::core_modules::heat_stress::{self, HeatStressAssessment, MicroclimateInput};
use crate::core_modules::segmenter::{AnalysisResult, Segmenter};
use crate::core_modules::trend::{self, CommunityTrend, TrendKind, TrendScope};
use crate::error::{DecodeError, StoreError, ValidationError};
use crate::store::ReadingStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::forecaster::{RiskDetails, RiskLevel};
pub use crate::core_modules::heat_stress::HeatStressLevel;
pub use crate::core_modules::trend::Confidence;

/// Segmentation, category and advice for one uploaded trap photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadAnalysis {
    #[serde(flatten)]
    pub analysis: AnalysisResult,
    pub category: PestCategory,
    pub advice: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskReport {
    #[serde(flatten)]
    pub assessment: RiskAssessment,
    pub advice: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatStressReport {
    #[serde(flatten)]
    pub assessment: HeatStressAssessment,
    pub advice: &'static str,
}

/// The main, top-level entry point for the engine.
#[derive(Debug, Clone, Default)]
pub struct TrapAnalyzer {
    config: AppConfig,
    segmenter: Segmenter,
}

impl TrapAnalyzer {
    pub fn new(config: AppConfig) -> Self {
        let segmenter = Segmenter::new(config.segmenter);
        Self { config, segmenter }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn segment_image(&self, bytes: &[u8]) -> Result<AnalysisResult, DecodeError> {
        self.segmenter.segment_bytes(bytes)
    }

    /// Runs the segmentation on the blocking pool, off the async worker threads.
    pub async fn segment_image_async(&self, bytes: Vec<u8>) -> Result<AnalysisResult, DecodeError> {
        let segmenter = self.segmenter;
        tokio::task::spawn_blocking(move || segmenter.segment_bytes(&bytes))
            .await
            .map_err(|e| DecodeError::Aborted(e.to_string()))?
    }

    pub fn classify_pest_amount(
        &self,
        estimated_count: Option<i64>,
        dark_pixel_ratio: f64,
    ) -> PestCategory {
        classifier::classify(estimated_count, dark_pixel_ratio)
    }

    pub fn analyze_upload(&self, bytes: &[u8]) -> Result<UploadAnalysis, DecodeError> {
        let analysis = self.segment_image(bytes)?;
        Ok(self.classify_analysis(analysis))
    }

    /// Attaches category and advice to a finished segmentation.
    pub fn classify_analysis(&self, analysis: AnalysisResult) -> UploadAnalysis {
        let count = i64::try_from(analysis.blob_count).unwrap_or(i64::MAX);
        let category = self.classify_pest_amount(Some(count), analysis.dark_pixel_ratio);
        UploadAnalysis {
            analysis,
            category,
            advice: pest_advice(category),
        }
    }

    /// Forecasts one grower's risk in one area. An unreachable store is an
    /// error; an empty history is the normal no-data forecast.
    pub fn forecast_individual_risk<S: ReadingStore + ?Sized>(
        &self,
        store: &S,
        user: &str,
        area: &str,
    ) -> Result<RiskReport, StoreError> {
        let history = store.pest_readings(user, area, self.config.community.individual_limit)?;
        let assessment = forecaster::forecast(&history);
        debug!(
            user,
            area,
            readings = history.len(),
            risk_score = assessment.risk_score,
            "forecast individual risk"
        );
        Ok(RiskReport {
            advice: risk_advice(assessment.risk_level),
            assessment,
        })
    }

    /// Aggregates an area's readings. Store failures are logged and turned into
    /// the degraded "error" trend instead of propagating.
    pub fn aggregate_community_trend<S: ReadingStore + ?Sized>(
        &self,
        store: &S,
        area: &str,
        kind: TrendKind,
        scope: TrendScope,
        now: DateTime<Utc>,
    ) -> CommunityTrend {
        let limit = match scope {
            TrendScope::Recent => self.config.community.recent_limit,
            TrendScope::All => self.config.community.all_limit,
        };

        let result = match kind {
            TrendKind::Pest => store.community_pest_readings(area, limit).and_then(|rows| {
                let participants = store.participant_count(area)?;
                Ok(trend::pest_trend(&rows, participants, now))
            }),
            TrendKind::Heat => store.community_microclimate_readings(area, limit).and_then(|rows| {
                let participants = store.participant_count(area)?;
                Ok(trend::heat_trend(&rows, participants, now))
            }),
        };

        result.unwrap_or_else(|err| {
            warn!(area, ?kind, error = %err, "community trend degraded");
            CommunityTrend::degraded(kind)
        })
    }

    pub fn score_heat_stress(
        &self,
        input: &MicroclimateInput,
    ) -> Result<HeatStressReport, ValidationError> {
        let inputs = input.validate()?;
        let assessment = heat_stress::score_heat_stress(&inputs);
        Ok(HeatStressReport {
            advice: heat_advice(assessment.level),
            assessment,
        })
    }
}
