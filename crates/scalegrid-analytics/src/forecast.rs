//! Forecasting of upcoming scaling needs.
//!
//! Built on pattern analysis. Three kinds of prediction are raised:
//! - **performance pressure** — a metric trending up while its average
//!   sits above 80% of its threshold
//! - **resource exhaustion** — CPU or memory averaging above 85%
//! - **scaling efficiency** — fewer than 70% of decisions were confident

use serde::Serialize;
use tracing::debug;

use scalegrid_core::{ScalingConfig, TrackedMetric};

use crate::patterns::{PatternAnalysis, Trend, EFFICIENT_CONFIDENCE};

/// Fraction of a metric's threshold that counts as "close to it".
pub const PRESSURE_RATIO: f64 = 0.8;

/// CPU or memory average (percent) treated as exhaustion.
pub const EXHAUSTION_LEVEL: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    PerformancePressure,
    ResourceExhaustion,
    ScalingEfficiency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub kind: PredictionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<TrackedMetric>,
    pub confidence: f64,
    pub severity: Severity,
    pub time_horizon_minutes: u64,
    pub observed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    pub recommendation: String,
}

/// Derive predictions for the next `horizon_minutes` from an analysis.
pub fn predict_scaling_needs(
    analysis: &PatternAnalysis,
    config: &ScalingConfig,
    horizon_minutes: u64,
) -> Vec<Prediction> {
    let mut predictions = Vec::new();

    for metric in TrackedMetric::ALL {
        let Some(summary) = analysis.metric(metric) else {
            continue;
        };
        let threshold = config.threshold_for(metric);
        if summary.trend == Trend::Increasing && summary.avg > threshold * PRESSURE_RATIO {
            predictions.push(Prediction {
                kind: PredictionKind::PerformancePressure,
                metric: Some(metric),
                confidence: 0.8,
                severity: Severity::Warning,
                time_horizon_minutes: horizon_minutes,
                observed: summary.avg,
                threshold: Some(threshold),
                recommendation: format!("scale up ahead of rising {metric}"),
            });
        }
    }

    for metric in [TrackedMetric::CpuUtilization, TrackedMetric::MemoryUtilization] {
        if let Some(summary) = analysis.metric(metric)
            && summary.avg > EXHAUSTION_LEVEL
        {
            predictions.push(Prediction {
                kind: PredictionKind::ResourceExhaustion,
                metric: Some(metric),
                confidence: 0.9,
                severity: Severity::Critical,
                time_horizon_minutes: horizon_minutes,
                observed: summary.avg,
                threshold: Some(EXHAUSTION_LEVEL),
                recommendation: format!("add capacity immediately, {metric} is near exhaustion"),
            });
        }
    }

    if analysis.decisions_analyzed > 0 && analysis.scaling_efficiency < EFFICIENT_CONFIDENCE {
        predictions.push(Prediction {
            kind: PredictionKind::ScalingEfficiency,
            metric: None,
            confidence: 0.7,
            severity: Severity::Info,
            time_horizon_minutes: horizon_minutes,
            observed: analysis.scaling_efficiency,
            threshold: Some(EFFICIENT_CONFIDENCE),
            recommendation: "review scaling thresholds, decisions lack confidence".to_string(),
        });
    }

    debug!(
        horizon_minutes,
        predictions = predictions.len(),
        "scaling needs predicted"
    );
    predictions
}
