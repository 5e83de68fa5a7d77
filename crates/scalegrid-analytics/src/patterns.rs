//! Scaling pattern analysis.
//!
//! For each tracked metric over the requested window:
//!
//! ```text
//! min / avg / max
//! trend = increasing  if avg(second half) > avg(first half) * 1.1
//!         decreasing  if avg(second half) < avg(first half) * 0.9
//!         stable      otherwise, or with 10 samples or fewer
//! ```
//!
//! `scaling_efficiency` is the fraction of window decisions whose
//! confidence exceeds 0.7.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use scalegrid_core::{ScalingDecision, ScalingMetrics, TrackedMetric};

use crate::error::{AnalyticsError, AnalyticsResult};

/// Samples required before a trend is classified.
pub const MIN_TREND_SAMPLES: usize = 10;

/// Half-over-half change needed to leave `stable`.
pub const TREND_BAND: f64 = 0.1;

/// Decisions above this confidence count as efficient.
pub const EFFICIENT_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
    pub trend: Trend,
    /// Newer-half average minus older-half average; zero without a trend.
    pub half_delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternAnalysis {
    pub time_range_hours: u64,
    pub samples_analyzed: usize,
    pub decisions_analyzed: usize,
    /// Keyed by metric name. Empty when the window holds no samples.
    pub metrics: BTreeMap<String, MetricSummary>,
    /// In `[0, 1]`; zero when the window holds no decisions.
    pub scaling_efficiency: f64,
    pub action_counts: BTreeMap<String, usize>,
    pub generated_at: u64,
}

impl PatternAnalysis {
    pub fn metric(&self, metric: TrackedMetric) -> Option<&MetricSummary> {
        self.metrics.get(metric.as_str())
    }
}

/// Analyze samples and decisions stamped within `hours` of `now`.
pub fn analyze_patterns(
    samples: &[ScalingMetrics],
    decisions: &[ScalingDecision],
    hours: u64,
    now: u64,
) -> AnalyticsResult<PatternAnalysis> {
    if hours == 0 {
        return Err(AnalyticsError::InvalidTimeRange(hours));
    }
    let cutoff = now.saturating_sub(hours.saturating_mul(3600));

    let window: Vec<&ScalingMetrics> = samples.iter().filter(|s| s.timestamp >= cutoff).collect();
    let window_decisions: Vec<&ScalingDecision> =
        decisions.iter().filter(|d| d.timestamp >= cutoff).collect();

    let mut metrics = BTreeMap::new();
    if !window.is_empty() {
        for metric in TrackedMetric::ALL {
            let values: Vec<f64> = window.iter().map(|s| s.metric(metric)).collect();
            metrics.insert(metric.as_str().to_string(), summarize(&values));
        }
    }

    let mut action_counts = BTreeMap::new();
    for decision in &window_decisions {
        *action_counts
            .entry(decision.action.as_str().to_string())
            .or_insert(0) += 1;
    }

    let scaling_efficiency = efficiency(&window_decisions);

    debug!(
        hours,
        samples = window.len(),
        decisions = window_decisions.len(),
        scaling_efficiency,
        "scaling patterns analyzed"
    );

    Ok(PatternAnalysis {
        time_range_hours: hours,
        samples_analyzed: window.len(),
        decisions_analyzed: window_decisions.len(),
        metrics,
        scaling_efficiency,
        action_counts,
        generated_at: now,
    })
}

fn summarize(values: &[f64]) -> MetricSummary {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = mean(values);
    let (trend, half_delta) = trend_with_delta(values);
    MetricSummary {
        min,
        avg,
        max,
        trend,
        half_delta,
    }
}

/// Classify the half-over-half trend of a series.
pub fn classify_trend(values: &[f64]) -> Trend {
    trend_with_delta(values).0
}

/// Newer-half average minus older-half average, or zero for short series.
pub fn half_delta(values: &[f64]) -> f64 {
    trend_with_delta(values).1
}

fn trend_with_delta(values: &[f64]) -> (Trend, f64) {
    if values.len() <= MIN_TREND_SAMPLES {
        return (Trend::Stable, 0.0);
    }
    let (first, second) = values.split_at(values.len() / 2);
    let first_avg = mean(first);
    let second_avg = mean(second);
    let delta = second_avg - first_avg;

    let trend = if second_avg > first_avg * (1.0 + TREND_BAND) {
        Trend::Increasing
    } else if second_avg < first_avg * (1.0 - TREND_BAND) {
        Trend::Decreasing
    } else {
        Trend::Stable
    };
    (trend, delta)
}

fn efficiency(decisions: &[&ScalingDecision]) -> f64 {
    if decisions.is_empty() {
        return 0.0;
    }
    let confident = decisions
        .iter()
        .filter(|d| d.confidence > EFFICIENT_CONFIDENCE)
        .count();
    (confident as f64 / decisions.len() as f64).clamp(0.0, 1.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
