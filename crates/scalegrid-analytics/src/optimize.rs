//! Automatic optimization pass.
//!
//! Records what an operator (or external executor) should adjust. The
//! scaling config itself is never changed here.

use serde::Serialize;
use tracing::info;

use scalegrid_core::{next_id, ScalingConfig, TrackedMetric};

use crate::forecast::PRESSURE_RATIO;
use crate::patterns::{PatternAnalysis, Trend};

/// Efficiency below which thresholds are adjusted.
pub const OPTIMIZE_EFFICIENCY: f64 = 0.8;

pub const OPERATING_OPTIMALLY: &str = "scaling is operating optimally";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationKind {
    AdjustedThresholds,
    ProactiveScaling,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationAction {
    pub kind: OptimizationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<TrackedMetric>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub optimization_id: String,
    pub actions_taken: Vec<OptimizationAction>,
    pub recommendations: Vec<String>,
    pub scaling_efficiency: f64,
    pub timestamp: u64,
}

/// Run one optimization pass over a pattern analysis.
pub fn optimize(analysis: &PatternAnalysis, config: &ScalingConfig) -> OptimizationResult {
    let actions = optimization_actions(analysis, config);

    let recommendations = if actions.is_empty() {
        vec![OPERATING_OPTIMALLY.to_string()]
    } else {
        actions.iter().map(|a| a.description.clone()).collect()
    };

    info!(
        actions = actions.len(),
        efficiency = analysis.scaling_efficiency,
        "automatic scaling optimization"
    );

    OptimizationResult {
        optimization_id: next_id("optimization"),
        actions_taken: actions,
        recommendations,
        scaling_efficiency: analysis.scaling_efficiency,
        timestamp: analysis.generated_at,
    }
}

/// Human-readable recommendations, shared with reporting.
pub fn recommendations(analysis: &PatternAnalysis, config: &ScalingConfig) -> Vec<String> {
    let mut out: Vec<String> = optimization_actions(analysis, config)
        .into_iter()
        .map(|a| a.description)
        .collect();

    for metric in TrackedMetric::ALL {
        if let Some(summary) = analysis.metric(metric)
            && summary.trend == Trend::Decreasing
            && summary.avg < config.threshold_for(metric) * 0.5
        {
            out.push(format!("{metric} is falling well below target, consider scaling in"));
        }
    }

    if out.is_empty() {
        out.push(OPERATING_OPTIMALLY.to_string());
    }
    out
}

fn optimization_actions(
    analysis: &PatternAnalysis,
    config: &ScalingConfig,
) -> Vec<OptimizationAction> {
    let mut actions = Vec::new();

    if analysis.decisions_analyzed > 0 && analysis.scaling_efficiency < OPTIMIZE_EFFICIENCY {
        actions.push(OptimizationAction {
            kind: OptimizationKind::AdjustedThresholds,
            metric: None,
            description: format!(
                "adjusted thresholds, scaling efficiency is {:.2}",
                analysis.scaling_efficiency
            ),
        });
    }

    for metric in TrackedMetric::ALL {
        if let Some(summary) = analysis.metric(metric)
            && summary.trend == Trend::Increasing
            && summary.avg > config.threshold_for(metric) * PRESSURE_RATIO
        {
            actions.push(OptimizationAction {
                kind: OptimizationKind::ProactiveScaling,
                metric: Some(metric),
                description: format!("proactive scaling for rising {metric}"),
            });
        }
    }

    actions
}
