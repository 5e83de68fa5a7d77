//! Scaling reports.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use scalegrid_core::{next_id, ScalingConfig, ScalingDecision, ScalingMetrics, ScalingStatus};

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::optimize::recommendations;
use crate::patterns::{analyze_patterns, PatternAnalysis};

/// Decisions tallied in the recent-decisions section.
pub const RECENT_DECISIONS: usize = 10;

/// Window used for the pattern section of comprehensive reports.
pub const REPORT_WINDOW_HOURS: u64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    /// Counts and status only.
    Summary,
    /// Summary plus the latest sample and recent decisions.
    Performance,
    /// Everything, including patterns and recommendations.
    Comprehensive,
}

impl FromStr for ReportKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(ReportKind::Summary),
            "performance" => Ok(ReportKind::Performance),
            "comprehensive" => Ok(ReportKind::Comprehensive),
            other => Err(AnalyticsError::UnknownReportKind(other.to_string())),
        }
    }
}

/// Manager state copied at report time.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub samples: &'a [ScalingMetrics],
    pub decisions: &'a [ScalingDecision],
    pub current_instances: u32,
    pub target_instances: u32,
    pub status: ScalingStatus,
    pub config: &'a ScalingConfig,
    pub now: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_metrics_recorded: usize,
    pub total_scaling_decisions: usize,
    pub current_instances: u32,
    pub target_instances: u32,
    pub scaling_status: ScalingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionTally {
    pub decisions_considered: usize,
    pub action_counts: BTreeMap<String, usize>,
    pub average_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalingReport {
    pub report_id: String,
    pub report_type: ReportKind,
    pub generated_at: u64,
    pub summary: ReportSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_metrics: Option<ScalingMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_decisions: Option<DecisionTally>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patterns: Option<PatternAnalysis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
}

pub fn generate_report(kind: ReportKind, input: &ReportInput<'_>) -> AnalyticsResult<ScalingReport> {
    let summary = ReportSummary {
        total_metrics_recorded: input.samples.len(),
        total_scaling_decisions: input.decisions.len(),
        current_instances: input.current_instances,
        target_instances: input.target_instances,
        scaling_status: input.status,
    };

    let mut report = ScalingReport {
        report_id: next_id("report"),
        report_type: kind,
        generated_at: input.now,
        summary,
        latest_metrics: None,
        recent_decisions: None,
        patterns: None,
        recommendations: Vec::new(),
    };

    if kind == ReportKind::Summary {
        return Ok(report);
    }

    report.latest_metrics = input.samples.last().cloned();
    report.recent_decisions = Some(tally(input.decisions));

    if kind == ReportKind::Comprehensive {
        let analysis = analyze_patterns(
            input.samples,
            input.decisions,
            REPORT_WINDOW_HOURS,
            input.now,
        )?;
        report.recommendations = recommendations(&analysis, input.config);
        report.patterns = Some(analysis);
    }

    Ok(report)
}

fn tally(decisions: &[ScalingDecision]) -> DecisionTally {
    let recent = &decisions[decisions.len().saturating_sub(RECENT_DECISIONS)..];
    let mut action_counts = BTreeMap::new();
    for decision in recent {
        *action_counts
            .entry(decision.action.as_str().to_string())
            .or_insert(0) += 1;
    }
    let average_confidence = if recent.is_empty() {
        0.0
    } else {
        recent.iter().map(|d| d.confidence).sum::<f64>() / recent.len() as f64
    };
    DecisionTally {
        decisions_considered: recent.len(),
        action_counts,
        average_confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalegrid_core::ScalingAction;

    const NOW: u64 = 1_700_000_000;

    fn decision(action: ScalingAction, confidence: f64) -> ScalingDecision {
        let mut d = ScalingDecision::new(action, "test", ScalingMetrics::new(1, 0.0, 0.0), confidence);
        d.timestamp = NOW;
        d
    }

    fn input<'a>(
        samples: &'a [ScalingMetrics],
        decisions: &'a [ScalingDecision],
        config: &'a ScalingConfig,
    ) -> ReportInput<'a> {
        ReportInput {
            samples,
            decisions,
            current_instances: 3,
            target_instances: 3,
            status: ScalingStatus::ScalingUp,
            config,
            now: NOW,
        }
    }

    #[test]
    fn report_kind_parses() {
        assert_eq!("summary".parse::<ReportKind>().unwrap(), ReportKind::Summary);
        assert_eq!(
            "weekly".parse::<ReportKind>().unwrap_err(),
            AnalyticsError::UnknownReportKind("weekly".into())
        );
    }

    #[test]
    fn summary_report_has_counts_only() {
        let config = ScalingConfig::default();
        let samples = vec![ScalingMetrics::new(3, 50.0, 50.0)];
        let report = generate_report(ReportKind::Summary, &input(&samples, &[], &config)).unwrap();

        assert_eq!(report.summary.total_metrics_recorded, 1);
        assert_eq!(report.summary.scaling_status, ScalingStatus::ScalingUp);
        assert!(report.latest_metrics.is_none());
        assert!(report.recent_decisions.is_none());
    }

    #[test]
    fn tally_covers_last_ten_decisions() {
        let config = ScalingConfig::default();
        let mut decisions: Vec<ScalingDecision> =
            (0..5).map(|_| decision(ScalingAction::ScaleDown, 0.2)).collect();
        decisions.extend((0..10).map(|_| decision(ScalingAction::ScaleUp, 0.8)));

        let report =
            generate_report(ReportKind::Performance, &input(&[], &decisions, &config)).unwrap();
        let tally = report.recent_decisions.unwrap();
        assert_eq!(tally.decisions_considered, 10);
        assert_eq!(tally.action_counts.get("scale_up"), Some(&10));
        assert!(tally.action_counts.get("scale_down").is_none());
        assert!((tally.average_confidence - 0.8).abs() < 1e-9);
        assert_eq!(report.summary.total_scaling_decisions, 15);
    }

    #[test]
    fn comprehensive_report_includes_patterns_and_recommendations() {
        let config = ScalingConfig::default();
        let mut sample = ScalingMetrics::new(3, 50.0, 50.0);
        sample.timestamp = NOW;
        let samples = vec![sample];
        let decisions = vec![decision(ScalingAction::Maintain, 0.8)];

        let report =
            generate_report(ReportKind::Comprehensive, &input(&samples, &decisions, &config))
                .unwrap();
        assert!(report.patterns.is_some());
        assert!(!report.recommendations.is_empty());
        assert_eq!(report.latest_metrics.unwrap().cpu_utilization, 50.0);

        let json = serde_json::to_value(
            generate_report(ReportKind::Comprehensive, &input(&samples, &decisions, &config))
                .unwrap(),
        )
        .unwrap();
        assert_eq!(json["report_type"], "comprehensive");
        assert_eq!(json["summary"]["scaling_status"], "scaling_up");
    }
}
