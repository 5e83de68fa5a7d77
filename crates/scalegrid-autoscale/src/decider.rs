//! Rule-based scaling decider.
//!
//! Compares the latest sample against the configured CPU and memory
//! targets. Pure: the only non-deterministic part of a decision is its id.

use tracing::debug;

use scalegrid_core::{
    ScalingAction, ScalingConfig, ScalingDecision, ScalingMetrics, DEFAULT_CONFIDENCE,
};

pub const REASON_ABOVE_TARGET: &str = "resource utilization above target";
pub const REASON_BELOW_TARGET: &str = "resource utilization well below target";
pub const REASON_WITHIN_TARGET: &str = "within target utilization";

/// Fraction of the target below which both resources must sit to scale down.
const SCALE_DOWN_RATIO: f64 = 0.5;

/// Maps a metrics sample and config to a scaling decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalingDecider;

impl ScalingDecider {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether to scale up, scale down, or maintain.
    ///
    /// Scale-up is checked first, so a sample above target on one axis and
    /// far below on the other always scales up.
    pub fn decide(&self, metrics: &ScalingMetrics, config: &ScalingConfig) -> ScalingDecision {
        let (action, reason) = classify(metrics, config);

        debug!(
            action = %action,
            cpu = metrics.cpu_utilization,
            memory = metrics.memory_utilization,
            target_cpu = config.target_cpu_utilization,
            target_memory = config.target_memory_utilization,
            "scaling decision"
        );

        ScalingDecision::new(action, reason, metrics.clone(), DEFAULT_CONFIDENCE)
    }
}

fn classify(metrics: &ScalingMetrics, config: &ScalingConfig) -> (ScalingAction, &'static str) {
    let cpu = metrics.cpu_utilization;
    let memory = metrics.memory_utilization;

    if cpu > config.target_cpu_utilization || memory > config.target_memory_utilization {
        return (ScalingAction::ScaleUp, REASON_ABOVE_TARGET);
    }

    if cpu < config.target_cpu_utilization * SCALE_DOWN_RATIO
        && memory < config.target_memory_utilization * SCALE_DOWN_RATIO
    {
        return (ScalingAction::ScaleDown, REASON_BELOW_TARGET);
    }

    (ScalingAction::Maintain, REASON_WITHIN_TARGET)
}
