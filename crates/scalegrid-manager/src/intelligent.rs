//! Named intelligent scaling strategies.
//!
//! Each strategy adjusts the inputs of the rule-based decider before a
//! tick is executed:
//!
//! | kind                 | adjustment                                         |
//! |----------------------|----------------------------------------------------|
//! | `adaptive_threshold` | targets × `threshold_factor`, × 0.9 if CPU rising  |
//! | `predictive_scaling` | CPU/memory extrapolated by half-over-half delta    |
//! | `cost_optimized`     | targets × (1 + `headroom`)                         |

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use scalegrid_analytics::{classify_trend, half_delta, Trend};
use scalegrid_core::{
    epoch_secs, next_id, ScalingConfig, ScalingDecision, ScalingMetrics, ScalingStatus,
};

use crate::error::{ManagerError, ManagerResult};

/// Recent samples consulted by adaptive and predictive strategies.
pub const STRATEGY_LOOKBACK: usize = 60;

/// Tightening applied to adaptive targets while CPU is rising.
const ADAPTIVE_RISING_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntelligentStrategyKind {
    AdaptiveThreshold,
    PredictiveScaling,
    CostOptimized,
}

impl IntelligentStrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntelligentStrategyKind::AdaptiveThreshold => "adaptive_threshold",
            IntelligentStrategyKind::PredictiveScaling => "predictive_scaling",
            IntelligentStrategyKind::CostOptimized => "cost_optimized",
        }
    }

    /// Numeric parameters understood by this kind, with their defaults.
    fn parameters(&self) -> &'static [(&'static str, f64)] {
        match self {
            IntelligentStrategyKind::AdaptiveThreshold => &[("threshold_factor", 1.0)],
            IntelligentStrategyKind::PredictiveScaling => &[("lookahead", 1.0)],
            IntelligentStrategyKind::CostOptimized => &[("headroom", 0.1)],
        }
    }
}

impl fmt::Display for IntelligentStrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntelligentStrategyKind {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adaptive_threshold" => Ok(IntelligentStrategyKind::AdaptiveThreshold),
            "predictive_scaling" => Ok(IntelligentStrategyKind::PredictiveScaling),
            "cost_optimized" => Ok(IntelligentStrategyKind::CostOptimized),
            other => Err(ManagerError::UnknownStrategyKind(other.to_string())),
        }
    }
}

/// A stored strategy and its parameter bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntelligentStrategy {
    pub strategy_id: String,
    pub strategy_type: IntelligentStrategyKind,
    pub params: Map<String, Value>,
    pub created_at: u64,
    pub executions: u64,
}

impl IntelligentStrategy {
    /// Validate `params` for `kind` and build a strategy with a fresh id.
    ///
    /// Known numeric parameters must be finite, non-negative numbers.
    /// Unknown keys are kept as opaque metadata.
    pub fn new(kind: IntelligentStrategyKind, params: Map<String, Value>) -> ManagerResult<Self> {
        for (name, _) in kind.parameters() {
            if let Some(value) = params.get(*name) {
                let valid = value.as_f64().is_some_and(|v| v.is_finite() && v >= 0.0);
                if !valid {
                    return Err(ManagerError::InvalidParameter {
                        name: name.to_string(),
                        reason: format!("expected a non-negative number, got {value}"),
                    });
                }
            }
        }

        Ok(Self {
            strategy_id: next_id(kind.as_str()),
            strategy_type: kind,
            params,
            created_at: epoch_secs(),
            executions: 0,
        })
    }

    fn param(&self, name: &str) -> f64 {
        let default = self
            .strategy_type
            .parameters()
            .iter()
            .find(|(n, _)| *n == name)
            .map_or(0.0, |(_, d)| *d);
        self.params.get(name).and_then(Value::as_f64).unwrap_or(default)
    }

    /// Produce the sample and config the rule-based decider should see.
    ///
    /// `recent` is the recent sample history, oldest first. Instance bounds
    /// are never changed, only utilization targets and projected usage.
    pub fn plan(
        &self,
        metrics: &ScalingMetrics,
        recent: &[ScalingMetrics],
        config: &ScalingConfig,
    ) -> (ScalingMetrics, ScalingConfig) {
        let mut metrics = metrics.clone();
        let mut config = config.clone();

        match self.strategy_type {
            IntelligentStrategyKind::AdaptiveThreshold => {
                let mut factor = self.param("threshold_factor");
                let cpu: Vec<f64> = recent.iter().map(|s| s.cpu_utilization).collect();
                if classify_trend(&cpu) == Trend::Increasing {
                    factor *= ADAPTIVE_RISING_FACTOR;
                }
                config.target_cpu_utilization *= factor;
                config.target_memory_utilization *= factor;
            }
            IntelligentStrategyKind::PredictiveScaling => {
                let lookahead = self.param("lookahead");
                let cpu: Vec<f64> = recent.iter().map(|s| s.cpu_utilization).collect();
                let memory: Vec<f64> = recent.iter().map(|s| s.memory_utilization).collect();
                metrics.cpu_utilization =
                    (metrics.cpu_utilization + half_delta(&cpu) * lookahead).clamp(0.0, 100.0);
                metrics.memory_utilization = (metrics.memory_utilization
                    + half_delta(&memory) * lookahead)
                    .clamp(0.0, 100.0);
            }
            IntelligentStrategyKind::CostOptimized => {
                let factor = 1.0 + self.param("headroom");
                config.target_cpu_utilization *= factor;
                config.target_memory_utilization *= factor;
            }
        }

        (metrics, config)
    }
}

/// Targets the decider actually compared against.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectiveTargets {
    pub target_cpu_utilization: f64,
    pub target_memory_utilization: f64,
}

/// Outcome of one intelligent scaling tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntelligentExecution {
    pub strategy_id: String,
    pub strategy_type: IntelligentStrategyKind,
    pub decision: ScalingDecision,
    pub new_instances: u32,
    pub scaling_status: ScalingStatus,
    pub effective_targets: EffectiveTargets,
    pub executions: u64,
}
