//! Scaling configuration parser.
//!
//! The configuration document carries a top-level `scaling` object:
//!
//! ```json
//! { "scaling": { "min_instances": 1, "max_instances": 10,
//!                "target_cpu_utilization": 70.0,
//!                "target_memory_utilization": 80.0 } }
//! ```
//!
//! Every key is optional. Files ending in `.toml` are read with the same
//! schema under a `[scaling]` table.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::types::{ScalingStrategy, TrackedMetric};

/// Bounds, targets, and defaults for one scaling domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScalingConfig {
    pub min_instances: u32,
    pub max_instances: u32,
    /// Percent.
    pub target_cpu_utilization: f64,
    /// Percent.
    pub target_memory_utilization: f64,
    /// Seconds between scaling actions. Advisory: the decider ignores it.
    pub scaling_cooldown: u64,
    /// Default distribution strategy for callers that do not pick one.
    pub scaling_strategy: ScalingStrategy,
    /// Response time (ms) considered the ceiling for forecasting.
    pub response_time_threshold: f64,
    /// Error rate (percent) considered the ceiling for forecasting.
    pub error_rate_threshold: f64,
    /// Capacity of every history ring buffer.
    pub history_capacity: usize,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            min_instances: 1,
            max_instances: 10,
            target_cpu_utilization: 70.0,
            target_memory_utilization: 80.0,
            scaling_cooldown: 300,
            scaling_strategy: ScalingStrategy::RoundRobin,
            response_time_threshold: 1000.0,
            error_rate_threshold: 5.0,
            history_capacity: 10_000,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    scaling: ScalingConfig,
}

impl ScalingConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        let doc: ConfigDocument =
            serde_json::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))?;
        doc.scaling.validate()?;
        Ok(doc.scaling)
    }

    /// Parse a TOML configuration document.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let doc: ConfigDocument =
            toml::from_str(content).map_err(|e| CoreError::Parse(e.to_string()))?;
        doc.scaling.validate()?;
        Ok(doc.scaling)
    }

    /// Read and validate a configuration file, failing on any problem.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Read(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    /// Load a configuration file, keeping defaults when it is missing or bad.
    ///
    /// Never fails: problems are logged as warnings.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => {
                debug!(path = %path.display(), "scaling config loaded");
                config
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "scaling config unavailable, using defaults"
                );
                Self::default()
            }
        }
    }

    /// Check bounds and capacities.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_instances == 0 {
            return Err(CoreError::Invalid("max_instances must be at least 1".into()));
        }
        if self.min_instances > self.max_instances {
            return Err(CoreError::Invalid(format!(
                "min_instances ({}) exceeds max_instances ({})",
                self.min_instances, self.max_instances
            )));
        }
        if self.history_capacity == 0 {
            return Err(CoreError::Invalid("history_capacity must be at least 1".into()));
        }
        Ok(())
    }

    /// Clamp an instance count into `[min_instances, max_instances]`.
    pub fn clamp_instances(&self, count: u32) -> u32 {
        count.clamp(self.min_instances, self.max_instances.max(self.min_instances))
    }

    /// Ceiling used by forecasting for a tracked metric.
    pub fn threshold_for(&self, metric: TrackedMetric) -> f64 {
        match metric {
            TrackedMetric::CpuUtilization => self.target_cpu_utilization,
            TrackedMetric::MemoryUtilization => self.target_memory_utilization,
            TrackedMetric::ResponseTime => self.response_time_threshold,
            TrackedMetric::ErrorRate => self.error_rate_threshold,
        }
    }
}
