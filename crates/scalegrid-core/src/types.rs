//! Domain types shared by the scaling loop, the balancer, and analytics.
//!
//! All types serialize to snake_case JSON so that decisions and samples can
//! be handed to external executors and dashboards unchanged.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Opaque instance identifier owned by an external registry.
pub type InstanceId = String;

/// Returned by the balancer when the live pool is empty.
pub const NO_INSTANCES_AVAILABLE: &str = "no_instances_available";

/// Returned by the balancer when selection failed and no fallback exists.
pub const SELECTION_ERROR: &str = "error";

/// Confidence attached to every decision made by the rule-based decider.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

// ── Metrics ───────────────────────────────────────────────────────

/// A point-in-time snapshot of fleet utilization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingMetrics {
    pub current_instances: u32,
    pub target_instances: u32,
    /// CPU utilization, percent.
    pub cpu_utilization: f64,
    /// Memory utilization, percent.
    pub memory_utilization: f64,
    /// Mean response time, milliseconds.
    #[serde(default)]
    pub response_time: f64,
    /// Requests per second.
    #[serde(default)]
    pub throughput: f64,
    /// Error rate, percent.
    #[serde(default)]
    pub error_rate: f64,
    /// Unix timestamp (seconds).
    #[serde(default = "epoch_secs")]
    pub timestamp: u64,
}

impl ScalingMetrics {
    /// Build a CPU/memory-only sample stamped with the current time.
    pub fn new(current_instances: u32, cpu: f64, memory: f64) -> Self {
        Self {
            current_instances,
            target_instances: current_instances,
            cpu_utilization: cpu,
            memory_utilization: memory,
            response_time: 0.0,
            throughput: 0.0,
            error_rate: 0.0,
            timestamp: epoch_secs(),
        }
    }

    /// Read one of the tracked metrics by name.
    pub fn metric(&self, metric: TrackedMetric) -> f64 {
        match metric {
            TrackedMetric::CpuUtilization => self.cpu_utilization,
            TrackedMetric::MemoryUtilization => self.memory_utilization,
            TrackedMetric::ResponseTime => self.response_time,
            TrackedMetric::ErrorRate => self.error_rate,
        }
    }
}

/// Metrics followed by pattern analysis and forecasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedMetric {
    CpuUtilization,
    MemoryUtilization,
    ResponseTime,
    ErrorRate,
}

impl TrackedMetric {
    pub const ALL: [TrackedMetric; 4] = [
        TrackedMetric::CpuUtilization,
        TrackedMetric::MemoryUtilization,
        TrackedMetric::ResponseTime,
        TrackedMetric::ErrorRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedMetric::CpuUtilization => "cpu_utilization",
            TrackedMetric::MemoryUtilization => "memory_utilization",
            TrackedMetric::ResponseTime => "response_time",
            TrackedMetric::ErrorRate => "error_rate",
        }
    }
}

impl fmt::Display for TrackedMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Decisions ─────────────────────────────────────────────────────

/// What the decider wants done with the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingAction {
    ScaleUp,
    ScaleDown,
    Maintain,
    Optimize,
}

impl ScalingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingAction::ScaleUp => "scale_up",
            ScalingAction::ScaleDown => "scale_down",
            ScalingAction::Maintain => "maintain",
            ScalingAction::Optimize => "optimize",
        }
    }
}

impl fmt::Display for ScalingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalingAction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scale_up" => Ok(ScalingAction::ScaleUp),
            "scale_down" => Ok(ScalingAction::ScaleDown),
            "maintain" => Ok(ScalingAction::Maintain),
            "optimize" => Ok(ScalingAction::Optimize),
            other => Err(CoreError::UnknownAction(other.to_string())),
        }
    }
}

/// A scaling decision together with the sample that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScalingDecision {
    pub decision_id: String,
    pub action: ScalingAction,
    pub reason: String,
    pub current_metrics: ScalingMetrics,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub timestamp: u64,
}

impl ScalingDecision {
    /// Create a decision with a fresh id. Confidence is clamped into `[0, 1]`.
    pub fn new(
        action: ScalingAction,
        reason: impl Into<String>,
        current_metrics: ScalingMetrics,
        confidence: f64,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            decision_id: next_id("decision"),
            action,
            reason: reason.into(),
            current_metrics,
            confidence,
            timestamp: epoch_secs(),
        }
    }
}

/// Executor output state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStatus {
    #[default]
    Idle,
    ScalingUp,
    ScalingDown,
    Optimizing,
    Error,
    Maintenance,
}

impl ScalingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingStatus::Idle => "idle",
            ScalingStatus::ScalingUp => "scaling_up",
            ScalingStatus::ScalingDown => "scaling_down",
            ScalingStatus::Optimizing => "optimizing",
            ScalingStatus::Error => "error",
            ScalingStatus::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for ScalingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Load distribution ─────────────────────────────────────────────

/// Algorithm used to pick one instance from a live pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingStrategy {
    #[default]
    RoundRobin,
    LeastConnections,
    WeightedRoundRobin,
    IpHash,
    LeastResponseTime,
    ConsistentHash,
}

impl ScalingStrategy {
    pub const ALL: [ScalingStrategy; 6] = [
        ScalingStrategy::RoundRobin,
        ScalingStrategy::LeastConnections,
        ScalingStrategy::WeightedRoundRobin,
        ScalingStrategy::IpHash,
        ScalingStrategy::LeastResponseTime,
        ScalingStrategy::ConsistentHash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScalingStrategy::RoundRobin => "round_robin",
            ScalingStrategy::LeastConnections => "least_connections",
            ScalingStrategy::WeightedRoundRobin => "weighted_round_robin",
            ScalingStrategy::IpHash => "ip_hash",
            ScalingStrategy::LeastResponseTime => "least_response_time",
            ScalingStrategy::ConsistentHash => "consistent_hash",
        }
    }
}

impl fmt::Display for ScalingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalingStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScalingStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| CoreError::UnknownStrategy(s.to_string()))
    }
}

/// The routing-relevant parts of an inbound request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestInfo {
    #[serde(default)]
    pub client_ip: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl RequestInfo {
    pub fn with_client_ip(ip: impl Into<String>) -> Self {
        Self {
            client_ip: Some(ip.into()),
            request_id: None,
        }
    }

    pub fn with_request_id(id: impl Into<String>) -> Self {
        Self {
            client_ip: None,
            request_id: Some(id.into()),
        }
    }
}

// ── Time and ids ──────────────────────────────────────────────────

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a time-derived id that is unique within the process.
pub fn next_id(prefix: &str) -> String {
    let seq = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{}_{seq}", epoch_millis())
}

pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

pub fn epoch_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
