//! Resource monitor — records utilization samples.

use tracing::debug;

use scalegrid_core::{History, ScalingMetrics};

/// Records metric samples in a bounded history.
#[derive(Debug, Clone)]
pub struct ResourceMonitor {
    history: History<ScalingMetrics>,
}

impl ResourceMonitor {
    /// Create a monitor keeping at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            history: History::with_capacity(capacity),
        }
    }

    /// Build a CPU/memory sample, append it, and return it.
    ///
    /// Response time, throughput, and error rate are not measured here and
    /// are recorded as zero. Use [`ResourceMonitor::record`] for richer samples.
    pub fn collect(&mut self, current_instances: u32, cpu: f64, memory: f64) -> ScalingMetrics {
        let sample = ScalingMetrics::new(current_instances, cpu, memory);
        self.record(sample.clone());
        sample
    }

    /// Append a caller-built sample.
    pub fn record(&mut self, sample: ScalingMetrics) {
        debug!(
            instances = sample.current_instances,
            cpu = sample.cpu_utilization,
            memory = sample.memory_utilization,
            "metrics sample recorded"
        );
        self.history.push(sample);
    }

    pub fn latest(&self) -> Option<&ScalingMetrics> {
        self.history.latest()
    }

    /// Bounded view of every retained sample, oldest first.
    pub fn history(&self) -> &History<ScalingMetrics> {
        &self.history
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new(scalegrid_core::ScalingConfig::default().history_capacity)
    }
}
