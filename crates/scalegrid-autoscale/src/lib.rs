//! scalegrid-autoscale — metrics-driven instance scaling.
//!
//! One scaling tick runs three stages:
//!
//! ```text
//! ResourceMonitor::collect(instances, cpu, memory)  -> ScalingMetrics
//! ScalingDecider::decide(metrics, config)           -> ScalingDecision
//! ScalingExecutor::execute(action, instances, cfg)  -> (instances, status)
//! ```
//!
//! # Scaling Algorithm
//!
//! ```text
//! if cpu > target_cpu or memory > target_memory:
//!     scale_up      (+1, capped at max_instances)
//! elif cpu < target_cpu * 0.5 and memory < target_memory * 0.5:
//!     scale_down    (-1, floored at min_instances)
//! else:
//!     maintain
//! ```
//!
//! The executor never moves the count by more than one instance per call.

pub mod decider;
pub mod executor;
pub mod monitor;

pub use decider::ScalingDecider;
pub use executor::ScalingExecutor;
pub use monitor::ResourceMonitor;
