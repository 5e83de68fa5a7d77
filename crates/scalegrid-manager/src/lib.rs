//! scalegrid-manager — the scaling control loop.
//!
//! `ScalingManager` ties the pieces together:
//!
//! ```text
//! process_metrics(cpu, memory)
//!   -> ResourceMonitor::collect
//!   -> ScalingDecider::decide
//!   -> ScalingExecutor::execute
//!   -> current_instances / scaling_status / decision history
//!
//! distribute_load(request, strategy, instances)
//!   -> LoadDistributor::distribute
//! ```
//!
//! Analytics entry points return `serde_json::Value` and report failures as
//! `{"error": "..."}` instead of returning errors. Construct one manager
//! per scaling domain; it is `Send + Sync` and can be shared via `Arc`.

pub mod error;
pub mod intelligent;
pub mod manager;

pub use error::{ManagerError, ManagerResult};
pub use intelligent::{IntelligentExecution, IntelligentStrategy, IntelligentStrategyKind};
pub use manager::ScalingManager;
