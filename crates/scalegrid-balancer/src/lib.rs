//! scalegrid-balancer — routes requests across a live instance pool.
//!
//! # Components
//!
//! - **`distributor`** — `LoadDistributor`, the synchronized entry point that
//!   owns per-instance connection counters, latency samples, and weights
//! - **`strategy`** — one selector per `ScalingStrategy`, dispatched by an
//!   exhaustive match
//!
//! The distributor never returns an id that was not in the pool it was
//! given. The sentinels `"no_instances_available"` and `"error"` are the only
//! other possible results.

pub mod distributor;
pub mod error;
pub mod strategy;

pub use distributor::{DistributorStats, InstanceStats, LoadDistributor};
pub use error::{BalanceError, BalanceResult};
pub use strategy::SelectInstance;
