//! scalegrid-core — shared types for the ScaleGrid scaling engine.
//!
//! Holds the data model passed between the monitor, decider, executor,
//! load distributor, and analytics layers, plus configuration loading
//! and the bounded `History` buffer used for every history list.

pub mod config;
pub mod error;
pub mod history;
pub mod types;

pub use config::ScalingConfig;
pub use error::{CoreError, CoreResult};
pub use history::History;
pub use types::*;
