//! Error types for the scaling manager.

use thiserror::Error;

use scalegrid_analytics::AnalyticsError;
use scalegrid_balancer::BalanceError;
use scalegrid_core::CoreError;

pub type ManagerResult<T> = Result<T, ManagerError>;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("unknown intelligent scaling strategy type: {0}")]
    UnknownStrategyKind(String),

    #[error("invalid strategy parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("intelligent scaling strategy not found: {0}")]
    StrategyNotFound(String),

    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
