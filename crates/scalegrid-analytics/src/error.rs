//! Error types for the analytics layer.

use thiserror::Error;

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalyticsError {
    #[error("time range must be at least one hour, got {0}")]
    InvalidTimeRange(u64),

    #[error("unknown report type: {0}")]
    UnknownReportKind(String),
}
