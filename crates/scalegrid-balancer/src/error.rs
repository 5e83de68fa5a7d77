//! Error types for instance selection.

use thiserror::Error;

pub type BalanceResult<T> = Result<T, BalanceError>;

#[derive(Debug, Error, PartialEq)]
pub enum BalanceError {
    #[error("instance pool is empty")]
    EmptyPool,

    #[error("total weight of the pool is not positive: {0}")]
    NoPositiveWeight(f64),

    #[error("invalid weight for {instance}: {weight}")]
    InvalidWeight { instance: String, weight: f64 },

    #[error("invalid response time for {instance}: {millis}")]
    InvalidResponseTime { instance: String, millis: f64 },

    #[error("selected index {index} outside pool of {len}")]
    IndexOutOfRange { index: usize, len: usize },
}
