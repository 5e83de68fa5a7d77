//! scalegrid-analytics — read-only analysis of scaling history.
//!
//! Every function here works on slices copied out of the manager's history
//! at call time and never mutates the scaling loop.
//!
//! # Components
//!
//! - **`patterns`** — per-metric min/avg/max, half-over-half trend, and
//!   scaling efficiency over a time window
//! - **`forecast`** — pressure, exhaustion, and efficiency predictions
//! - **`optimize`** — optimization actions and recommendations
//! - **`report`** — summary, performance, and comprehensive reports

pub mod error;
pub mod forecast;
pub mod optimize;
pub mod patterns;
pub mod report;

pub use error::{AnalyticsError, AnalyticsResult};
pub use forecast::{predict_scaling_needs, Prediction, PredictionKind, Severity};
pub use optimize::{optimize, recommendations, OptimizationAction, OptimizationKind, OptimizationResult};
pub use patterns::{analyze_patterns, classify_trend, half_delta, MetricSummary, PatternAnalysis, Trend};
pub use report::{generate_report, DecisionTally, ReportInput, ReportKind, ReportSummary, ScalingReport};
