//! Utility functions and helpers

mod metrics;
mod retry;
mod timestamp;

pub use metrics::{FeedMetrics, MetricsSummary, SharedMetrics};
pub use retry::RetryPolicy;
pub use timestamp::{unix_seconds, unix_seconds_after};
