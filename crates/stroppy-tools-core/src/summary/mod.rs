//! k6 summary parsing and text reports.

pub mod error;
pub mod format;
pub mod metrics;

pub use error::{SummaryError, SummaryResult};
pub use format::{format_summary, render_summary, KEY_TRENDS};
pub use metrics::{
    CounterValues, GaugeValues, Metric, MetricKind, MetricsDocument, RateValues, TrendValues,
};
