//! Typed model of a k6 end-of-test JSON summary.
//!
//! Only the `metrics` field is read. Each metric becomes one [`Metric`]
//! variant; sub-keys missing from `values` default to zero and metrics of an
//! unknown type are skipped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::error::{SummaryError, SummaryResult};

/// Distribution summary (durations and other timings).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendValues {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    /// Median, shown as p(50).
    pub med: f64,
    #[serde(rename = "p(90)")]
    pub p90: f64,
    #[serde(rename = "p(95)")]
    pub p95: f64,
    #[serde(rename = "p(99)")]
    pub p99: f64,
}

/// Cumulative counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterValues {
    pub count: f64,
    /// Per-second rate over the whole run.
    pub rate: f64,
}

/// Point-in-time value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaugeValues {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// Pass/fail ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateValues {
    pub passes: f64,
    pub fails: f64,
}

impl RateValues {
    pub fn total(&self) -> f64 {
        self.passes + self.fails
    }

    /// Share of passes in percent; zero when nothing was recorded.
    pub fn pass_percentage(&self) -> f64 {
        let total = self.total();
        if total > 0.0 {
            self.passes / total * 100.0
        } else {
            0.0
        }
    }
}

/// The four k6 metric types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Trend,
    Counter,
    Gauge,
    Rate,
}

impl MetricKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "trend" => Some(MetricKind::Trend),
            "counter" => Some(MetricKind::Counter),
            "gauge" => Some(MetricKind::Gauge),
            "rate" => Some(MetricKind::Rate),
            _ => None,
        }
    }
}

/// A single metric with the values meaningful for its type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum Metric {
    Trend(TrendValues),
    Counter(CounterValues),
    Gauge(GaugeValues),
    Rate(RateValues),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Trend(_) => MetricKind::Trend,
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::Rate(_) => MetricKind::Rate,
        }
    }

    pub fn as_trend(&self) -> Option<&TrendValues> {
        match self {
            Metric::Trend(values) => Some(values),
            _ => None,
        }
    }

    /// Build a metric from its `values` object. Null sub-keys count as
    /// missing and read as zero.
    fn from_raw(kind: MetricKind, values: Value) -> serde_json::Result<Self> {
        let values = match values {
            Value::Null => Value::Object(serde_json::Map::new()),
            Value::Object(mut map) => {
                map.retain(|_, value| !value.is_null());
                Value::Object(map)
            }
            other => other,
        };
        Ok(match kind {
            MetricKind::Trend => Metric::Trend(serde_json::from_value(values)?),
            MetricKind::Counter => Metric::Counter(serde_json::from_value(values)?),
            MetricKind::Gauge => Metric::Gauge(serde_json::from_value(values)?),
            MetricKind::Rate => Metric::Rate(serde_json::from_value(values)?),
        })
    }
}

/// Metric entry as it appears on disk.
#[derive(Debug, Deserialize)]
struct RawMetric {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    values: Value,
}

/// Parsed k6 summary, keyed and ordered by metric name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsDocument {
    pub metrics: BTreeMap<String, Metric>,
}

impl MetricsDocument {
    /// Parse the raw bytes of a k6 JSON summary.
    ///
    /// Fails with `Malformed` when the bytes are not a JSON object or a
    /// metric does not have the expected shape, and with `Empty` when the
    /// `metrics` field is missing or null.
    pub fn from_slice(bytes: &[u8]) -> SummaryResult<Self> {
        let root: Value = serde_json::from_slice(bytes)?;
        let Value::Object(mut root) = root else {
            return Err(SummaryError::Malformed(
                "top-level value is not an object".to_string(),
            ));
        };

        let raw = match root.remove("metrics") {
            None | Some(Value::Null) => return Err(SummaryError::Empty),
            Some(Value::Object(raw)) => raw,
            Some(_) => {
                return Err(SummaryError::Malformed(
                    "`metrics` is not an object".to_string(),
                ))
            }
        };

        let mut metrics = BTreeMap::new();
        for (name, value) in raw {
            if value.is_null() {
                warn!("Skipping metric {} with no data", name);
                continue;
            }
            let entry: RawMetric = serde_json::from_value(value)
                .map_err(|e| SummaryError::Malformed(format!("metric {name}: {e}")))?;

            let kind_name = entry.kind.unwrap_or_default();
            let Some(kind) = MetricKind::parse(&kind_name) else {
                warn!("Skipping metric {} of unknown type {:?}", name, kind_name);
                continue;
            };

            let metric = Metric::from_raw(kind, entry.values)
                .map_err(|e| SummaryError::Malformed(format!("metric {name}: {e}")))?;
            metrics.insert(name, metric);
        }

        Ok(MetricsDocument { metrics })
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    /// Metrics in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Metric)> {
        self.metrics.iter().map(|(name, metric)| (name.as_str(), metric))
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
