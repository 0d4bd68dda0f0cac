//! Plain-text rendering of a [`MetricsDocument`].
//!
//! Layout:
//! - header
//! - key duration trends in a fixed order, with avg/min/max and percentiles
//! - counters, gauges and rates in name order
//! - every other trend in name order, condensed to avg and p95

use std::fmt::Write;

use super::error::SummaryResult;
use super::metrics::{
    CounterValues, GaugeValues, Metric, MetricsDocument, RateValues, TrendValues,
};

/// Trends shown first and in full, in this order.
pub const KEY_TRENDS: [&str; 4] = [
    "run_query_duration",
    "insert_duration",
    "http_req_duration",
    "iteration_duration",
];

const LABEL_WIDTH: usize = 35;

/// Parse a k6 JSON summary and render it as a text report.
pub fn format_summary(bytes: &[u8]) -> SummaryResult<String> {
    let document = MetricsDocument::from_slice(bytes)?;
    Ok(render_summary(&document))
}

/// Render a parsed summary. Output depends only on the document contents.
pub fn render_summary(document: &MetricsDocument) -> String {
    let mut out = String::new();
    out.push_str("K6 Test Results Summary\n");
    out.push_str("=======================\n\n");

    for name in KEY_TRENDS {
        if let Some(trend) = document.get(name).and_then(Metric::as_trend) {
            write_key_trend(&mut out, name, trend);
        }
    }

    for (name, metric) in document.iter() {
        match metric {
            Metric::Counter(counter) => write_counter(&mut out, name, counter),
            Metric::Gauge(gauge) => write_gauge(&mut out, name, gauge),
            Metric::Rate(rate) => write_rate(&mut out, name, rate),
            Metric::Trend(_) => {}
        }
    }

    out.push_str("\nOther duration metrics:\n");
    for (name, metric) in document.iter() {
        if KEY_TRENDS.iter().any(|key| *key == name) {
            continue;
        }
        if let Metric::Trend(trend) = metric {
            let _ = writeln!(
                out,
                "  {} avg={:.2}ms  p95={:.2}ms",
                label(name),
                trend.avg,
                trend.p95
            );
        }
    }

    out
}

fn label(name: &str) -> String {
    format!("{:<width$}", format!("{name}:"), width = LABEL_WIDTH)
}

fn write_key_trend(out: &mut String, name: &str, trend: &TrendValues) {
    let _ = writeln!(out, "{name}:");
    let _ = writeln!(
        out,
        "  avg={:.2}ms  min={:.2}ms  max={:.2}ms",
        trend.avg, trend.min, trend.max
    );
    let _ = writeln!(
        out,
        "  p(50)={:.2}ms  p(90)={:.2}ms  p(95)={:.2}ms  p(99)={:.2}ms",
        trend.med, trend.p90, trend.p95, trend.p99
    );
    out.push('\n');
}

fn write_counter(out: &mut String, name: &str, counter: &CounterValues) {
    let _ = writeln!(
        out,
        "{} count={:.0}  rate={:.2}/s",
        label(name),
        counter.count,
        counter.rate
    );
}

fn write_gauge(out: &mut String, name: &str, gauge: &GaugeValues) {
    let _ = writeln!(
        out,
        "{} value={:.0}  min={:.0}  max={:.0}",
        label(name),
        gauge.value,
        gauge.min,
        gauge.max
    );
}

fn write_rate(out: &mut String, name: &str, rate: &RateValues) {
    let _ = writeln!(
        out,
        "{} {:.2}% ({:.0}/{:.0})",
        label(name),
        rate.pass_percentage(),
        rate.passes,
        rate.total()
    );
}
