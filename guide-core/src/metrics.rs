// ABOUTME: Prometheus metrics for guide replies, errors, and citations.
// ABOUTME: Thin wrappers over the metrics facade so call sites stay one line.

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return a handle for rendering /metrics
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    ::metrics::describe_counter!("guide_replies_total", "Replies returned, by outcome");
    ::metrics::describe_counter!("guide_errors_total", "Errors absorbed by the guide, by kind");
    ::metrics::describe_counter!("guide_citations_total", "Citations collected from agent streams");
    ::metrics::describe_histogram!("guide_stream_seconds", "Time spent consuming agent streams");
    Ok(handle)
}

pub fn record_reply(outcome: &'static str) {
    ::metrics::counter!("guide_replies_total", "outcome" => outcome).increment(1);
}

pub fn record_error(kind: &'static str) {
    ::metrics::counter!("guide_errors_total", "kind" => kind).increment(1);
}

pub fn record_citations(count: usize) {
    ::metrics::counter!("guide_citations_total").increment(count as u64);
}

pub fn record_stream_duration(elapsed: Duration) {
    ::metrics::histogram!("guide_stream_seconds").record(elapsed.as_secs_f64());
}
