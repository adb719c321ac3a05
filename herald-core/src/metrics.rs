#![forbid(unsafe_code)]

use std::time::Duration;

use metrics::{counter, histogram};

const METRIC_EVENTS: &str = "herald_events_total";
const METRIC_PUSH_TOKENS: &str = "herald_push_tokens_total";
const METRIC_FLAG_FAILURES: &str = "herald_flag_update_failures_total";
const METRIC_DISPATCH_LATENCY: &str = "herald_dispatch_seconds";

#[derive(Clone, Default)]
pub struct FanOutMetrics;

impl FanOutMetrics {
    pub fn new() -> Self {
        Self
    }

    pub fn record_outcome(&self, source: &'static str, outcome: &'static str) {
        counter!(METRIC_EVENTS, "source" => source, "outcome" => outcome).increment(1);
    }

    pub fn record_token_results(&self, sent: usize, failed: usize, invalid: usize) {
        if sent > 0 {
            counter!(METRIC_PUSH_TOKENS, "result" => "sent").increment(sent as u64);
        }
        let other_failures = failed.saturating_sub(invalid);
        if other_failures > 0 {
            counter!(METRIC_PUSH_TOKENS, "result" => "failed").increment(other_failures as u64);
        }
        if invalid > 0 {
            counter!(METRIC_PUSH_TOKENS, "result" => "invalid").increment(invalid as u64);
        }
    }

    pub fn record_flag_failures(&self, count: usize) {
        if count > 0 {
            counter!(METRIC_FLAG_FAILURES).increment(count as u64);
        }
    }

    pub fn record_dispatch_latency(&self, elapsed: Duration) {
        histogram!(METRIC_DISPATCH_LATENCY).record(elapsed.as_secs_f64());
    }
}

pub struct MetricsRecorder;

impl MetricsRecorder {
    pub fn install_prometheus(
        addr: std::net::SocketAddr,
    ) -> Result<(), metrics_exporter_prometheus::BuildError> {
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
    }
}
