//! Metrics collection for course-service.
//!
//! HTTP request metrics come from the shared middleware; this module adds the
//! workflow call counters and owns the Prometheus exporter handle.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder once per process.
///
/// Later calls are no-ops, so tests that build several applications share
/// one recorder.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        if let Err(e) = metrics::set_global_recorder(recorder) {
            tracing::warn!(error = %e, "Metrics recorder already installed");
        }
        handle
    });
}

/// Prometheus text exposition, empty before [`init_metrics`].
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

pub fn record_invocation(flow: &'static str, outcome: &'static str, elapsed: Duration) {
    counter!("workflow_invocations_total", "flow" => flow, "outcome" => outcome).increment(1);
    histogram!("workflow_invocation_duration_seconds", "flow" => flow)
        .record(elapsed.as_secs_f64());
}

pub fn record_shape_mismatch(flow: &'static str) {
    counter!("workflow_shape_mismatch_total", "flow" => flow).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_invocations_show_up_in_exposition() {
        init_metrics();
        init_metrics();

        record_invocation("outline", "success", Duration::from_millis(5));

        assert!(get_metrics().contains("workflow_invocations_total"));
    }
}
