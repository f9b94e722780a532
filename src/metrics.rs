use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload. Safe to call more than once; the
/// recorder is installed on the first call only.
pub fn init_metrics() -> PrometheusHandle {
    HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            // Pre-register counters so they appear even before the first increment.
            counter!("evaluations_total").absolute(0);
            counter!("verdicts_fraudulent_total").absolute(0);
            counter!("verdicts_secure_total").absolute(0);
            counter!("threshold_overrides_total").absolute(0);
            counter!("verification_failures_total").absolute(0);
            counter!("invalid_input_total").absolute(0);
            counter!("model_load_failures_total").absolute(0);

            gauge!("engine_online").set(0.0);

            // Histogram is lazily created on first record; force creation.
            histogram!("inference_latency_seconds").record(0.0);

            handle
        })
        .clone()
}
