//! Prometheus metrics.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder. Returns `None` when metrics are
/// disabled or the recorder is already installed.
pub fn install_metrics(enabled: bool) -> Option<PrometheusHandle> {
    if !enabled {
        return None;
    }
    PrometheusBuilder::new().install_recorder().ok()
}

/// Count requests and record latency per method/status.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    counter!("recut_http_requests_total", "method" => method.clone(), "status" => status).increment(1);
    histogram!("recut_http_request_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());

    response
}
