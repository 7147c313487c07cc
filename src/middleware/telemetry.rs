use std::net::SocketAddr;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::context::{timer::REQUEST_DURATION_METRIC, RequestTimer};
use crate::error::Result;

/// Install the global recorder and serve Prometheus scrapes on `addr`.
///
/// Must run inside the tokio runtime, which hosts the scrape listener.
pub fn install_prometheus_exporter(addr: &str) -> Result<SocketAddr> {
    let addr: SocketAddr = addr.parse()?;
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    metrics::describe_histogram!(
        REQUEST_DURATION_METRIC,
        metrics::Unit::Seconds,
        "Time spent in timed handlers"
    );
    Ok(addr)
}

/// Middleware that observes the timer a handler parked with `time_request`
pub async fn record_request_timer(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    if let Some(timer) = response.extensions().get::<RequestTimer>() {
        let elapsed = timer.observe(response.status());
        tracing::debug!(
            handler = timer.handler(),
            status = response.status().as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "request timed"
        );
    }

    response
}
