use std::time::{Duration, Instant};

use axum::http::StatusCode;

pub const REQUEST_DURATION_METRIC: &str = "http_request_duration_seconds";

/// Timing handle started by a handler and observed by the telemetry middleware
#[derive(Debug, Clone)]
pub struct RequestTimer {
    metric: &'static str,
    handler: String,
    started: Instant,
}

impl RequestTimer {
    pub fn start(handler: impl Into<String>) -> Self {
        Self::with_metric(REQUEST_DURATION_METRIC, handler)
    }

    pub fn with_metric(metric: &'static str, handler: impl Into<String>) -> Self {
        Self {
            metric,
            handler: handler.into(),
            started: Instant::now(),
        }
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the elapsed time against the response status
    pub fn observe(&self, status: StatusCode) -> Duration {
        let elapsed = self.elapsed();
        metrics::histogram!(
            self.metric,
            "handler" => self.handler.clone(),
            "status" => status.as_u16().to_string()
        )
        .record(elapsed.as_secs_f64());
        elapsed
    }
}
