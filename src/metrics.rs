use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::time::Instant;

use crate::registry::Endpoint;

lazy_static! {
    // Request metrics
    pub static ref REQUEST_COUNTER: IntCounterVec = register_int_counter_vec!(
        "jsonds_requests_total",
        "Total number of requests received, by endpoint and HTTP status",
        &["endpoint", "status"]
    ).unwrap();

    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "jsonds_request_duration_seconds",
        "Request duration in seconds, including the backend handler",
        &["endpoint"],
        vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]
    ).unwrap();
}

/// Times one dispatched call; the duration is recorded when dropped.
pub struct RequestTimer {
    endpoint: Endpoint,
    start: Instant,
}

impl RequestTimer {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            start: Instant::now(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        REQUEST_DURATION
            .with_label_values(&[self.endpoint.name()])
            .observe(duration);
    }
}

pub fn record_request(endpoint: Endpoint, status: u16) {
    let status = status.to_string();
    REQUEST_COUNTER
        .with_label_values(&[endpoint.name(), status.as_str()])
        .inc();
}

/// Renders every registered metric in the Prometheus text format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_counted() {
        let before = REQUEST_COUNTER
            .with_label_values(&["tag-keys", "418"])
            .get();
        {
            let _timer = RequestTimer::new(Endpoint::TagKeys);
            record_request(Endpoint::TagKeys, 418);
        }
        let after = REQUEST_COUNTER
            .with_label_values(&["tag-keys", "418"])
            .get();
        assert_eq!(after, before + 1);
        assert!(gather().contains("jsonds_request_duration_seconds"));
    }
}
