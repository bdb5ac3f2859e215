use prometheus::{
    histogram_opts, opts, Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder,
};
use std::time::Duration;

use crate::error::RpcError;

/// Per-client call metrics, kept in a private registry
#[derive(Clone)]
pub struct ClientMetrics {
    registry: Registry,
    pub requests_total: IntCounterVec,
    pub errors_total: IntCounterVec,
    pub retries_total: IntCounterVec,
    pub request_duration: HistogramVec,
}

impl std::fmt::Debug for ClientMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientMetrics").finish_non_exhaustive()
    }
}

impl ClientMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            opts!("qrl_client_requests_total", "RPC calls issued, including retries"),
            &["method"],
        )?;
        let errors_total = IntCounterVec::new(
            opts!("qrl_client_errors_total", "RPC calls that failed, by error category"),
            &["method", "category"],
        )?;
        let retries_total = IntCounterVec::new(
            opts!("qrl_client_retries_total", "RPC calls repeated after a transient failure"),
            &["method"],
        )?;
        let request_duration = HistogramVec::new(
            histogram_opts!(
                "qrl_client_request_duration_seconds",
                "Latency of individual RPC attempts"
            ),
            &["method"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(retries_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            errors_total,
            retries_total,
            request_duration,
        })
    }

    pub fn record_attempt(&self, method: &str, elapsed: Duration) {
        self.requests_total.with_label_values(&[method]).inc();
        self.request_duration
            .with_label_values(&[method])
            .observe(elapsed.as_secs_f64());
    }

    pub fn record_error(&self, method: &str, err: &RpcError) {
        self.errors_total
            .with_label_values(&[method, err.category().as_str()])
            .inc();
    }

    pub fn record_retry(&self, method: &str) {
        self.retries_total.with_label_values(&[method]).inc();
    }

    pub fn requests(&self, method: &str) -> u64 {
        self.requests_total.with_label_values(&[method]).get()
    }

    pub fn retries(&self, method: &str) -> u64 {
        self.retries_total.with_label_values(&[method]).get()
    }

    /// Text exposition format
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if encoder.encode(&self.registry.gather(), &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
