//! Observability for the prediction service
//!
//! Provides:
//! - Prometheus metrics (inference latency, request and error counts, weather upstream latency, model info)
//! - Structured JSON logging with tracing

use crate::artifacts::LoadedArtifact;
use prometheus::{
    register_gauge_vec, register_histogram, register_histogram_vec, register_int_counter_vec,
    GaugeVec, Histogram, HistogramVec, IntCounterVec,
};
use std::sync::OnceLock;
use tracing::{error, info, warn};

/// Latency buckets in seconds; inference on the image model can take a few seconds
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

static GLOBAL_METRICS: OnceLock<MetricsInner> = OnceLock::new();

struct MetricsInner {
    inference_latency_seconds: HistogramVec,
    requests_total: IntCounterVec,
    request_errors_total: IntCounterVec,
    weather_upstream_latency_seconds: Histogram,
    model_info: GaugeVec,
}

impl MetricsInner {
    // Registration only fails on duplicate names, which the OnceLock rules out
    fn new() -> Self {
        Self {
            inference_latency_seconds: register_histogram_vec!(
                "cropix_inference_latency_seconds",
                "Time spent serving a prediction, per endpoint",
                &["endpoint"],
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register inference_latency_seconds"),

            requests_total: register_int_counter_vec!(
                "cropix_requests_total",
                "Requests received, per endpoint",
                &["endpoint"]
            )
            .expect("Failed to register requests_total"),

            request_errors_total: register_int_counter_vec!(
                "cropix_request_errors_total",
                "Requests that ended in an error, per endpoint and error kind",
                &["endpoint", "kind"]
            )
            .expect("Failed to register request_errors_total"),

            weather_upstream_latency_seconds: register_histogram!(
                "cropix_weather_upstream_latency_seconds",
                "Round trip time of weather provider calls",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register weather_upstream_latency_seconds"),

            model_info: register_gauge_vec!(
                "cropix_model_info",
                "Loaded model artifacts and their content hashes",
                &["model", "sha256"]
            )
            .expect("Failed to register model_info"),
        }
    }
}

/// Handle to the process-wide metrics; clones share the same series
#[derive(Clone)]
pub struct CropixMetrics {
    _private: (),
}

impl Default for CropixMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CropixMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MetricsInner {
        GLOBAL_METRICS.get_or_init(MetricsInner::new)
    }

    pub fn inc_requests(&self, endpoint: &str) {
        self.inner().requests_total.with_label_values(&[endpoint]).inc();
    }

    pub fn inc_errors(&self, endpoint: &str, kind: &str) {
        self.inner()
            .request_errors_total
            .with_label_values(&[endpoint, kind])
            .inc();
    }

    pub fn observe_inference_latency(&self, endpoint: &str, duration_secs: f64) {
        self.inner()
            .inference_latency_seconds
            .with_label_values(&[endpoint])
            .observe(duration_secs);
    }

    pub fn observe_weather_latency(&self, duration_secs: f64) {
        self.inner().weather_upstream_latency_seconds.observe(duration_secs);
    }

    /// Publish one gauge per loaded model file
    pub fn set_model_info(&self, artifacts: &[LoadedArtifact]) {
        let gauge = &self.inner().model_info;
        gauge.reset();
        for artifact in artifacts {
            gauge
                .with_label_values(&[artifact.name.as_str(), artifact.sha256.as_str()])
                .set(1.0);
        }
    }
}

/// Event-tagged log records for service lifecycle and request outcomes
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, artifacts: usize, weather_provider: Option<&str>) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            artifacts = artifacts,
            weather_provider = weather_provider.unwrap_or("none"),
            "Cropix service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Cropix service shutting down"
        );
    }

    pub fn log_artifact_loaded(&self, artifact: &LoadedArtifact) {
        info!(
            event = "artifact_loaded",
            service = %self.service,
            artifact = %artifact.name,
            path = %artifact.path.display(),
            sha256 = %artifact.sha256,
            size_bytes = artifact.size_bytes,
            "Model artifact ready"
        );
    }

    pub fn log_prediction(&self, endpoint: &str, latency_ms: u64) {
        info!(
            event = "prediction_served",
            service = %self.service,
            endpoint = %endpoint,
            latency_ms = latency_ms,
            "Prediction served"
        );
    }

    /// A request answered with an `{error}` payload
    pub fn log_rejected(&self, endpoint: &str, kind: &str, message: &str) {
        warn!(
            event = "request_rejected",
            service = %self.service,
            endpoint = %endpoint,
            kind = %kind,
            message = %message,
            "Request rejected"
        );
    }

    /// A request that failed on the server side
    pub fn log_fault(&self, endpoint: &str, kind: &str, message: &str) {
        error!(
            event = "request_fault",
            service = %self.service,
            endpoint = %endpoint,
            kind = %kind,
            message = %message,
            "Request failed"
        );
    }
}
