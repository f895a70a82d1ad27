// Prometheus metrics definitions for the decision backend.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Once;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Entries currently held by the lesson log.
    pub static ref MEMORY_ENTRIES: IntGauge =
        IntGauge::new("hollowzoo_memory_entries", "Entries held by the lesson log").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Decisions returned, by profile, action and source (policy/model/fallback).
    pub static ref DECISIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("hollowzoo_decisions_total", "Total decisions returned"),
        &["profile", "action", "source"],
    )
    .unwrap();

    /// Hosted model calls that ended in a fallback, by failure kind.
    pub static ref MODEL_FAILURES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("hollowzoo_model_failures_total", "Model calls that fell back"),
        &["kind"],
    )
    .unwrap();

    /// Reflections produced, by outcome.
    pub static ref REFLECTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("hollowzoo_reflections_total", "Total post-battle reflections"),
        &["outcome"],
    )
    .unwrap();

    /// Lesson log writes that failed.
    pub static ref MEMORY_PERSIST_FAILURES_TOTAL: IntCounter = IntCounter::new(
        "hollowzoo_memory_persist_failures_total",
        "Lesson log writes that failed",
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("hollowzoo_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// API request duration in seconds, by endpoint.
    pub static ref API_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "hollowzoo_api_request_duration_seconds",
            "API request duration in seconds",
        )
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 5.0, 30.0]),
        &["endpoint"],
    )
    .unwrap();
}

static REGISTER: Once = Once::new();

/// Register all metrics with the custom registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(MEMORY_ENTRIES.clone()),
            Box::new(DECISIONS_TOTAL.clone()),
            Box::new(MODEL_FAILURES_TOTAL.clone()),
            Box::new(REFLECTIONS_TOTAL.clone()),
            Box::new(MEMORY_PERSIST_FAILURES_TOTAL.clone()),
            Box::new(API_REQUESTS_TOTAL.clone()),
            Box::new(API_REQUEST_DURATION_SECONDS.clone()),
        ];

        for c in collectors {
            if let Err(e) = REGISTRY.register(c) {
                tracing::warn!("Failed to register metric: {e}");
            }
        }
    });
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
