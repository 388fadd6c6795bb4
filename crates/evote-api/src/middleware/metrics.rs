//! # Prometheus Metrics
//!
//! HTTP-level metrics (request counts, latency, errors) are recorded in
//! middleware. Voting counters (ballots cast, receipts created or failed,
//! verification outcomes) are incremented by the handlers. Registration and
//! election gauges are refreshed on each `/metrics` scrape (pull model), see
//! the metrics handler in `lib.rs`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::core::Collector;
use prometheus::{
    Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts,
    Registry, TextEncoder,
};

/// Path label used for requests that matched no route.
const UNMATCHED_PATH: &str = "{unmatched}";

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct ApiMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,

    // -- HTTP middleware metrics (push model) --
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    http_errors_total: IntCounterVec,

    // -- Voting counters (push model) --
    votes_cast_total: IntCounter,
    receipts_created_total: IntCounter,
    receipt_failures_total: IntCounter,
    receipt_verifications_total: IntCounterVec,

    // -- Domain gauges (pull model, updated on /metrics scrape) --
    elections_total: GaugeVec,
    registrations_total: GaugeVec,
    receipts_stored: Gauge,
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("requests", &self.requests())
            .field("errors", &self.errors())
            .field("votes_cast", &self.inner.votes_cast_total.get())
            .finish()
    }
}

/// Register a collector, returning it for storage.
fn registered<C: Collector + Clone + 'static>(registry: &Registry, collector: C) -> C {
    registry
        .register(Box::new(collector.clone()))
        .expect("metric can be registered");
    collector
}

impl ApiMetrics {
    /// Create a new metrics instance with a fresh Prometheus registry.
    pub fn new() -> Self {
        let registry = Registry::new();

        let http_requests_total = registered(
            &registry,
            IntCounterVec::new(
                Opts::new("evote_http_requests_total", "Total HTTP requests"),
                &["method", "path", "status"],
            )
            .expect("metric can be created"),
        );

        let http_request_duration_seconds = registered(
            &registry,
            HistogramVec::new(
                HistogramOpts::new(
                    "evote_http_request_duration_seconds",
                    "HTTP request duration in seconds",
                )
                .buckets(vec![
                    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ]),
                &["method", "path"],
            )
            .expect("metric can be created"),
        );

        let http_errors_total = registered(
            &registry,
            IntCounterVec::new(
                Opts::new("evote_http_errors_total", "Total HTTP errors (4xx and 5xx)"),
                &["method", "path", "status"],
            )
            .expect("metric can be created"),
        );

        let votes_cast_total = registered(
            &registry,
            IntCounter::new("evote_votes_cast_total", "Ballots committed to the tally")
                .expect("metric can be created"),
        );

        let receipts_created_total = registered(
            &registry,
            IntCounter::new("evote_receipts_created_total", "Vote receipts persisted")
                .expect("metric can be created"),
        );

        let receipt_failures_total = registered(
            &registry,
            IntCounter::new(
                "evote_receipt_failures_total",
                "Ballots recorded without a receipt because receipt creation failed",
            )
            .expect("metric can be created"),
        );

        let receipt_verifications_total = registered(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "evote_receipt_verifications_total",
                    "Receipt verification lookups by outcome",
                ),
                &["outcome"],
            )
            .expect("metric can be created"),
        );

        let elections_total = registered(
            &registry,
            GaugeVec::new(
                Opts::new("evote_elections_total", "Elections by status"),
                &["status"],
            )
            .expect("metric can be created"),
        );

        let registrations_total = registered(
            &registry,
            GaugeVec::new(
                Opts::new(
                    "evote_registrations_total",
                    "Registrations by kind and approval status",
                ),
                &["kind", "status"],
            )
            .expect("metric can be created"),
        );

        let receipts_stored = registered(
            &registry,
            Gauge::new("evote_receipts_stored", "Receipts currently in the receipt store")
                .expect("metric can be created"),
        );

        Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                http_errors_total,
                votes_cast_total,
                receipts_created_total,
                receipt_failures_total,
                receipt_verifications_total,
                elections_total,
                registrations_total,
                receipts_stored,
            }),
        }
    }

    /// Current total request count (sum across all labels).
    pub fn requests(&self) -> u64 {
        sum_counter(&self.inner.http_requests_total)
    }

    /// Current total error count (sum across all labels).
    pub fn errors(&self) -> u64 {
        sum_counter(&self.inner.http_errors_total)
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();

        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);

        if status >= 400 {
            self.inner
                .http_errors_total
                .with_label_values(&[method, path, &status_str])
                .inc();
        }
    }

    // -- Voting counters --

    pub fn votes_cast(&self) -> &IntCounter {
        &self.inner.votes_cast_total
    }

    pub fn receipts_created(&self) -> &IntCounter {
        &self.inner.receipts_created_total
    }

    pub fn receipt_failures(&self) -> &IntCounter {
        &self.inner.receipt_failures_total
    }

    /// Count one verification lookup. `valid` selects the `outcome` label.
    pub fn record_verification(&self, valid: bool) {
        let outcome = if valid { "valid" } else { "invalid" };
        self.inner
            .receipt_verifications_total
            .with_label_values(&[outcome])
            .inc();
    }

    // -- Domain gauge accessors (used by the /metrics handler) --

    pub fn elections_total(&self) -> &GaugeVec {
        &self.inner.elections_total
    }

    pub fn registrations_total(&self) -> &GaugeVec {
        &self.inner.registrations_total
    }

    pub fn receipts_stored(&self) -> &Gauge {
        &self.inner.receipts_stored
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer)
            .map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum_counter(vec: &IntCounterVec) -> u64 {
    vec.collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}

/// Middleware that records HTTP request metrics.
///
/// The `path` label is the route template (`/voter/receipt/:receipt_id`),
/// never the concrete URI, so voter and receipt identifiers do not end up in
/// label values.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        let duration = start.elapsed().as_secs_f64();
        m.record_request(&method, &path, response.status().as_u16(), duration);
    }

    response
}
