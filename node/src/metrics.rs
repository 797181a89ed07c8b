//! # Prometheus Metrics
//!
//! Exposes operational metrics for the ledger node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it
/// can be shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total number of certificate registrations accepted and sealed.
    pub registrations_total: IntCounter,
    /// Total number of registrations refused by the admission policy.
    pub policy_rejections_total: IntCounter,
    /// Total number of blocks sealed (registrations plus genesis blocks
    /// created by this process).
    pub blocks_sealed_total: IntCounter,
    /// Total number of snapshot saves that failed after a successful
    /// append. The chain stays authoritative in memory; this counts how
    /// often the disk disagreed.
    pub persistence_failures_total: IntCounter,
    /// Current number of blocks in the chain.
    pub chain_length: IntGauge,
    /// Histogram of proof-of-work sealing latency in seconds.
    pub seal_duration_seconds: Histogram,
    /// Histogram of nonce attempts per sealed block.
    pub seal_attempts: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("attest".into()), None)
            .expect("failed to create prometheus registry");

        let registrations_total = IntCounter::new(
            "registrations_total",
            "Total number of certificate registrations sealed into the chain",
        )
        .expect("metric creation");
        registry
            .register(Box::new(registrations_total.clone()))
            .expect("metric registration");

        let policy_rejections_total = IntCounter::new(
            "policy_rejections_total",
            "Total number of registrations refused by the admission policy",
        )
        .expect("metric creation");
        registry
            .register(Box::new(policy_rejections_total.clone()))
            .expect("metric registration");

        let blocks_sealed_total = IntCounter::new(
            "blocks_sealed_total",
            "Total number of blocks sealed by this process",
        )
        .expect("metric creation");
        registry
            .register(Box::new(blocks_sealed_total.clone()))
            .expect("metric registration");

        let persistence_failures_total = IntCounter::new(
            "persistence_failures_total",
            "Snapshot saves that failed after a successful append",
        )
        .expect("metric creation");
        registry
            .register(Box::new(persistence_failures_total.clone()))
            .expect("metric registration");

        let chain_length = IntGauge::new("chain_length", "Current number of blocks in the chain")
            .expect("metric creation");
        registry
            .register(Box::new(chain_length.clone()))
            .expect("metric registration");

        let seal_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "seal_duration_seconds",
                "Proof-of-work sealing latency in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(seal_duration_seconds.clone()))
            .expect("metric registration");

        let seal_attempts = Histogram::with_opts(
            HistogramOpts::new("seal_attempts", "Nonce attempts per sealed block").buckets(vec![
                1.0, 4.0, 16.0, 64.0, 256.0, 1024.0, 4096.0, 16384.0, 65536.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(seal_attempts.clone()))
            .expect("metric registration");

        Self {
            registry,
            registrations_total,
            policy_rejections_total,
            blocks_sealed_total,
            persistence_failures_total,
            chain_length,
            seal_duration_seconds,
            seal_attempts,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
