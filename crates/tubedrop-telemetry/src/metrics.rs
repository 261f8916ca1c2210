//! Prometheus registry for the HTTP surface and the download pipeline.
//!
//! # Design
//! - Collector registration is private; callers only see typed recording methods.
//! - Latency is exported as "last observed" gauges, matching the snapshot used by `/health`.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry shared across the service.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    downloads_total: IntCounterVec,
    downloads_in_flight: IntGauge,
    workspace_cleanup_failures_total: IntCounter,
    credential_fallbacks_total: IntCounter,
    delivered_bytes_total: IntCounter,
    extraction_latency_ms: IntGauge,
}

/// Point-in-time view of the gauges and counters reported by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Downloads currently extracting or resolving.
    pub downloads_in_flight: i64,
    /// Workspace removals that failed.
    pub workspace_cleanup_failures_total: u64,
    /// Requests that continued without credentials after a staging failure.
    pub credential_fallbacks_total: u64,
    /// Artifact bytes streamed to callers.
    pub delivered_bytes_total: u64,
    /// Duration of the most recent engine run (ms).
    pub extraction_latency_ms: i64,
}

impl Metrics {
    /// Build a registry with every collector registered.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] if a collector cannot be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let http_requests_total = counter_vec(
            "http_requests_total",
            "Total HTTP requests received",
            &["route", "code"],
        )?;
        let downloads_total = counter_vec(
            "downloads_total",
            "Download requests by format and outcome",
            &["format", "outcome"],
        )?;
        let downloads_in_flight = gauge(
            "downloads_in_flight",
            "Downloads currently extracting or resolving",
        )?;
        let workspace_cleanup_failures_total = counter(
            "workspace_cleanup_failures_total",
            "Request workspaces that could not be removed",
        )?;
        let credential_fallbacks_total = counter(
            "credential_fallbacks_total",
            "Requests that proceeded without credentials after a staging failure",
        )?;
        let delivered_bytes_total = counter(
            "delivered_bytes_total",
            "Artifact bytes streamed to callers",
        )?;
        let extraction_latency_ms = gauge(
            "extraction_latency_ms",
            "Duration of the most recent engine run (ms)",
        )?;

        register(&registry, "http_requests_total", &http_requests_total)?;
        register(&registry, "downloads_total", &downloads_total)?;
        register(&registry, "downloads_in_flight", &downloads_in_flight)?;
        register(
            &registry,
            "workspace_cleanup_failures_total",
            &workspace_cleanup_failures_total,
        )?;
        register(
            &registry,
            "credential_fallbacks_total",
            &credential_fallbacks_total,
        )?;
        register(&registry, "delivered_bytes_total", &delivered_bytes_total)?;
        register(&registry, "extraction_latency_ms", &extraction_latency_ms)?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                downloads_total,
                downloads_in_flight,
                workspace_cleanup_failures_total,
                credential_fallbacks_total,
                delivered_bytes_total,
                extraction_latency_ms,
            }),
        })
    }

    /// Count an HTTP response for the matched route.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Count a finished download request.
    pub fn inc_download(&self, format: &str, outcome: &str) {
        self.inner
            .downloads_total
            .with_label_values(&[format, outcome])
            .inc();
    }

    /// Mark a download as in flight until the returned guard is dropped.
    pub fn track_download(&self) -> InFlightGuard {
        self.inner.downloads_in_flight.inc();
        InFlightGuard {
            gauge: self.inner.downloads_in_flight.clone(),
        }
    }

    /// Count a workspace that could not be removed.
    pub fn inc_cleanup_failure(&self) {
        self.inner.workspace_cleanup_failures_total.inc();
    }

    /// Count a credential staging failure that was degraded to "no credentials".
    pub fn inc_credential_fallback(&self) {
        self.inner.credential_fallbacks_total.inc();
    }

    /// Add streamed artifact bytes.
    pub fn add_delivered_bytes(&self, bytes: u64) {
        self.inner.delivered_bytes_total.inc_by(bytes);
    }

    /// Record the duration of an engine run.
    pub fn observe_extraction_latency(&self, duration: Duration) {
        self.inner
            .extraction_latency_ms
            .set(Self::duration_to_ms(duration));
    }

    /// Render the registry in the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError`] if encoding fails or the output is not UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Snapshot of the gauges and counters reported by `/health`.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            downloads_in_flight: self.inner.downloads_in_flight.get(),
            workspace_cleanup_failures_total: self.inner.workspace_cleanup_failures_total.get(),
            credential_fallbacks_total: self.inner.credential_fallbacks_total.get(),
            delivered_bytes_total: self.inner.delivered_bytes_total.get(),
            extraction_latency_ms: self.inner.extraction_latency_ms.get(),
        }
    }

    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Decrements `downloads_in_flight` when dropped.
#[must_use]
pub struct InFlightGuard {
    gauge: IntGauge,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

fn counter_vec(name: &'static str, help: &str, labels: &[&str]) -> Result<IntCounterVec> {
    IntCounterVec::new(Opts::new(name, help), labels)
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn counter(name: &'static str, help: &str) -> Result<IntCounter> {
    IntCounter::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn gauge(name: &'static str, help: &str) -> Result<IntGauge> {
    IntGauge::with_opts(Opts::new(name, help))
        .map_err(|source| TelemetryError::MetricsCollector { name, source })
}

fn register<C>(registry: &Registry, name: &'static str, collector: &C) -> Result<()>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::MetricsRegister { name, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn snapshot_reflects_recorded_values() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_http_request("/download", 200);
        metrics.inc_download("mp3", "delivered");
        metrics.inc_cleanup_failure();
        metrics.inc_credential_fallback();
        metrics.add_delivered_bytes(2_048);
        metrics.observe_extraction_latency(Duration::from_millis(350));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.downloads_in_flight, 0);
        assert_eq!(snapshot.workspace_cleanup_failures_total, 1);
        assert_eq!(snapshot.credential_fallbacks_total, 1);
        assert_eq!(snapshot.delivered_bytes_total, 2_048);
        assert_eq!(snapshot.extraction_latency_ms, 350);

        let rendered = metrics.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("downloads_total{format=\"mp3\",outcome=\"delivered\"} 1"));
        Ok(())
    }

    #[test]
    fn in_flight_guard_tracks_gauge() -> Result<()> {
        let metrics = Metrics::new()?;
        let first = metrics.track_download();
        let second = metrics.track_download();
        assert_eq!(metrics.snapshot().downloads_in_flight, 2);
        drop(first);
        assert_eq!(metrics.snapshot().downloads_in_flight, 1);
        drop(second);
        assert_eq!(metrics.snapshot().downloads_in_flight, 0);
        Ok(())
    }
}
