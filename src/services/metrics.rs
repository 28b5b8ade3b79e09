//! Metrics collection and Prometheus integration service.

use crate::models::SuspicionSignal;
use prometheus::{
    Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::{Duration, Instant};

/// Application metrics collector for Prometheus integration
#[derive(Clone)]
pub struct AppMetrics {
    pub registry: Registry,
    pub http_requests_total: CounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub app_uptime_seconds: Gauge,
    pub app_info: CounterVec,
    pub sessions_created_total: Counter,
    pub sessions_flagged_total: CounterVec,
    pub sessions_revoked_total: Counter,
    pub detector_failures_total: Counter,
    pub start_time: Instant,
}

impl AppMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "status", "route"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            )
            .buckets(vec![
                0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "route"],
        )?;

        let app_uptime_seconds = Gauge::new("app_uptime_seconds", "Application uptime in seconds")?;

        let app_info = CounterVec::new(
            Opts::new("app_info", "Application information"),
            &["version", "commit", "build_time"],
        )?;

        let sessions_created_total =
            Counter::new("sessions_created_total", "Login sessions created")?;

        let sessions_flagged_total = CounterVec::new(
            Opts::new(
                "sessions_flagged_total",
                "Logins flagged as suspicious, by triggering signal",
            ),
            &["signal"],
        )?;

        let sessions_revoked_total =
            Counter::new("sessions_revoked_total", "Sessions moved to the revoked state")?;

        let detector_failures_total = Counter::new(
            "detector_failures_total",
            "Suspicious-activity evaluations skipped because of storage errors",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(app_uptime_seconds.clone()))?;
        registry.register(Box::new(app_info.clone()))?;
        registry.register(Box::new(sessions_created_total.clone()))?;
        registry.register(Box::new(sessions_flagged_total.clone()))?;
        registry.register(Box::new(sessions_revoked_total.clone()))?;
        registry.register(Box::new(detector_failures_total.clone()))?;

        app_info
            .with_label_values(&[
                env!("CARGO_PKG_VERSION"),
                option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
                option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown"),
            ])
            .inc();

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            app_uptime_seconds,
            app_info,
            sessions_created_total,
            sessions_flagged_total,
            sessions_revoked_total,
            detector_failures_total,
            start_time: Instant::now(),
        })
    }

    /// Record an HTTP request with method, route, status, and duration
    pub fn record_request(&self, method: &str, route: &str, status: u16, duration: Duration) {
        if route == "/api/metrics" {
            return;
        }

        self.http_requests_total
            .with_label_values(&[method, &status.to_string(), route])
            .inc();

        self.http_request_duration_seconds
            .with_label_values(&[method, route])
            .observe(duration.as_secs_f64());
    }

    pub fn record_session_created(&self) {
        self.sessions_created_total.inc();
    }

    pub fn record_session_flagged(&self, signal: Option<SuspicionSignal>) {
        let label = signal.map(|s| s.as_str()).unwrap_or("manual");
        self.sessions_flagged_total.with_label_values(&[label]).inc();
    }

    pub fn record_sessions_revoked(&self, count: u64) {
        self.sessions_revoked_total.inc_by(count as f64);
    }

    pub fn record_detector_failure(&self) {
        self.detector_failures_total.inc();
    }

    pub fn update_uptime(&self) {
        let uptime = self.start_time.elapsed().as_secs_f64();
        self.app_uptime_seconds.set(uptime);
    }

    /// Render metrics in Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder.encode_to_string(&metric_families)
    }
}
