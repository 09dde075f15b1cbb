//! Production observability metrics for the extraction pipeline
//!
//! This module provides metrics collection for monitoring EDGAR request
//! health, retry behavior, rate limiter pressure, and checkpoint progress.
//!
//! ## Architecture
//!
//! - Uses `metrics` crate for low-overhead metric collection
//! - Optional Prometheus exporter for a scraping endpoint
//! - Graceful degradation when no exporter is installed (recorders are
//!   no-ops)

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Global metrics registry initialization flag
static METRICS_INITIALIZED: Lazy<Arc<RwLock<bool>>> = Lazy::new(|| Arc::new(RwLock::new(false)));

/// Initialize metrics system with Prometheus exporter
///
/// This should be called once at application startup, typically in main().
/// The function is idempotent and will not reinitialize if already called.
///
/// # Arguments
/// * `addr` - Socket address to bind Prometheus scrape endpoint (e.g., "0.0.0.0:9090")
///
/// # Returns
/// Ok(()) if metrics initialized successfully, Err if binding fails
pub async fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    let mut initialized = METRICS_INITIALIZED.write().await;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "edgar_requests_total",
        Unit::Count,
        "Total number of HTTP requests answered by EDGAR, by status"
    );

    describe_counter!(
        "edgar_network_errors_total",
        Unit::Count,
        "Total number of EDGAR requests that failed before a response"
    );

    describe_counter!(
        "http_retries_total",
        Unit::Count,
        "Total number of retry attempts"
    );

    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );

    describe_counter!(
        "rate_limit_permits_acquired_total",
        Unit::Count,
        "Total number of rate limit permits acquired"
    );

    describe_gauge!(
        "rate_limit_permits_available",
        Unit::Count,
        "Currently available rate limit permits"
    );

    describe_histogram!(
        "rate_limit_queue_wait_seconds",
        Unit::Seconds,
        "Time spent waiting for rate limit permits"
    );

    describe_counter!(
        "extractions_completed_total",
        Unit::Count,
        "Total number of companies extracted successfully"
    );

    describe_counter!(
        "extractions_failed_total",
        Unit::Count,
        "Total number of companies that failed terminally"
    );

    describe_counter!(
        "checkpoint_saves_total",
        Unit::Count,
        "Total number of checkpoint files written"
    );

    describe_gauge!(
        "checkpoint_progress_percent",
        Unit::Percent,
        "Progress of the running analysis at the last checkpoint save"
    );

    *initialized = true;
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Record one EDGAR response by HTTP status
pub fn record_edgar_request(status: u16) {
    counter!(
        "edgar_requests_total",
        "status" => status.to_string(),
    )
    .increment(1);

    if status == 429 || status == 403 {
        warn!(status = status, "EDGAR throttle response recorded");
    }
}

/// Record an EDGAR request that died before producing a response
pub fn record_edgar_network_error() {
    counter!("edgar_network_errors_total").increment(1);
}

/// Record retry backoff duration
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!(
        "http_retries_total",
        "attempt" => attempt.to_string(),
    )
    .increment(1);

    histogram!(
        "retry_backoff_duration_seconds",
        "attempt" => attempt.to_string(),
    )
    .record(duration.as_secs_f64());

    debug!(
        attempt = attempt,
        backoff_ms = duration.as_millis(),
        "Retry backoff recorded"
    );
}

/// Record a checkpoint save and the progress it captured
pub fn record_checkpoint_save(progress_pct: f64) {
    counter!("checkpoint_saves_total").increment(1);
    gauge!("checkpoint_progress_percent").set(progress_pct);
}

/// Rate limiter metrics helper
pub struct RateLimiterMetrics {
    start_time: Option<Instant>,
}

impl Default for RateLimiterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiterMetrics {
    /// Create a new rate limiter metrics instance
    pub fn new() -> Self {
        Self { start_time: None }
    }

    /// Start measuring queue wait time
    pub fn start_acquire(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Record successful permit acquisition
    pub fn record_acquired(&mut self) {
        if let Some(start) = self.start_time.take() {
            let wait_duration = start.elapsed();

            histogram!("rate_limit_queue_wait_seconds").record(wait_duration.as_secs_f64());
            counter!("rate_limit_permits_acquired_total").increment(1);

            if wait_duration.as_millis() > 100 {
                debug!(
                    wait_ms = wait_duration.as_millis(),
                    "Rate limit permit acquired after wait"
                );
            }
        }
    }

    /// Update available permits gauge
    pub fn update_available_permits(&self, available: u32) {
        gauge!("rate_limit_permits_available").set(available as f64);
    }
}

/// Per-company extraction metrics
pub struct ExtractionMetrics {
    cik: String,
    company: String,
    start_time: Instant,
}

impl ExtractionMetrics {
    /// Start tracking one company's extraction attempt
    pub fn start(cik: impl Into<String>, company: impl Into<String>) -> Self {
        let cik = cik.into();
        let company = company.into();

        info!(
            cik = %cik,
            company = %company,
            "Company extraction started"
        );

        Self {
            cik,
            company,
            start_time: Instant::now(),
        }
    }

    /// Record successful extraction completion
    pub fn record_success(&self, data_points: u64) {
        let duration = self.start_time.elapsed();

        counter!(
            "extractions_completed_total",
            "cik" => self.cik.clone(),
        )
        .increment(1);

        info!(
            cik = %self.cik,
            company = %self.company,
            data_points = data_points,
            duration_secs = duration.as_secs(),
            "Company extraction completed"
        );
    }

    /// Record terminally failed extraction
    pub fn record_failure(&self, error: &str) {
        let duration = self.start_time.elapsed();

        counter!(
            "extractions_failed_total",
            "cik" => self.cik.clone(),
        )
        .increment(1);

        error!(
            cik = %self.cik,
            company = %self.company,
            error = %error,
            duration_secs = duration.as_secs(),
            "Company extraction failed"
        );
    }
}

/// Check if metrics system is initialized
pub async fn is_initialized() -> bool {
    *METRICS_INITIALIZED.read().await
}
