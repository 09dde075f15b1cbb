//! EDGAR HTTP client helper module
//!
//! Provides the shared HTTP plumbing for EDGAR data-API calls:
//! - Generic request/response handling
//! - Rate limit integration
//! - Retry logic with exponential backoff
//!
//! EDGAR signals throttling with HTTP 429 and, once a client is blocked,
//! with HTTP 403 carrying a "Request Rate Threshold Exceeded" page; both
//! are retried with backoff and surface as [`ExtractError::Throttled`]
//! when retries run out.

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::extraction::{ExtractError, ExtractResult};
use crate::metrics::RateLimiterMetrics;
use crate::orchestrator::config::{calculate_backoff, MAX_HTTP_RETRIES};
use crate::orchestrator::rate_limit::RateLimiter;

/// Unified HTTP client for EDGAR data-API interactions
pub struct EdgarHttpClient {
    client: Arc<Client>,
    base_url: String,
    rate_limiter: Arc<RateLimiter>,
}

impl EdgarHttpClient {
    /// Create new HTTP client
    ///
    /// # Arguments
    /// * `client` - Shared HTTP client, already carrying the User-Agent
    ///   EDGAR requires (Arc for cheap cloning)
    /// * `base_url` - Base URL for API endpoints (e.g., "<https://data.sec.gov>")
    /// * `rate_limiter` - Shared rate limiter (Arc for global quota enforcement)
    pub fn new(
        client: Arc<Client>,
        base_url: impl Into<String>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            rate_limiter,
        }
    }

    /// Base URL this client points at
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Execute GET request with generic deserialization
    ///
    /// # Arguments
    /// * `endpoint` - API endpoint path (e.g., "/api/xbrl/companyconcept/...")
    ///
    /// # Errors
    /// Returns ExtractError on network, parse, or API errors; a 404 maps to
    /// [`ExtractError::NotFound`] without retrying
    pub async fn get<T>(&self, endpoint: &str) -> ExtractResult<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);

        // Consult the rate limiter before the first attempt; retries reuse
        // the same permit since they replace the original request
        let mut limiter_metrics = RateLimiterMetrics::new();
        limiter_metrics.start_acquire();
        self.rate_limiter
            .acquire()
            .await
            .map_err(|e| ExtractError::NetworkError(format!("Rate limiter error: {}", e)))?;
        limiter_metrics.record_acquired();
        limiter_metrics.update_available_permits(self.rate_limiter.available_permits() as u32);

        debug!("Making GET request to: {}", url);

        self.request_with_retry(&url).await
    }

    /// Implement retry logic with exponential backoff
    ///
    /// Retries on:
    /// - Network errors (timeout, connection refused)
    /// - 5xx server errors
    /// - 429 and 403 throttle responses
    ///
    /// Does not retry on:
    /// - 404 (mapped to NotFound)
    /// - Other 4xx client errors
    /// - Successful responses
    async fn request_with_retry<T>(&self, url: &str) -> ExtractResult<T>
    where
        T: DeserializeOwned,
    {
        let mut last_error = None;

        for attempt in 0..=MAX_HTTP_RETRIES {
            let response = match self.client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        "Network error on attempt {}/{}: {}",
                        attempt + 1,
                        MAX_HTTP_RETRIES + 1,
                        e
                    );
                    crate::metrics::record_edgar_network_error();
                    last_error = Some(ExtractError::NetworkError(e.to_string()));

                    if attempt < MAX_HTTP_RETRIES {
                        let backoff = calculate_backoff(attempt);
                        crate::metrics::record_retry_backoff(backoff, attempt);
                        debug!("Retrying after {:?}", backoff);
                        tokio::time::sleep(backoff).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();
            crate::metrics::record_edgar_request(status.as_u16());

            if Self::is_throttle_status(status) {
                warn!(
                    "Throttle response {} on attempt {}/{}",
                    status,
                    attempt + 1,
                    MAX_HTTP_RETRIES + 1
                );
                last_error = Some(ExtractError::Throttled(format!(
                    "{} from {}",
                    status, url
                )));

                if attempt < MAX_HTTP_RETRIES {
                    let backoff = calculate_backoff(attempt);
                    crate::metrics::record_retry_backoff(backoff, attempt);
                    debug!("Retrying after {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                break;
            }

            if status.is_server_error() {
                warn!(
                    "Server error {} on attempt {}/{}",
                    status,
                    attempt + 1,
                    MAX_HTTP_RETRIES + 1
                );
                last_error = Some(ExtractError::HttpError(format!("Server error: {}", status)));

                if attempt < MAX_HTTP_RETRIES {
                    let backoff = calculate_backoff(attempt);
                    crate::metrics::record_retry_backoff(backoff, attempt);
                    debug!("Retrying after {:?}", backoff);
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                break;
            }

            if status == StatusCode::NOT_FOUND {
                return Err(ExtractError::NotFound(url.to_string()));
            }

            if status.is_client_error() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(ExtractError::HttpError(format!(
                    "Client error {}: {}",
                    status, error_text
                )));
            }

            match response.json::<T>().await {
                Ok(data) => {
                    debug!("Request succeeded on attempt {}", attempt + 1);
                    return Ok(data);
                }
                Err(e) => {
                    return Err(ExtractError::ParseError(format!(
                        "Failed to deserialize response: {}",
                        e
                    )));
                }
            }
        }

        // All retries exhausted
        Err(last_error
            .unwrap_or_else(|| ExtractError::NetworkError("All retries exhausted".to_string())))
    }

    /// Whether a status code means EDGAR is throttling the client.
    /// 403 covers the block page EDGAR serves after sustained violations.
    fn is_throttle_status(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN
    }
}
