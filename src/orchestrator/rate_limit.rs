//! Request-rate limiting for SEC EDGAR fair-access compliance
//!
//! EDGAR allows automated clients roughly 10 requests per second; exceeding
//! that draws HTTP 429 responses and eventually a temporary IP block. The
//! limiter caps in-flight requests per sliding window.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::sleep;

/// Request-based rate limiter with a sliding window
#[derive(Clone)]
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    window: Duration,
    max_requests: usize,
}

impl RateLimiter {
    /// Create a request-based rate limiter
    ///
    /// # Arguments
    /// * `max_requests` - Maximum requests per window
    /// * `window` - Time window for rate limit
    pub fn request_based(max_requests: usize, window: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_requests)),
            window,
            max_requests,
        }
    }

    /// Maximum requests permitted per window
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    /// Permits currently available in the window
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Acquire a permit for one request, waiting if the window is drained
    ///
    /// The owned permit is held for the window duration and then dropped,
    /// which releases it back to the semaphore.
    pub async fn acquire(&self) -> Result<(), RateLimitError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;

        let window = self.window;
        tokio::spawn(async move {
            sleep(window).await;
            drop(permit);
        });

        Ok(())
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Failed to acquire permits
    #[error("failed to acquire rate limit permits: {0}")]
    AcquireError(String),
}
