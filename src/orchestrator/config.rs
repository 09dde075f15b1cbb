//! Extraction run configuration constants

use std::time::Duration;

/// Maximum number of extraction attempts per company.
/// 3 attempts absorbs transient EDGAR outages without letting one stuck
/// company stall a several-hundred-company run (each attempt already
/// carries HTTP-level retries underneath).
pub const MAX_COMPANY_RETRIES: u32 = 3;

/// Maximum number of retries for a single failed HTTP request.
/// 5 retries with exponential backoff allows recovery from transient network
/// issues while avoiding infinite loops on persistent failures (max total
/// wait ~1 minute).
pub const MAX_HTTP_RETRIES: u32 = 5;

/// Initial backoff delay in milliseconds.
/// 1 second is long enough for EDGAR's per-second fair-access window to
/// reset but short enough to not overly delay recovery from transient
/// errors.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds.
/// 30 seconds caps exponential backoff to prevent excessive wait times
/// (retry 5 = 32s capped to 30s, total max wait with 5 retries ~63s).
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Save the checkpoint after every N companies processed.
/// 5 companies bounds replay after a crash to four companies of rework
/// while keeping checkpoint I/O negligible next to per-company fetch cost
/// (a company takes multiple seconds of rate-limited EDGAR calls).
pub const DEFAULT_SAVE_FREQUENCY: u32 = 5;

/// Delay between year-level fetches within one company.
/// Each year costs a handful of EDGAR requests; 200ms spacing keeps a
/// sequential run comfortably inside the fair-access guidance even when
/// the rate limiter window is already drained.
pub const YEAR_FETCH_DELAY_MS: u64 = 200;

/// Number of fiscal years in the default analysis window, ending at the
/// target year. Five years matches the lookback of pay-versus-performance
/// disclosures, so compensation and tax figures cover the same span.
pub const DEFAULT_ANALYSIS_WINDOW_YEARS: i32 = 5;

/// Calculate exponential backoff delay
pub fn calculate_backoff(retry_count: u32) -> Duration {
    let delay_ms = INITIAL_BACKOFF_MS * 2u64.pow(retry_count);
    let delay_ms = delay_ms.min(MAX_BACKOFF_MS);
    Duration::from_millis(delay_ms)
}
