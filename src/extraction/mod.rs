//! Company data extraction implementations

use crate::checkpoint::record::{CompensationRecord, TaxExpense};
use async_trait::async_trait;

pub mod edgar;
pub mod edgar_config;
pub mod edgar_http;
pub mod facts;

/// Extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// HTTP request error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    NetworkError(String),

    /// Resource does not exist upstream (EDGAR 404)
    #[error("not found: {0}")]
    NotFound(String),

    /// EDGAR kept throttling after client-side retries were exhausted
    #[error("throttled by EDGAR: {0}")]
    Throttled(String),

    /// Malformed company identifier
    #[error("invalid CIK: {0}")]
    InvalidCik(String),

    /// Extractor misconfiguration
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl ExtractError {
    /// Whether this failure should abort the whole company attempt rather
    /// than being contained to the year being fetched.
    ///
    /// Sustained throttling means every further request from this attempt
    /// would also be rejected, and a malformed CIK fails identically for
    /// every year. All other failures are scoped to a single fetch.
    pub fn aborts_company(&self) -> bool {
        matches!(
            self,
            ExtractError::Throttled(_) | ExtractError::InvalidCik(_)
        )
    }
}

/// Result type for extraction operations
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Extraction service trait consumed by the orchestrator
#[async_trait]
pub trait CompanyDataExtractor: Send + Sync {
    /// Extract the annual income-tax expense for one fiscal year
    ///
    /// # Arguments
    /// * `cik` - SEC Central Index Key, digits only
    /// * `fiscal_year` - Fiscal year the figure covers
    ///
    /// # Returns
    /// `Ok(None)` when the company reported nothing for that year; errors
    /// only for transport or payload failures
    async fn extract_tax_expense(
        &self,
        cik: &str,
        fiscal_year: i32,
    ) -> ExtractResult<Option<TaxExpense>>;

    /// Extract executive compensation records for one fiscal year
    ///
    /// # Arguments
    /// * `cik` - SEC Central Index Key, digits only
    /// * `fiscal_year` - Fiscal year the figures cover
    ///
    /// # Returns
    /// Empty vec when no disclosures cover that year
    async fn extract_executive_compensation(
        &self,
        cik: &str,
        fiscal_year: i32,
    ) -> ExtractResult<Vec<CompensationRecord>>;

    /// Get the base URL this extractor talks to
    fn base_url(&self) -> &str;
}

/// Create the production extractor backed by EDGAR's JSON APIs
///
/// # Arguments
/// * `user_agent` - Contact string EDGAR requires from automated clients,
///   e.g. `"example-corp research admin@example.com"`
///
/// # Errors
/// Returns an error when the user agent is empty or the HTTP client cannot
/// be constructed
pub fn create_extractor(user_agent: &str) -> ExtractResult<Box<dyn CompanyDataExtractor>> {
    if user_agent.trim().is_empty() {
        return Err(ExtractError::ConfigError(
            "EDGAR requires a User-Agent identifying the requester".to_string(),
        ));
    }

    Ok(Box::new(edgar::EdgarExtractor::new(user_agent)?))
}
