//! SEC EDGAR API configuration
//!
//! This module pins the EDGAR endpoints and XBRL concept names the
//! extractor queries, so endpoint differences stay configuration rather
//! than string literals scattered through fetch code.
//!
//! # APIs used
//!
//! - **companyconcept**: <https://data.sec.gov/api/xbrl/companyconcept/>
//!   returns one concept for one company across all filed periods. One call
//!   per (company, concept) covers every year in the analysis window.

/// Configuration for the EDGAR data APIs
///
/// # Fair access (SEC guidance)
///
/// EDGAR asks automated clients to stay at or below 10 requests per second
/// and to send a User-Agent naming the requester. Violations draw HTTP 429
/// responses and, if sustained, a temporary IP block.
#[derive(Debug, Clone)]
pub struct EdgarApiConfig {
    /// Base URL for the data APIs (e.g., <https://data.sec.gov>)
    pub base_url: &'static str,

    /// Company-concept endpoint path prefix
    /// (e.g., /api/xbrl/companyconcept/CIK0000320193/us-gaap/Tag.json)
    pub company_concept_endpoint: &'static str,

    /// Fair-access request ceiling per second
    pub max_requests_per_second: usize,
}

/// Production EDGAR configuration
pub const EDGAR_CONFIG: EdgarApiConfig = EdgarApiConfig {
    base_url: "https://data.sec.gov",
    company_concept_endpoint: "/api/xbrl/companyconcept",
    max_requests_per_second: 10,
};

/// Taxonomy holding income-statement concepts
pub const US_GAAP_TAXONOMY: &str = "us-gaap";

/// Annual income-tax expense (benefit) concept, reported in 10-K filings
pub const TAX_EXPENSE_TAG: &str = "IncomeTaxExpenseBenefit";

/// Taxonomy holding pay-versus-performance disclosure concepts
pub const ECD_TAXONOMY: &str = "ecd";

/// Total compensation actually reported for the principal executive officer
pub const PEO_TOTAL_COMP_TAG: &str = "PeoTotalCompAmt";

/// Average total compensation reported for the remaining named executives
pub const NEO_AVG_TOTAL_COMP_TAG: &str = "NeoAvgTotalCompAmt";

/// Display name attached to principal-executive-officer figures
///
/// The JSON concept APIs expose only numeric facts, so the officer's actual
/// name (a text fact in the proxy statement) is not available here.
pub const PEO_DISPLAY_NAME: &str = "Principal Executive Officer";

/// Display name attached to averaged named-executive-officer figures
pub const NEO_DISPLAY_NAME: &str = "Named Executive Officers (average)";
