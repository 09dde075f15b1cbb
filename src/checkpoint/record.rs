//! Per-company extraction state and extracted financial data

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extraction lifecycle status for a single company
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Extraction has not been attempted yet (or is awaiting retry)
    #[default]
    Pending,
    /// Extraction attempt is currently running
    InProgress,
    /// All analysis years attempted and derived metrics computed
    Completed,
    /// Extraction failed after exhausting retries
    Failed,
    /// Company was excluded from processing
    Skipped,
}

impl std::fmt::Display for ExtractionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExtractionStatus::Pending => "pending",
            ExtractionStatus::InProgress => "in_progress",
            ExtractionStatus::Completed => "completed",
            ExtractionStatus::Failed => "failed",
            ExtractionStatus::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// Income tax expense figures for one fiscal year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxExpense {
    /// Fiscal year the figures cover
    pub fiscal_year: i32,
    /// Total income tax expense (USD); absent when the filing reports no value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_tax_expense: Option<Decimal>,
    /// Form the figure was taken from (e.g. "10-K")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_form: Option<String>,
    /// Fiscal period end date as reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<String>,
}

/// One executive-compensation line for one fiscal year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompensationRecord {
    /// Executive name or disclosure role (e.g. "PEO")
    pub executive_name: String,
    /// Title/position when disclosed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    /// Fiscal year the compensation covers
    pub fiscal_year: i32,
    /// Total compensation (USD)
    pub total_compensation: Decimal,
    /// Base salary component when disclosed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<Decimal>,
    /// Bonus component when disclosed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus: Option<Decimal>,
}

/// Per-company extraction state within one analysis run
///
/// Created once at run start with `status = Pending`; mutated in place by
/// the extraction orchestrator. Never removed from its checkpoint; a
/// company that exhausts retries remains with `status = Failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// SEC Central Index Key, zero-padded to 10 digits
    pub cik: String,
    /// Company display name
    pub company_name: String,
    /// Ticker symbol when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// Fortune ranking when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Sector label when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    /// Industry label when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    /// Current lifecycle status
    #[serde(default)]
    pub status: ExtractionStatus,
    /// When the most recent extraction attempt started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_start_time: Option<DateTime<Utc>>,
    /// When extraction finished (success or terminal failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_end_time: Option<DateTime<Utc>>,
    /// Last error observed; cleared on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of failed attempts so far; only ever increases
    #[serde(default)]
    pub retry_count: u32,
    /// Tax figures keyed by fiscal year
    #[serde(default)]
    pub tax_data: BTreeMap<i32, TaxExpense>,
    /// Executive compensation lines keyed by fiscal year
    #[serde(default)]
    pub compensation_data: BTreeMap<i32, Vec<CompensationRecord>>,
    /// Sum of executive total compensation per fiscal year
    #[serde(default)]
    pub total_compensation_by_year: BTreeMap<i32, Decimal>,
    /// Compensation-to-tax ratio per fiscal year; `None` when tax expense
    /// for that year is zero or absent
    #[serde(default)]
    pub compensation_vs_tax_ratio: BTreeMap<i32, Option<Decimal>>,
}

impl ExtractionRecord {
    /// Create a pending record with empty data maps
    pub fn new(cik: String, company_name: String) -> Self {
        Self {
            cik,
            company_name,
            ticker: None,
            rank: None,
            sector: None,
            industry: None,
            status: ExtractionStatus::Pending,
            extraction_start_time: None,
            extraction_end_time: None,
            error_message: None,
            retry_count: 0,
            tax_data: BTreeMap::new(),
            compensation_data: BTreeMap::new(),
            total_compensation_by_year: BTreeMap::new(),
            compensation_vs_tax_ratio: BTreeMap::new(),
        }
    }
}
