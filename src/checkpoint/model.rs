//! Checkpoint aggregate for one analysis run

use super::record::{ExtractionRecord, ExtractionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Current checkpoint file schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// An error not attributable to a single company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalError {
    /// When the error occurred
    pub occurred_at: DateTime<Utc>,
    /// Error description
    pub message: String,
    /// Where in the run the error happened, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Full persisted state of one analysis run
///
/// Identified by the `(analysis_id, target_year)` pair. Created fresh by
/// the orchestrator or reconstituted from the checkpoint store; mutated in
/// place throughout a run. Progress counters only ever increase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    schema_version: String,
    analysis_id: String,
    target_year: i32,
    analysis_years: Vec<i32>,
    total_companies: u32,
    created_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
    #[serde(default)]
    completed_companies: u32,
    #[serde(default)]
    failed_companies: u32,
    #[serde(default)]
    config: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    companies: Vec<ExtractionRecord>,
    #[serde(default)]
    global_errors: Vec<GlobalError>,
}

impl Checkpoint {
    /// Create a fresh checkpoint for a new analysis run
    ///
    /// The analysis id is minted as `fortune500_{target_year}_{suffix}`
    /// with a random 8-hex-char suffix, so concurrent runs for the same
    /// year never collide on a store filename.
    pub fn new(
        target_year: i32,
        analysis_years: Vec<i32>,
        companies: Vec<ExtractionRecord>,
        config: BTreeMap<String, serde_json::Value>,
    ) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        let analysis_id = format!("fortune500_{}_{}", target_year, &suffix[..8]);
        let now = Utc::now();
        let total_companies = companies.len() as u32;

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            analysis_id,
            target_year,
            analysis_years,
            total_companies,
            created_at: now,
            last_updated: now,
            completed_companies: 0,
            failed_companies: 0,
            config,
            companies,
            global_errors: Vec::new(),
        }
    }

    /// Get the schema version recorded in this checkpoint
    pub fn schema_version(&self) -> &str {
        &self.schema_version
    }

    /// Get the analysis id
    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    /// Get the primary analysis year
    pub fn target_year(&self) -> i32 {
        self.target_year
    }

    /// Get all fiscal years being extracted
    pub fn analysis_years(&self) -> &[i32] {
        &self.analysis_years
    }

    /// Get the company count fixed at creation
    pub fn total_companies(&self) -> u32 {
        self.total_companies
    }

    /// Get the creation timestamp
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the last persisted-save timestamp
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// Get the number of companies that completed successfully
    pub fn completed_companies(&self) -> u32 {
        self.completed_companies
    }

    /// Get the number of companies that failed terminally
    pub fn failed_companies(&self) -> u32 {
        self.failed_companies
    }

    /// Get the run configuration echo
    pub fn config(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.config
    }

    /// Get all extraction records in insertion order
    pub fn companies(&self) -> &[ExtractionRecord] {
        &self.companies
    }

    /// Get errors not attributable to a single company
    pub fn global_errors(&self) -> &[GlobalError] {
        &self.global_errors
    }

    /// Percentage of companies processed (completed or failed), 0-100
    ///
    /// Multiplies before dividing so whole-percent boundaries (the resume
    /// engine compares against one) come out exact.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_companies == 0 {
            return 0.0;
        }
        let processed = self.completed_companies + self.failed_companies;
        processed as f64 * 100.0 / self.total_companies as f64
    }

    /// Percentage of processed companies that completed successfully, 0-100
    pub fn success_rate(&self) -> f64 {
        let processed = self.completed_companies + self.failed_companies;
        if processed == 0 {
            return 0.0;
        }
        self.completed_companies as f64 * 100.0 / processed as f64
    }

    /// Whether every company has been processed
    pub fn is_complete(&self) -> bool {
        self.completed_companies + self.failed_companies >= self.total_companies
    }

    /// Find a company by CIK (first match in insertion order)
    pub fn get_company_by_cik(&self, cik: &str) -> Option<&ExtractionRecord> {
        self.companies.iter().find(|c| c.cik == cik)
    }

    /// Find a company by CIK for mutation
    pub fn get_company_by_cik_mut(&mut self, cik: &str) -> Option<&mut ExtractionRecord> {
        self.companies.iter_mut().find(|c| c.cik == cik)
    }

    /// Companies still awaiting extraction, in insertion order
    pub fn get_pending_companies(&self) -> Vec<&ExtractionRecord> {
        self.companies
            .iter()
            .filter(|c| c.status == ExtractionStatus::Pending)
            .collect()
    }

    /// Companies that failed terminally, in insertion order
    pub fn get_failed_companies(&self) -> Vec<&ExtractionRecord> {
        self.companies
            .iter()
            .filter(|c| c.status == ExtractionStatus::Failed)
            .collect()
    }

    /// Companies that completed successfully, in insertion order
    pub fn get_completed_companies(&self) -> Vec<&ExtractionRecord> {
        self.companies
            .iter()
            .filter(|c| c.status == ExtractionStatus::Completed)
            .collect()
    }

    /// Count one company as successfully completed
    pub fn record_company_completed(&mut self) {
        self.completed_companies += 1;
    }

    /// Count one company as terminally failed
    pub fn record_company_failed(&mut self) {
        self.failed_companies += 1;
    }

    /// Append a run-level error
    pub fn push_global_error(&mut self, message: String, context: Option<String>) {
        self.global_errors.push(GlobalError {
            occurred_at: Utc::now(),
            message,
            context,
        });
    }

    /// Refresh `last_updated`; called by the store on every save
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
