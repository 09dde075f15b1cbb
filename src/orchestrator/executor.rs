//! Extraction run executor
//!
//! Owns the per-company state machine and the batch driver that walks a
//! checkpoint's pending companies, persisting progress as it goes.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, info_span, warn};

use crate::checkpoint::{
    Checkpoint, CheckpointStore, CompensationRecord, ExtractionRecord, ExtractionStatus,
    TaxExpense,
};
use crate::directory::CompanyInfo;
use crate::extraction::{CompanyDataExtractor, ExtractError};
use crate::metrics::ExtractionMetrics;
use crate::orchestrator::config::{
    DEFAULT_SAVE_FREQUENCY, MAX_COMPANY_RETRIES, YEAR_FETCH_DELAY_MS,
};
use crate::orchestrator::OrchestratorResult;
use crate::shutdown::SharedShutdown;

/// Progress callback invoked after each processed company with
/// `(completed + failed, total)`
pub type ProgressCallback = dyn Fn(u32, u32) + Send + Sync;

/// Build the trailing window of fiscal years ending at `target_year`
///
/// A window of 5 for target 2023 yields `[2019, 2020, 2021, 2022, 2023]`.
/// Windows below 1 collapse to the target year alone.
pub fn analysis_year_window(target_year: i32, window_years: i32) -> Vec<i32> {
    if window_years < 1 {
        return vec![target_year];
    }
    (target_year - window_years + 1..=target_year).collect()
}

/// Per-attempt fetch results before they are folded into the record
struct YearlyExtraction {
    tax_data: BTreeMap<i32, TaxExpense>,
    compensation_data: BTreeMap<i32, Vec<CompensationRecord>>,
}

/// Drives extraction of all pending companies in a checkpoint
pub struct ExtractionOrchestrator {
    store: CheckpointStore,
    extractor: Box<dyn CompanyDataExtractor>,
    max_retries: u32,
    save_frequency: u32,
    year_fetch_delay: Duration,
    shutdown: Option<SharedShutdown>,
}

impl ExtractionOrchestrator {
    /// Create a new orchestrator with default tuning
    pub fn new(store: CheckpointStore, extractor: Box<dyn CompanyDataExtractor>) -> Self {
        Self {
            store,
            extractor,
            max_retries: MAX_COMPANY_RETRIES,
            save_frequency: DEFAULT_SAVE_FREQUENCY,
            year_fetch_delay: Duration::from_millis(YEAR_FETCH_DELAY_MS),
            shutdown: None,
        }
    }

    /// Set the per-company attempt ceiling
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set how many companies are processed between checkpoint saves.
    /// A frequency of 0 is treated as 1.
    pub fn with_save_frequency(mut self, save_frequency: u32) -> Self {
        self.save_frequency = save_frequency.max(1);
        self
    }

    /// Set the delay between year-level fetches within one company
    pub fn with_year_fetch_delay(mut self, delay: Duration) -> Self {
        self.year_fetch_delay = delay;
        self
    }

    /// Attach a shutdown coordinator checked between companies
    pub fn with_shutdown(mut self, shutdown: SharedShutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Create a fresh checkpoint for a new run over `companies`
    ///
    /// Records are seeded `Pending` in roster order; `config` is stored
    /// verbatim for audit.
    pub fn create_checkpoint(
        &self,
        target_year: i32,
        analysis_years: Vec<i32>,
        companies: &[CompanyInfo],
        config: BTreeMap<String, serde_json::Value>,
    ) -> Checkpoint {
        let records: Vec<ExtractionRecord> = companies.iter().map(record_from_company).collect();
        let checkpoint = Checkpoint::new(target_year, analysis_years, records, config);

        info!(
            analysis_id = %checkpoint.analysis_id(),
            target_year,
            companies = checkpoint.total_companies(),
            years = ?checkpoint.analysis_years(),
            "Created new analysis checkpoint"
        );
        checkpoint
    }

    /// Process every company that is pending when the pass starts
    ///
    /// Companies requeued by a failed attempt during the pass are not
    /// revisited within it; they stay `Pending` for a later pass or a
    /// resumed run. The checkpoint is saved after every
    /// `save_frequency`-th company and once more after the loop. A
    /// shutdown request stops the pass between companies; the final save
    /// still runs, so the interrupted run stays resumable.
    ///
    /// # Errors
    /// Only checkpoint store failures propagate; per-company failures are
    /// absorbed into the records.
    pub async fn process_all_companies(
        &self,
        checkpoint: &mut Checkpoint,
        progress: Option<&ProgressCallback>,
    ) -> OrchestratorResult<()> {
        let span = info_span!("extraction_pass", analysis_id = %checkpoint.analysis_id());
        let _enter = span.enter();

        let pending: Vec<String> = checkpoint
            .get_pending_companies()
            .iter()
            .map(|r| r.cik.clone())
            .collect();

        info!(
            pending = pending.len(),
            completed = checkpoint.completed_companies(),
            failed = checkpoint.failed_companies(),
            total = checkpoint.total_companies(),
            "Starting extraction pass"
        );

        let mut processed_in_pass: u32 = 0;
        for cik in &pending {
            if self
                .shutdown
                .as_ref()
                .is_some_and(|s| s.is_shutdown_requested())
            {
                warn!(
                    remaining = pending.len() as u32 - processed_in_pass,
                    "Shutdown requested, stopping after saving checkpoint"
                );
                break;
            }

            self.process_company(checkpoint, cik).await;
            processed_in_pass += 1;

            if processed_in_pass % self.save_frequency == 0 {
                self.store.save(checkpoint)?;
                crate::metrics::record_checkpoint_save(checkpoint.progress_percentage());
            }

            if let Some(callback) = progress {
                callback(
                    checkpoint.completed_companies() + checkpoint.failed_companies(),
                    checkpoint.total_companies(),
                );
            }
        }

        self.store.save(checkpoint)?;
        crate::metrics::record_checkpoint_save(checkpoint.progress_percentage());

        info!(
            completed = checkpoint.completed_companies(),
            failed = checkpoint.failed_companies(),
            progress_pct = checkpoint.progress_percentage(),
            success_rate_pct = checkpoint.success_rate(),
            "Extraction pass finished"
        );
        Ok(())
    }

    /// Run the per-company state machine for one CIK
    ///
    /// Only `Pending` records are processed; re-invoking on an already
    /// completed or terminally failed record is an idempotent no-op.
    pub async fn process_company(&self, checkpoint: &mut Checkpoint, cik: &str) {
        let years: Vec<i32> = checkpoint.analysis_years().to_vec();

        let company_name = {
            let Some(record) = checkpoint.get_company_by_cik_mut(cik) else {
                warn!(cik = %cik, "Company not present in checkpoint, skipping");
                return;
            };
            if record.status != ExtractionStatus::Pending {
                debug!(cik = %cik, status = %record.status, "Company not pending, skipping");
                return;
            }
            record.status = ExtractionStatus::InProgress;
            record.extraction_start_time = Some(Utc::now());
            record.company_name.clone()
        };

        let extraction_metrics = ExtractionMetrics::start(cik, &company_name);

        match self.run_extraction_attempt(cik, &years).await {
            Ok(yearly) => {
                let data_points = (yearly.tax_data.len() + yearly.compensation_data.len()) as u64;
                let Some(record) = checkpoint.get_company_by_cik_mut(cik) else {
                    return;
                };
                record.tax_data.extend(yearly.tax_data);
                record.compensation_data.extend(yearly.compensation_data);
                compute_derived_metrics(record);
                record.status = ExtractionStatus::Completed;
                record.error_message = None;
                record.extraction_end_time = Some(Utc::now());
                checkpoint.record_company_completed();

                extraction_metrics.record_success(data_points);
            }
            Err(e) => {
                let Some(record) = checkpoint.get_company_by_cik_mut(cik) else {
                    return;
                };
                record.retry_count += 1;
                let retries = record.retry_count;

                if retries >= self.max_retries {
                    record.status = ExtractionStatus::Failed;
                    record.error_message = Some(e.to_string());
                    record.extraction_end_time = Some(Utc::now());
                    checkpoint.record_company_failed();

                    extraction_metrics.record_failure(&e.to_string());
                    error!(
                        cik = %cik,
                        company = %company_name,
                        error = %e,
                        retries,
                        "Company extraction failed terminally"
                    );
                } else {
                    record.status = ExtractionStatus::Pending;
                    record.error_message = Some(format!(
                        "attempt {} of {} failed: {}",
                        retries, self.max_retries, e
                    ));

                    warn!(
                        cik = %cik,
                        company = %company_name,
                        error = %e,
                        retries,
                        max_retries = self.max_retries,
                        "Extraction attempt failed, company requeued"
                    );
                }
            }
        }
    }

    /// Fetch tax and compensation data for every year in the window
    ///
    /// Single-year failures are logged and leave that year absent; only
    /// company-aborting errors (sustained throttling, malformed CIK) fail
    /// the attempt as a whole.
    async fn run_extraction_attempt(
        &self,
        cik: &str,
        years: &[i32],
    ) -> Result<YearlyExtraction, ExtractError> {
        let mut tax_data = BTreeMap::new();
        let mut compensation_data = BTreeMap::new();

        for (i, &year) in years.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.year_fetch_delay).await;
            }

            match self.extractor.extract_tax_expense(cik, year).await {
                Ok(Some(tax)) => {
                    tax_data.insert(year, tax);
                }
                Ok(None) => {
                    debug!(cik = %cik, year, "No tax expense reported for year");
                }
                Err(e) if e.aborts_company() => return Err(e),
                Err(e) => {
                    warn!(cik = %cik, year, error = %e, "Tax extraction failed for year, continuing");
                }
            }

            match self.extractor.extract_executive_compensation(cik, year).await {
                Ok(records) if records.is_empty() => {
                    debug!(cik = %cik, year, "No compensation disclosures for year");
                }
                Ok(records) => {
                    compensation_data.insert(year, records);
                }
                Err(e) if e.aborts_company() => return Err(e),
                Err(e) => {
                    warn!(
                        cik = %cik,
                        year,
                        error = %e,
                        "Compensation extraction failed for year, continuing"
                    );
                }
            }
        }

        Ok(YearlyExtraction {
            tax_data,
            compensation_data,
        })
    }
}

fn record_from_company(info: &CompanyInfo) -> ExtractionRecord {
    let mut record = ExtractionRecord::new(info.cik.clone(), info.name.clone());
    record.ticker = info.ticker.clone();
    record.rank = info.rank;
    record.sector = info.sector.clone();
    record.industry = info.industry.clone();
    record
}

/// Recompute the record's derived maps from its raw data
///
/// Ratios carry `None` for years whose tax expense is absent or not
/// positive; years without compensation data get no ratio entry at all.
fn compute_derived_metrics(record: &mut ExtractionRecord) {
    record.total_compensation_by_year.clear();
    record.compensation_vs_tax_ratio.clear();

    for (&year, records) in &record.compensation_data {
        let total: Decimal = records.iter().map(|r| r.total_compensation).sum();
        record.total_compensation_by_year.insert(year, total);
    }

    for (&year, total) in &record.total_compensation_by_year {
        let ratio = record
            .tax_data
            .get(&year)
            .and_then(|t| t.total_tax_expense)
            .filter(|tax| *tax > Decimal::ZERO)
            .and_then(|tax| total.checked_div(tax));
        record.compensation_vs_tax_ratio.insert(year, ratio);
    }
}
