//! Integration tests for the extraction orchestrator
//!
//! A scripted in-memory extractor stands in for EDGAR so the per-company
//! state machine, retry accounting, save cadence, and shutdown behavior
//! can be driven deterministically against a real checkpoint store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tempfile::TempDir;

use edgar_comp_analyzer::checkpoint::{
    CheckpointStore, CompensationRecord, ExtractionStatus, TaxExpense,
};
use edgar_comp_analyzer::directory::CompanyInfo;
use edgar_comp_analyzer::extraction::{CompanyDataExtractor, ExtractError, ExtractResult};
use edgar_comp_analyzer::orchestrator::{
    analysis_year_window, ExtractionOrchestrator, OrchestratorError, ProgressCallback,
};
use edgar_comp_analyzer::shutdown::ShutdownCoordinator;

/// Scripted stand-in for the EDGAR extractor
///
/// Unknown CIKs succeed with deterministic figures. A CIK can be scripted
/// to reject its first N attempts with sustained throttling, and whole
/// years can be scripted as broken or silent.
#[derive(Default)]
struct ScriptedExtractor {
    /// CIK -> remaining attempts to reject with a throttle error
    throttle_attempts: Mutex<HashMap<String, u32>>,
    /// Years whose tax fetch fails with a retryable parse error
    broken_tax_years: Vec<i32>,
    /// Years with no reported data at all
    silent_years: Vec<i32>,
    tax_calls: Arc<AtomicU32>,
    comp_calls: Arc<AtomicU32>,
}

impl ScriptedExtractor {
    fn new() -> Self {
        Self::default()
    }

    fn with_throttled(self, cik: &str, attempts: u32) -> Self {
        self.throttle_attempts
            .lock()
            .unwrap()
            .insert(cik.to_string(), attempts);
        self
    }

    fn with_broken_tax_year(mut self, year: i32) -> Self {
        self.broken_tax_years.push(year);
        self
    }

    fn with_silent_year(mut self, year: i32) -> Self {
        self.silent_years.push(year);
        self
    }

    /// Shared call counters that survive moving the extractor into the
    /// orchestrator
    fn counters(&self) -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        (Arc::clone(&self.tax_calls), Arc::clone(&self.comp_calls))
    }
}

#[async_trait]
impl CompanyDataExtractor for ScriptedExtractor {
    async fn extract_tax_expense(
        &self,
        cik: &str,
        fiscal_year: i32,
    ) -> ExtractResult<Option<TaxExpense>> {
        self.tax_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(remaining) = self.throttle_attempts.lock().unwrap().get_mut(cik) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ExtractError::Throttled(format!(
                    "429 for CIK {cik} after retries"
                )));
            }
        }
        if self.broken_tax_years.contains(&fiscal_year) {
            return Err(ExtractError::ParseError(format!(
                "unexpected unit for FY{fiscal_year}"
            )));
        }
        if self.silent_years.contains(&fiscal_year) {
            return Ok(None);
        }
        Ok(Some(TaxExpense {
            fiscal_year,
            total_tax_expense: Some(Decimal::from(5_000_000_i64 + i64::from(fiscal_year))),
            source_form: Some("10-K".to_string()),
            period_end: None,
        }))
    }

    async fn extract_executive_compensation(
        &self,
        _cik: &str,
        fiscal_year: i32,
    ) -> ExtractResult<Vec<CompensationRecord>> {
        self.comp_calls.fetch_add(1, Ordering::SeqCst);

        if self.silent_years.contains(&fiscal_year) {
            return Ok(Vec::new());
        }
        Ok(vec![
            CompensationRecord {
                executive_name: "PEO".to_string(),
                position: Some("Chief Executive Officer".to_string()),
                fiscal_year,
                total_compensation: Decimal::from(10_000_000),
                salary: Some(Decimal::from(1_500_000)),
                bonus: None,
            },
            CompensationRecord {
                executive_name: "Named Executive 2".to_string(),
                position: None,
                fiscal_year,
                total_compensation: Decimal::from(4_000_000),
                salary: None,
                bonus: None,
            },
        ])
    }

    fn base_url(&self) -> &str {
        "scripted://edgar"
    }
}

fn roster(n: usize) -> Vec<CompanyInfo> {
    let seed: [(&str, &str, &str, u32); 5] = [
        ("104169", "Walmart Inc.", "WMT", 1),
        ("1018724", "Amazon.com, Inc.", "AMZN", 2),
        ("320193", "Apple Inc.", "AAPL", 4),
        ("731766", "UnitedHealth Group Incorporated", "UNH", 5),
        ("1067983", "Berkshire Hathaway Inc.", "BRK.A", 6),
    ];
    seed.iter()
        .take(n)
        .map(|(cik, name, ticker, rank)| CompanyInfo {
            cik: (*cik).to_string(),
            name: (*name).to_string(),
            ticker: Some((*ticker).to_string()),
            rank: Some(*rank),
            sector: None,
            industry: None,
        })
        .collect()
}

fn orchestrator_with(
    store: &CheckpointStore,
    extractor: ScriptedExtractor,
) -> ExtractionOrchestrator {
    ExtractionOrchestrator::new(store.clone(), Box::new(extractor))
        .with_year_fetch_delay(Duration::ZERO)
}

/// Happy path: every company completes, data lands in the records, the
/// derived metrics are computed, and the progress callback counts up
#[tokio::test]
async fn test_all_companies_complete_with_derived_metrics() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let orchestrator = orchestrator_with(&store, ScriptedExtractor::new());

    let mut checkpoint = orchestrator.create_checkpoint(
        2023,
        analysis_year_window(2023, 2),
        &roster(3),
        BTreeMap::new(),
    );
    assert_eq!(checkpoint.analysis_years(), &[2022, 2023]);
    assert_eq!(checkpoint.get_pending_companies().len(), 3);

    let seen: Arc<Mutex<Vec<(u32, u32)>>> = Arc::new(Mutex::new(Vec::new()));
    let seen_cb = Arc::clone(&seen);
    let callback = move |processed: u32, total: u32| {
        seen_cb.lock().unwrap().push((processed, total));
    };
    let callback_ref: &ProgressCallback = &callback;

    orchestrator
        .process_all_companies(&mut checkpoint, Some(callback_ref))
        .await
        .unwrap();

    assert!(checkpoint.is_complete());
    assert_eq!(checkpoint.completed_companies(), 3);
    assert_eq!(checkpoint.failed_companies(), 0);
    assert_eq!(checkpoint.success_rate(), 100.0);
    assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);

    let walmart = checkpoint.get_company_by_cik("104169").unwrap();
    assert_eq!(walmart.status, ExtractionStatus::Completed);
    assert!(walmart.extraction_start_time.is_some());
    assert!(walmart.extraction_end_time.is_some());
    assert!(walmart.error_message.is_none());

    let expected_tax = Decimal::from(5_000_000_i64 + 2023);
    assert_eq!(
        walmart.tax_data.get(&2023).unwrap().total_tax_expense,
        Some(expected_tax)
    );
    assert_eq!(walmart.compensation_data.get(&2023).unwrap().len(), 2);

    let expected_total = Decimal::from(14_000_000);
    assert_eq!(
        walmart.total_compensation_by_year.get(&2023),
        Some(&expected_total)
    );
    let expected_ratio = expected_total.checked_div(expected_tax).unwrap();
    assert_eq!(
        walmart.compensation_vs_tax_ratio.get(&2023),
        Some(&Some(expected_ratio))
    );

    // The final save leaves the finished run on disk
    let persisted = store.load(checkpoint.analysis_id(), 2023).unwrap();
    assert!(persisted.is_complete());
    assert_eq!(persisted.completed_companies(), 3);
}

/// Years with nothing reported leave no entries; the company still
/// completes
#[tokio::test]
async fn test_silent_year_leaves_maps_sparse() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let orchestrator =
        orchestrator_with(&store, ScriptedExtractor::new().with_silent_year(2022));

    let mut checkpoint =
        orchestrator.create_checkpoint(2023, vec![2022, 2023], &roster(1), BTreeMap::new());
    orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();

    let record = checkpoint.get_company_by_cik("104169").unwrap();
    assert_eq!(record.status, ExtractionStatus::Completed);
    assert!(!record.tax_data.contains_key(&2022));
    assert!(!record.compensation_data.contains_key(&2022));
    assert!(!record.total_compensation_by_year.contains_key(&2022));
    assert!(record.tax_data.contains_key(&2023));
    assert!(record.compensation_data.contains_key(&2023));
}

/// A broken year is contained: the other years land, the company
/// completes, and the ratio for the broken year is the null marker
/// because compensation exists but tax does not
#[tokio::test]
async fn test_single_year_failure_is_contained() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let orchestrator =
        orchestrator_with(&store, ScriptedExtractor::new().with_broken_tax_year(2022));

    let mut checkpoint =
        orchestrator.create_checkpoint(2023, vec![2022, 2023], &roster(1), BTreeMap::new());
    orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();

    let record = checkpoint.get_company_by_cik("104169").unwrap();
    assert_eq!(record.status, ExtractionStatus::Completed);
    assert_eq!(record.retry_count, 0);
    assert!(!record.tax_data.contains_key(&2022));
    // Compensation for the broken year still came through
    assert!(record.compensation_data.contains_key(&2022));
    assert_eq!(record.compensation_vs_tax_ratio.get(&2022), Some(&None));
    assert!(record.tax_data.contains_key(&2023));
    assert!(record
        .compensation_vs_tax_ratio
        .get(&2023)
        .unwrap()
        .is_some());
}

/// Sustained throttling aborts the company attempt: the record is
/// requeued with a retry message, later passes retry it, and the attempt
/// ceiling turns it into a terminal failure while the healthy company is
/// never re-fetched
#[tokio::test]
async fn test_throttled_company_requeued_then_failed() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let extractor = ScriptedExtractor::new().with_throttled("104169", 1000);
    let (tax_calls, comp_calls) = extractor.counters();
    let orchestrator = orchestrator_with(&store, extractor).with_max_retries(3);

    let mut checkpoint =
        orchestrator.create_checkpoint(2023, vec![2022, 2023], &roster(2), BTreeMap::new());

    // Pass 1: throttled company burns one attempt, the other completes
    orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();

    let record = checkpoint.get_company_by_cik("104169").unwrap();
    assert_eq!(record.status, ExtractionStatus::Pending);
    assert_eq!(record.retry_count, 1);
    let message = record.error_message.as_deref().unwrap();
    assert!(message.starts_with("attempt 1 of 3 failed:"), "{message}");
    assert!(message.contains("throttled"), "{message}");

    assert_eq!(checkpoint.completed_companies(), 1);
    assert_eq!(checkpoint.failed_companies(), 0);
    // One aborted tax call for the throttled company; two full years for
    // the healthy one
    assert_eq!(tax_calls.load(Ordering::SeqCst), 3);
    assert_eq!(comp_calls.load(Ordering::SeqCst), 2);

    // Pass 2: only the requeued company is attempted
    orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();
    let record = checkpoint.get_company_by_cik("104169").unwrap();
    assert_eq!(record.status, ExtractionStatus::Pending);
    assert_eq!(record.retry_count, 2);
    assert_eq!(tax_calls.load(Ordering::SeqCst), 4);
    assert_eq!(comp_calls.load(Ordering::SeqCst), 2);

    // Pass 3: the attempt ceiling is reached
    orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();
    let record = checkpoint.get_company_by_cik("104169").unwrap();
    assert_eq!(record.status, ExtractionStatus::Failed);
    assert_eq!(record.retry_count, 3);
    assert!(record
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("throttled by EDGAR"));
    assert!(record.extraction_end_time.is_some());

    assert!(checkpoint.is_complete());
    assert_eq!(checkpoint.completed_companies(), 1);
    assert_eq!(checkpoint.failed_companies(), 1);
    assert_eq!(checkpoint.success_rate(), 50.0);
}

/// A company that was throttled once recovers on the next pass; the
/// retry count survives as history and the error message is cleared
#[tokio::test]
async fn test_requeued_company_recovers_on_next_pass() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let orchestrator = orchestrator_with(
        &store,
        ScriptedExtractor::new().with_throttled("104169", 1),
    );

    let mut checkpoint =
        orchestrator.create_checkpoint(2023, vec![2023], &roster(1), BTreeMap::new());

    orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();
    assert_eq!(
        checkpoint.get_company_by_cik("104169").unwrap().status,
        ExtractionStatus::Pending
    );

    orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();
    let record = checkpoint.get_company_by_cik("104169").unwrap();
    assert_eq!(record.status, ExtractionStatus::Completed);
    assert_eq!(record.retry_count, 1);
    assert!(record.error_message.is_none());
    assert_eq!(checkpoint.completed_companies(), 1);
}

/// Re-running a finished checkpoint is an idempotent no-op: nothing is
/// re-fetched and the counters do not move
#[tokio::test]
async fn test_finished_run_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let extractor = ScriptedExtractor::new();
    let (tax_calls, comp_calls) = extractor.counters();
    let orchestrator = orchestrator_with(&store, extractor);

    let mut checkpoint =
        orchestrator.create_checkpoint(2023, vec![2023], &roster(2), BTreeMap::new());
    orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();
    assert!(checkpoint.is_complete());

    let tax_before = tax_calls.load(Ordering::SeqCst);
    let comp_before = comp_calls.load(Ordering::SeqCst);

    orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();
    orchestrator.process_company(&mut checkpoint, "104169").await;

    assert_eq!(tax_calls.load(Ordering::SeqCst), tax_before);
    assert_eq!(comp_calls.load(Ordering::SeqCst), comp_before);
    assert_eq!(checkpoint.completed_companies(), 2);
    assert_eq!(checkpoint.failed_companies(), 0);
}

/// A terminal failure stays terminal: invoking the per-company routine
/// on a failed record fetches nothing, the record keeps its failure, and
/// `completed + failed` stays within the roster size
#[tokio::test]
async fn test_failed_company_is_not_reprocessed() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let throttled = ScriptedExtractor::new().with_throttled("104169", 1000);
    let first_orchestrator = orchestrator_with(&store, throttled).with_max_retries(1);
    let mut checkpoint =
        first_orchestrator.create_checkpoint(2023, vec![2023], &roster(1), BTreeMap::new());
    first_orchestrator
        .process_all_companies(&mut checkpoint, None)
        .await
        .unwrap();

    let record = checkpoint.get_company_by_cik("104169").unwrap();
    assert_eq!(record.status, ExtractionStatus::Failed);
    assert_eq!(checkpoint.failed_companies(), 1);

    // A healthy extractor must not resurrect the failed record
    let healthy = ScriptedExtractor::new();
    let (tax_calls, comp_calls) = healthy.counters();
    let orchestrator = orchestrator_with(&store, healthy);
    orchestrator.process_company(&mut checkpoint, "104169").await;

    let record = checkpoint.get_company_by_cik("104169").unwrap();
    assert_eq!(record.status, ExtractionStatus::Failed);
    assert!(record.error_message.is_some());
    assert_eq!(tax_calls.load(Ordering::SeqCst), 0);
    assert_eq!(comp_calls.load(Ordering::SeqCst), 0);
    assert_eq!(checkpoint.completed_companies(), 0);
    assert_eq!(checkpoint.failed_companies(), 1);
    assert!(
        checkpoint.completed_companies() + checkpoint.failed_companies()
            <= checkpoint.total_companies()
    );
}

/// The checkpoint hits disk after every save_frequency-th company and
/// once more after the loop; the callback observes the persisted progress
/// trailing the in-memory progress between scheduled saves
#[tokio::test]
async fn test_save_cadence_persists_periodically() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let orchestrator =
        orchestrator_with(&store, ScriptedExtractor::new()).with_save_frequency(2);

    let mut checkpoint =
        orchestrator.create_checkpoint(2023, vec![2023], &roster(5), BTreeMap::new());
    let id = checkpoint.analysis_id().to_string();

    let observed: Arc<Mutex<Vec<(u32, u32)>>> = Arc::new(Mutex::new(Vec::new()));
    let observed_cb = Arc::clone(&observed);
    let store_cb = store.clone();
    let id_cb = id.clone();
    let callback = move |processed: u32, total: u32| {
        assert!(processed <= total);
        let persisted = store_cb
            .load(&id_cb, 2023)
            .map(|cp| cp.completed_companies() + cp.failed_companies())
            .unwrap_or(0);
        observed_cb.lock().unwrap().push((processed, persisted));
    };
    let callback_ref: &ProgressCallback = &callback;

    orchestrator
        .process_all_companies(&mut checkpoint, Some(callback_ref))
        .await
        .unwrap();

    // In-memory progress vs what had been saved when the callback ran
    assert_eq!(
        *observed.lock().unwrap(),
        vec![(1, 0), (2, 2), (3, 2), (4, 4), (5, 4)]
    );

    let persisted = store.load(&id, 2023).unwrap();
    assert_eq!(persisted.completed_companies(), 5);
    assert!(persisted.is_complete());
}

/// A shutdown request stops the pass between companies; the final save
/// still runs, and a later run picks up exactly the remaining companies
#[tokio::test]
async fn test_shutdown_interrupts_and_run_resumes() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let shutdown = ShutdownCoordinator::shared();
    let orchestrator = orchestrator_with(&store, ScriptedExtractor::new())
        .with_shutdown(shutdown.clone());

    let mut checkpoint =
        orchestrator.create_checkpoint(2023, vec![2023], &roster(5), BTreeMap::new());
    let id = checkpoint.analysis_id().to_string();

    let shutdown_cb = shutdown.clone();
    let callback = move |processed: u32, _total: u32| {
        if processed == 2 {
            shutdown_cb.request_shutdown();
        }
    };
    let callback_ref: &ProgressCallback = &callback;

    orchestrator
        .process_all_companies(&mut checkpoint, Some(callback_ref))
        .await
        .unwrap();

    assert_eq!(checkpoint.completed_companies(), 2);
    assert_eq!(checkpoint.get_pending_companies().len(), 3);
    assert!(!checkpoint.is_complete());

    // The interrupted state made it to disk
    let interrupted = store.load(&id, 2023).unwrap();
    assert_eq!(interrupted.completed_companies(), 2);

    // A fresh run over the loaded checkpoint finishes the remainder
    let extractor = ScriptedExtractor::new();
    let (tax_calls, _) = extractor.counters();
    let resumed_orchestrator = orchestrator_with(&store, extractor);

    let mut resumed = interrupted;
    resumed_orchestrator
        .process_all_companies(&mut resumed, None)
        .await
        .unwrap();

    assert!(resumed.is_complete());
    assert_eq!(resumed.completed_companies(), 5);
    // Only the three remaining companies were fetched
    assert_eq!(tax_calls.load(Ordering::SeqCst), 3);
}

/// Losing the ability to persist progress is fatal: the store error from
/// the checkpoint save propagates out of the batch driver
#[tokio::test]
async fn test_store_failure_stops_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let blocker = temp_dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let store = CheckpointStore::new(blocker.join("checkpoints"));

    let orchestrator = orchestrator_with(&store, ScriptedExtractor::new());
    let mut checkpoint =
        orchestrator.create_checkpoint(2023, vec![2023], &roster(1), BTreeMap::new());

    let result = orchestrator.process_all_companies(&mut checkpoint, None).await;
    assert!(matches!(result, Err(OrchestratorError::StoreError(_))));
}
