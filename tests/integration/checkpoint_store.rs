//! Integration tests for checkpoint persistence
//!
//! Exercises the store through the public API the orchestrator and CLI
//! use: save with real extracted data, reload, list, delete, and the
//! degraded read paths for corrupt or tampered files.

use std::collections::BTreeMap;
use std::sync::{Arc, Barrier};

use chrono::Utc;
use rust_decimal::Decimal;
use tempfile::TempDir;

use edgar_comp_analyzer::checkpoint::{
    Checkpoint, CheckpointStore, CompensationRecord, ExtractionRecord, ExtractionStatus,
    TaxExpense, MAX_CHECKPOINT_FILE_SIZE,
};

/// Checkpoint with one fully extracted company, the shape a real run
/// produces before its first save
fn populated_checkpoint() -> Checkpoint {
    let mut apple = ExtractionRecord::new("0000320193".to_string(), "Apple Inc.".to_string());
    apple.ticker = Some("AAPL".to_string());
    apple.rank = Some(4);
    apple.status = ExtractionStatus::Completed;
    apple.extraction_start_time = Some(Utc::now());
    apple.extraction_end_time = Some(Utc::now());
    apple.tax_data.insert(
        2023,
        TaxExpense {
            fiscal_year: 2023,
            total_tax_expense: Some(Decimal::from(16_741_000_000_i64)),
            source_form: Some("10-K".to_string()),
            period_end: Some("2023-09-30".to_string()),
        },
    );
    apple.compensation_data.insert(
        2023,
        vec![CompensationRecord {
            executive_name: "PEO".to_string(),
            position: Some("Chief Executive Officer".to_string()),
            fiscal_year: 2023,
            total_compensation: Decimal::from(63_209_845_i64),
            salary: Some(Decimal::from(3_000_000)),
            bonus: None,
        }],
    );
    apple
        .total_compensation_by_year
        .insert(2023, Decimal::from(63_209_845_i64));
    apple
        .compensation_vs_tax_ratio
        .insert(2023, Some(Decimal::new(38, 4)));
    // A year where the filing reported a tax benefit, so no ratio
    apple.compensation_vs_tax_ratio.insert(2022, None);

    let walmart = ExtractionRecord::new("0000104169".to_string(), "Walmart Inc.".to_string());

    let mut config = BTreeMap::new();
    config.insert("requested_companies".to_string(), serde_json::json!(2));

    let mut checkpoint = Checkpoint::new(2023, vec![2022, 2023], vec![apple, walmart], config);
    checkpoint.record_company_completed();
    checkpoint
}

/// Round-trip of a checkpoint carrying real extracted data: statuses,
/// decimal amounts, and the None ratio marker all survive the disk format
#[test]
fn test_populated_checkpoint_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let mut checkpoint = populated_checkpoint();
    let id = checkpoint.analysis_id().to_string();
    store.save(&mut checkpoint).unwrap();

    let loaded = store.load(&id, 2023).unwrap();
    assert_eq!(loaded.total_companies(), 2);
    assert_eq!(loaded.completed_companies(), 1);
    assert_eq!(loaded.progress_percentage(), 50.0);

    let apple = loaded.get_company_by_cik("0000320193").unwrap();
    assert_eq!(apple.status, ExtractionStatus::Completed);
    assert_eq!(apple.ticker.as_deref(), Some("AAPL"));
    assert_eq!(
        apple.tax_data.get(&2023).unwrap().total_tax_expense,
        Some(Decimal::from(16_741_000_000_i64))
    );
    assert_eq!(
        apple.compensation_data.get(&2023).unwrap()[0].total_compensation,
        Decimal::from(63_209_845_i64)
    );
    assert_eq!(
        apple.total_compensation_by_year.get(&2023),
        Some(&Decimal::from(63_209_845_i64))
    );
    assert_eq!(apple.compensation_vs_tax_ratio.get(&2022), Some(&None));

    let walmart = loaded.get_company_by_cik("0000104169").unwrap();
    assert_eq!(walmart.status, ExtractionStatus::Pending);
    assert!(walmart.tax_data.is_empty());

    assert_eq!(
        loaded.config().get("requested_companies"),
        Some(&serde_json::json!(2))
    );
}

/// The on-disk file is pretty JSON with string year keys, the format the
/// operator inspects by hand when debugging a run
#[test]
fn test_checkpoint_file_is_pretty_json() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let mut checkpoint = populated_checkpoint();
    let path = store.save(&mut checkpoint).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.starts_with("{\n"));
    assert!(contents.contains("\n  \"schema_version\""));

    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(value["schema_version"], "1.0.0");
    assert_eq!(value["target_year"], 2023);
    // Year-keyed maps use string keys at rest
    assert!(value["companies"][0]["tax_data"].get("2023").is_some());
    assert!(value["companies"][0]["compensation_vs_tax_ratio"]["2022"].is_null());
}

/// A crashed writer must never leave a half-written checkpoint behind:
/// after saves the directory holds only the final file and its lock sibling
#[test]
fn test_no_stray_temp_files_after_saves() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let mut checkpoint = populated_checkpoint();
    for _ in 0..5 {
        checkpoint.touch();
        store.save(&mut checkpoint).unwrap();
    }

    let mut names: Vec<String> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .flatten()
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    assert_eq!(names.len(), 2, "unexpected files in store dir: {names:?}");
    assert!(names[0].starts_with("analysis_") && names[0].ends_with(".json"));
    assert!(names[1].starts_with("analysis_") && names[1].ends_with(".lock"));
}

/// Truncating a checkpoint mid-file (a simulated partial write from a
/// pre-atomic-rename crash) degrades to a clean miss, not an error
#[test]
fn test_truncated_file_loads_as_none() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let mut checkpoint = populated_checkpoint();
    let id = checkpoint.analysis_id().to_string();
    let path = store.save(&mut checkpoint).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, &contents[..contents.len() / 2]).unwrap();

    assert!(store.load(&id, 2023).is_none());
    // The corrupted file is skipped by list as well
    assert!(store.list().is_empty());
}

/// An operator editing the schema_version by hand invalidates the file
#[test]
fn test_schema_tampered_file_loads_as_none() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let mut checkpoint = populated_checkpoint();
    let id = checkpoint.analysis_id().to_string();
    let path = store.save(&mut checkpoint).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    value["schema_version"] = serde_json::json!("0.9.0");
    std::fs::write(&path, serde_json::to_string_pretty(&value).unwrap()).unwrap();

    assert!(store.load(&id, 2023).is_none());
}

/// Oversized files are rejected before parsing to cap memory use
#[test]
fn test_oversized_file_loads_as_none() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let path = store.checkpoint_path("fortune500_2023_aaaabbbb", 2023);
    std::fs::create_dir_all(temp_dir.path()).unwrap();
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(MAX_CHECKPOINT_FILE_SIZE + 1).unwrap();

    assert!(store.load("fortune500_2023_aaaabbbb", 2023).is_none());
    assert!(store.list().is_empty());
}

/// list surfaces every run, most recently saved first, without touching
/// per-company data
#[test]
fn test_list_orders_runs_by_recency() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let mut first = Checkpoint::new(
        2022,
        vec![2022],
        vec![ExtractionRecord::new("1".to_string(), "A".to_string())],
        BTreeMap::new(),
    );
    store.save(&mut first).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(15));

    let mut second = populated_checkpoint();
    store.save(&mut second).unwrap();

    std::thread::sleep(std::time::Duration::from_millis(15));

    // Re-saving the first run moves it back to the front
    store.save(&mut first).unwrap();

    let summaries = store.list();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].analysis_id, first.analysis_id());
    assert_eq!(summaries[1].analysis_id, second.analysis_id());
    assert_eq!(summaries[1].completed_companies, 1);
    assert_eq!(summaries[1].progress_percentage(), 50.0);
}

/// delete removes the checkpoint and its lock sibling and reports honestly
#[test]
fn test_delete_cleans_lock_sibling() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());

    let mut checkpoint = populated_checkpoint();
    let id = checkpoint.analysis_id().to_string();
    let path = store.save(&mut checkpoint).unwrap();
    let lock_path = path.with_extension("lock");
    assert!(lock_path.exists());

    assert!(store.delete(&id, 2023));
    assert!(!path.exists());
    assert!(!lock_path.exists());
    assert!(!store.delete(&id, 2023));
}

/// Two runs saving into the same directory from separate threads never
/// corrupt each other; each file reloads intact
#[test]
fn test_concurrent_saves_to_shared_directory() {
    let temp_dir = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp_dir.path());
    let barrier = Arc::new(Barrier::new(4));

    let mut handles = Vec::new();
    for year in [2020, 2021, 2022, 2023] {
        let store = store.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(std::thread::spawn(move || {
            let records = (0..20)
                .map(|i| ExtractionRecord::new(format!("{i:07}"), format!("Company {i}")))
                .collect();
            let mut checkpoint = Checkpoint::new(year, vec![year], records, BTreeMap::new());
            let id = checkpoint.analysis_id().to_string();

            barrier.wait();
            for _ in 0..10 {
                store.save(&mut checkpoint).unwrap();
            }
            (id, year)
        }));
    }

    let saved: Vec<(String, i32)> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(store.list().len(), 4);
    for (id, year) in saved {
        let loaded = store.load(&id, year).unwrap();
        assert_eq!(loaded.total_companies(), 20);
        assert_eq!(loaded.target_year(), year);
    }
}

/// The store creates its directory on first save, including parents
#[test]
fn test_save_creates_nested_store_directory() {
    let temp_dir = TempDir::new().unwrap();
    let nested = temp_dir.path().join("var").join("checkpoints");
    let store = CheckpointStore::new(&nested);
    assert!(!nested.exists());

    let mut checkpoint = populated_checkpoint();
    store.save(&mut checkpoint).unwrap();

    assert!(nested.is_dir());
    assert_eq!(store.list().len(), 1);
}
