//! JSON report renderer
//!
//! Serializes the full per-company detail of a checkpoint plus a run
//! summary header into a single pretty-printed file.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::checkpoint::{Checkpoint, ExtractionRecord, GlobalError};
use crate::report::{ReportError, ReportResult};

/// Full analysis report: run summary plus every company record
#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    schema_version: &'a str,
    analysis_id: &'a str,
    target_year: i32,
    analysis_years: &'a [i32],
    generated_at: DateTime<Utc>,
    total_companies: u32,
    completed_companies: u32,
    failed_companies: u32,
    progress_percentage: f64,
    success_rate: f64,
    is_complete: bool,
    companies: &'a [ExtractionRecord],
    global_errors: &'a [GlobalError],
}

impl<'a> JsonReport<'a> {
    fn build(checkpoint: &'a Checkpoint) -> Self {
        Self {
            schema_version: checkpoint.schema_version(),
            analysis_id: checkpoint.analysis_id(),
            target_year: checkpoint.target_year(),
            analysis_years: checkpoint.analysis_years(),
            generated_at: Utc::now(),
            total_companies: checkpoint.total_companies(),
            completed_companies: checkpoint.completed_companies(),
            failed_companies: checkpoint.failed_companies(),
            progress_percentage: checkpoint.progress_percentage(),
            success_rate: checkpoint.success_rate(),
            is_complete: checkpoint.is_complete(),
            companies: checkpoint.companies(),
            global_errors: checkpoint.global_errors(),
        }
    }
}

/// Write the full JSON report for a checkpoint
///
/// Returns the path of the written file.
pub fn write_json_report<P: AsRef<Path>>(
    checkpoint: &Checkpoint,
    path: P,
) -> ReportResult<PathBuf> {
    let path = path.as_ref().to_path_buf();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ReportError::IoError(format!(
                "failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let report = JsonReport::build(checkpoint);
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| ReportError::SerializationError(format!("failed to serialize report: {e}")))?;

    std::fs::write(&path, json).map_err(|e| {
        ReportError::IoError(format!("failed to write file {}: {}", path.display(), e))
    })?;

    info!(
        path = %path.display(),
        companies = checkpoint.companies().len(),
        "JSON report written"
    );
    Ok(path)
}
