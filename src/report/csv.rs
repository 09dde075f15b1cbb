//! CSV summary renderer
//!
//! Writes one row per company-year so the output loads directly into a
//! spreadsheet or pandas frame. Values come straight off the checkpoint
//! records; nothing is recomputed here.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;
use tracing::info;

use crate::checkpoint::{Checkpoint, ExtractionRecord};
use crate::report::{ReportError, ReportResult};

/// Default buffer size for file writes (8KB)
const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Flush to disk every N rows
const FLUSH_INTERVAL: u64 = 1000;

/// One CSV row: a single company in a single fiscal year
///
/// Decimal fields are rendered as strings to keep full precision in the
/// output file.
#[derive(Debug, Serialize)]
struct CsvSummaryRecord {
    cik: String,
    company_name: String,
    ticker: Option<String>,
    rank: Option<u32>,
    sector: Option<String>,
    fiscal_year: i32,
    total_compensation: Option<String>,
    tax_expense: Option<String>,
    compensation_vs_tax_ratio: Option<String>,
    status: String,
}

impl CsvSummaryRecord {
    fn build(record: &ExtractionRecord, year: i32) -> Self {
        Self {
            cik: record.cik.clone(),
            company_name: record.company_name.clone(),
            ticker: record.ticker.clone(),
            rank: record.rank,
            sector: record.sector.clone(),
            fiscal_year: year,
            total_compensation: record
                .total_compensation_by_year
                .get(&year)
                .map(|d| d.to_string()),
            tax_expense: record
                .tax_data
                .get(&year)
                .and_then(|t| t.total_tax_expense)
                .map(|d| d.to_string()),
            compensation_vs_tax_ratio: record
                .compensation_vs_tax_ratio
                .get(&year)
                .and_then(|r| r.as_ref())
                .map(|d| d.to_string()),
            status: record.status.to_string(),
        }
    }
}

/// CSV writer for the company-year summary
pub struct CsvSummaryWriter {
    writer: Writer<BufWriter<File>>,
    path: PathBuf,
    rows_written: u64,
}

impl CsvSummaryWriter {
    /// Create a new CSV summary writer
    pub fn new<P: AsRef<Path>>(path: P) -> ReportResult<Self> {
        Self::new_with_buffer_size(path, DEFAULT_BUFFER_SIZE)
    }

    /// Create a new CSV summary writer with a custom buffer size
    pub fn new_with_buffer_size<P: AsRef<Path>>(
        path: P,
        buffer_size: usize,
    ) -> ReportResult<Self> {
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

        let file = File::create(&path).map_err(|e| {
            ReportError::IoError(format!("failed to create file {}: {}", path.display(), e))
        })?;
        let buf_writer = BufWriter::with_capacity(buffer_size, file);
        let writer = csv::WriterBuilder::new()
            .has_headers(true)
            .from_writer(buf_writer);

        Ok(Self {
            writer,
            path,
            rows_written: 0,
        })
    }

    /// Write every company-year row for a checkpoint
    ///
    /// Rows cover the full analysis window for every company, so a company
    /// with no data for a year still produces a row with empty value cells.
    pub fn write_checkpoint(&mut self, checkpoint: &Checkpoint) -> ReportResult<()> {
        for record in checkpoint.companies() {
            for &year in checkpoint.analysis_years() {
                self.write_row(record, year)?;
            }
        }
        Ok(())
    }

    fn write_row(&mut self, record: &ExtractionRecord, year: i32) -> ReportResult<()> {
        let row = CsvSummaryRecord::build(record, year);
        self.writer
            .serialize(&row)
            .map_err(|e| ReportError::CsvError(format!("failed to write row: {e}")))?;

        self.rows_written += 1;
        if self.rows_written % FLUSH_INTERVAL == 0 {
            self.flush()?;
        }
        Ok(())
    }

    /// Number of rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Path of the output file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered rows to disk
    pub fn flush(&mut self) -> ReportResult<()> {
        self.writer
            .flush()
            .map_err(|e| ReportError::FlushError(format!("failed to flush CSV writer: {e}")))
    }

    /// Flush, finalize, and sync the output file
    pub fn close(mut self) -> ReportResult<PathBuf> {
        self.writer
            .flush()
            .map_err(|e| ReportError::FlushError(format!("failed to flush CSV writer: {e}")))?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| ReportError::IoError(format!("failed to finalize CSV writer: {e}")))?;
        let file = buf_writer
            .into_inner()
            .map_err(|e| ReportError::IoError(format!("failed to flush buffer: {e}")))?;
        file.sync_all()
            .map_err(|e| ReportError::IoError(format!("failed to sync file: {e}")))?;

        info!(
            path = %self.path.display(),
            rows = self.rows_written,
            "CSV summary written"
        );
        Ok(self.path)
    }
}
