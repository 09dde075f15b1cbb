//! Report renderers
//!
//! Renderers consume a finished checkpoint read-only and write output
//! files; they never re-derive progress or ratios. Two formats ship: a
//! CSV summary with one row per company-year, and a pretty-JSON report
//! carrying the full per-company detail.

pub mod csv;
pub mod json;

pub use csv::CsvSummaryWriter;
pub use json::write_json_report;

/// Report writer errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;
