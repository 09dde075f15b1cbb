//! Extraction orchestration
//!
//! Drives a checkpoint through its pending companies: per-company state
//! transitions with retry accounting, per-year fetches against the
//! extraction service, periodic checkpoint saves, and progress reporting.
//!
//! ## Failure model
//!
//! A company failing never aborts the batch; the failure is absorbed into
//! that company's record (requeue or terminal `Failed`). The only error
//! that stops a run is the checkpoint store refusing a scheduled save,
//! because continuing without durable progress would silently widen the
//! window of lost work.
//!
//! ## Related Modules
//!
//! - `crate::checkpoint`: the state being driven
//! - `crate::extraction`: the per-year data source
//! - `crate::resume`: decides which checkpoint a run starts from

use crate::checkpoint::CheckpointError;

pub mod config;
pub mod executor;
pub mod rate_limit;

pub use executor::{analysis_year_window, ExtractionOrchestrator, ProgressCallback};

/// Orchestrator errors
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Checkpoint persistence failed during a scheduled save
    #[error("checkpoint store error: {0}")]
    StoreError(#[from] CheckpointError),
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
