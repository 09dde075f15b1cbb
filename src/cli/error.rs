//! CLI error types and conversions

use crate::checkpoint::CheckpointError;
use crate::directory::DirectoryError;
use crate::extraction::ExtractError;
use crate::orchestrator::OrchestratorError;
use crate::report::ReportError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Checkpoint store error
    #[error("checkpoint error: {0}")]
    CheckpointError(#[from] CheckpointError),

    /// Company directory error
    #[error("directory error: {0}")]
    DirectoryError(#[from] DirectoryError),

    /// Extraction service error
    #[error("extraction error: {0}")]
    ExtractError(#[from] ExtractError),

    /// Orchestrator error
    #[error("orchestrator error: {0}")]
    OrchestratorError(#[from] OrchestratorError),

    /// Report writer error
    #[error("report error: {0}")]
    ReportError(#[from] ReportError),

    /// Invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Addressed checkpoint does not exist
    #[error("no checkpoint found for analysis {analysis_id} year {target_year}")]
    CheckpointNotFound {
        /// Requested analysis id
        analysis_id: String,
        /// Requested target year
        target_year: i32,
    },
}
