//! Durable checkpoint persistence
//!
//! One pretty-JSON file per `(analysis_id, target_year)` pair under a
//! configurable directory. Writes are atomic (temp file plus rename) and
//! guarded by an advisory file lock; reads degrade to `None`/skip on
//! missing or corrupt files so callers treat both cases uniformly.

use super::model::{Checkpoint, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use fd_lock::RwLock;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Maximum allowed checkpoint file size (10 MB) to prevent memory exhaustion
pub const MAX_CHECKPOINT_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Errors related to checkpoint persistence
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Schema version mismatch
    #[error("schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch {
        /// Expected schema version
        expected: String,
        /// Found schema version
        found: String,
    },

    /// Checkpoint file too large
    #[error("checkpoint file too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge {
        /// Actual file size
        size: u64,
        /// Maximum allowed size
        max: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Deserialization error
    #[error("deserialization error: {0}")]
    DeserializationError(String),

    /// Lock error
    #[error("lock error: {0}")]
    LockError(String),
}

/// Result alias for checkpoint store operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Lightweight view of one stored checkpoint
///
/// Parsed from the same file as the full [`Checkpoint`] but carrying only
/// the fields needed to rank resume candidates, so listing a directory
/// never reconstitutes per-company records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointSummary {
    /// Analysis id of the stored run
    pub analysis_id: String,
    /// Primary analysis year
    pub target_year: i32,
    /// Company count fixed at creation
    pub total_companies: u32,
    /// Companies completed successfully
    #[serde(default)]
    pub completed_companies: u32,
    /// Companies failed terminally
    #[serde(default)]
    pub failed_companies: u32,
    /// When the run was created
    pub created_at: DateTime<Utc>,
    /// When the run was last saved
    pub last_updated: DateTime<Utc>,
}

impl CheckpointSummary {
    /// Percentage of companies processed, 0-100, 0 when the run is empty
    pub fn progress_percentage(&self) -> f64 {
        if self.total_companies == 0 {
            return 0.0;
        }
        let processed = self.completed_companies + self.failed_companies;
        processed as f64 * 100.0 / self.total_companies as f64
    }

    /// Whether every company has been processed
    pub fn is_complete(&self) -> bool {
        self.completed_companies + self.failed_companies >= self.total_companies
    }
}

/// On-disk view read by `list`: the schema gate plus the summary fields
#[derive(Debug, Deserialize)]
struct StoredSummary {
    schema_version: String,
    #[serde(flatten)]
    summary: CheckpointSummary,
}

/// File-based checkpoint store
///
/// The directory is created on first save; `load` and `list` on a missing
/// directory behave as an empty store.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    base_dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get the store's base directory
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Deterministic file path for an `(analysis_id, target_year)` pair
    ///
    /// Repeated saves of the same run overwrite the same file, which is
    /// what makes a run resumable.
    pub fn checkpoint_path(&self, analysis_id: &str, target_year: i32) -> PathBuf {
        self.base_dir
            .join(format!("analysis_{analysis_id}_{target_year}.json"))
    }

    /// Save a checkpoint, stamping `last_updated` first
    ///
    /// Serializes to a temp file in the store directory, fsyncs, then
    /// atomically renames over the target path while holding an exclusive
    /// advisory lock on the `.lock` sibling. Errors here are fatal to the
    /// run: losing the ability to persist progress defeats the subsystem.
    pub fn save(&self, checkpoint: &mut Checkpoint) -> CheckpointResult<PathBuf> {
        checkpoint.touch();

        let path = self.checkpoint_path(checkpoint.analysis_id(), checkpoint.target_year());
        debug!(
            path = %path.display(),
            analysis_id = %checkpoint.analysis_id(),
            progress = checkpoint.progress_percentage(),
            "Saving checkpoint"
        );

        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| CheckpointError::IoError(e.to_string()))?;

        let json = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| CheckpointError::SerializationError(e.to_string()))?;

        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| CheckpointError::LockError(format!("Failed to create lock file: {e}")))?;

        let mut lock = RwLock::new(lock_file);
        let _guard = lock
            .write()
            .map_err(|e| CheckpointError::LockError(format!("Failed to acquire write lock: {e}")))?;

        let mut temp_file = tempfile::NamedTempFile::new_in(&self.base_dir)
            .map_err(|e| CheckpointError::IoError(format!("Failed to create temp file: {e}")))?;

        temp_file
            .write_all(json.as_bytes())
            .map_err(|e| CheckpointError::IoError(format!("Failed to write to temp file: {e}")))?;

        temp_file
            .flush()
            .map_err(|e| CheckpointError::IoError(format!("Failed to flush temp file: {e}")))?;
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| CheckpointError::IoError(format!("Failed to sync temp file: {e}")))?;

        temp_file
            .persist(&path)
            .map_err(|e| CheckpointError::IoError(format!("Failed to persist temp file: {e}")))?;

        // Fsync the directory so the rename survives a crash
        if let Ok(dir) = std::fs::File::open(&self.base_dir) {
            let _ = dir.sync_all();
        }

        info!(
            path = %path.display(),
            completed = checkpoint.completed_companies(),
            failed = checkpoint.failed_companies(),
            total = checkpoint.total_companies(),
            "Checkpoint saved"
        );

        Ok(path)
    }

    /// Load a checkpoint, or `None` when it is missing or unreadable
    ///
    /// Corrupt, oversized, and schema-mismatched files are logged and
    /// reported as `None`; callers treat every such case as "no usable
    /// checkpoint".
    pub fn load(&self, analysis_id: &str, target_year: i32) -> Option<Checkpoint> {
        let path = self.checkpoint_path(analysis_id, target_year);
        if !path.exists() {
            debug!(path = %path.display(), "No checkpoint file found");
            return None;
        }

        match self.try_load(&path) {
            Ok(checkpoint) => {
                info!(
                    analysis_id = %checkpoint.analysis_id(),
                    target_year = checkpoint.target_year(),
                    progress = checkpoint.progress_percentage(),
                    "Checkpoint loaded"
                );
                Some(checkpoint)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to load checkpoint, treating as not found"
                );
                None
            }
        }
    }

    fn try_load(&self, path: &Path) -> CheckpointResult<Checkpoint> {
        let lock_path = path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| CheckpointError::LockError(format!("Failed to create lock file: {e}")))?;

        let lock = RwLock::new(lock_file);
        let _guard = lock
            .read()
            .map_err(|e| CheckpointError::LockError(format!("Failed to acquire read lock: {e}")))?;

        let metadata =
            std::fs::metadata(path).map_err(|e| CheckpointError::IoError(e.to_string()))?;
        if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
            return Err(CheckpointError::FileTooLarge {
                size: metadata.len(),
                max: MAX_CHECKPOINT_FILE_SIZE,
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| CheckpointError::IoError(e.to_string()))?;

        let checkpoint: Checkpoint = serde_json::from_str(&contents)
            .map_err(|e| CheckpointError::DeserializationError(e.to_string()))?;

        if checkpoint.schema_version() != SCHEMA_VERSION {
            return Err(CheckpointError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found: checkpoint.schema_version().to_string(),
            });
        }

        Ok(checkpoint)
    }

    /// List summaries of every stored checkpoint, most recently saved first
    ///
    /// Files that cannot be parsed or carry a different schema version
    /// are skipped with a warning; a missing store directory is an empty
    /// store.
    pub fn list(&self) -> Vec<CheckpointSummary> {
        let entries = match std::fs::read_dir(&self.base_dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(
                    dir = %self.base_dir.display(),
                    error = %e,
                    "Checkpoint directory not readable, treating as empty"
                );
                return Vec::new();
            }
        };

        let mut summaries = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.starts_with("analysis_") || !name.ends_with(".json") {
                continue;
            }

            match self.read_summary(&path) {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Skipping unreadable checkpoint file"
                    );
                }
            }
        }

        summaries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));

        debug!(count = summaries.len(), "Listed checkpoint summaries");
        summaries
    }

    fn read_summary(&self, path: &Path) -> CheckpointResult<CheckpointSummary> {
        let metadata =
            std::fs::metadata(path).map_err(|e| CheckpointError::IoError(e.to_string()))?;
        if metadata.len() > MAX_CHECKPOINT_FILE_SIZE {
            return Err(CheckpointError::FileTooLarge {
                size: metadata.len(),
                max: MAX_CHECKPOINT_FILE_SIZE,
            });
        }

        let contents =
            std::fs::read_to_string(path).map_err(|e| CheckpointError::IoError(e.to_string()))?;
        let stored: StoredSummary = serde_json::from_str(&contents)
            .map_err(|e| CheckpointError::DeserializationError(e.to_string()))?;

        if stored.schema_version != SCHEMA_VERSION {
            return Err(CheckpointError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found: stored.schema_version,
            });
        }

        Ok(stored.summary)
    }

    /// Delete a stored checkpoint; returns whether a file was removed
    pub fn delete(&self, analysis_id: &str, target_year: i32) -> bool {
        let path = self.checkpoint_path(analysis_id, target_year);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                // Best-effort cleanup of the lock sibling
                let _ = std::fs::remove_file(path.with_extension("lock"));
                info!(path = %path.display(), "Checkpoint deleted");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No checkpoint file to delete");
                false
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to delete checkpoint");
                false
            }
        }
    }
}
