//! Checkpoint data model and persistence
//!
//! This module is the durable heart of the extraction pipeline: every
//! analysis run lives in a [`Checkpoint`] that is saved after every few
//! companies, so an interrupted run can be picked up where it stopped.
//!
//! # Overview
//!
//! 1. **Per-company state**: [`record::ExtractionRecord`] tracks status,
//!    retries, timestamps, and extracted financial data per company
//! 2. **Run aggregate**: [`model::Checkpoint`] holds the ordered company
//!    list, progress counters, and computed progress/success rates
//! 3. **Persistence**: [`store::CheckpointStore`] saves, loads, lists, and
//!    deletes checkpoint files under one directory
//!
//! # File format
//!
//! One pretty-JSON file per run, named
//! `analysis_{analysis_id}_{target_year}.json`. Timestamps are ISO-8601
//! strings, money values plain floats, and year-keyed maps use string keys
//! at rest. Repeated saves overwrite the same file.
//!
//! # Error Handling
//!
//! Read paths never fail: a missing, corrupt, oversized, or
//! schema-mismatched file loads as `None` (or is skipped by `list`) after
//! a logged warning. Write failures surface as [`CheckpointError`] and are
//! fatal to a run.
//!
//! # Related Modules
//!
//! - [`crate::resume`] - Decides whether an on-disk checkpoint is resumed
//! - [`crate::orchestrator`] - Mutates checkpoints and schedules saves

pub mod model;
pub mod record;
pub mod store;

pub use model::{Checkpoint, GlobalError, SCHEMA_VERSION};
pub use record::{CompensationRecord, ExtractionRecord, ExtractionStatus, TaxExpense};
pub use store::{
    CheckpointError, CheckpointResult, CheckpointStore, CheckpointSummary,
    MAX_CHECKPOINT_FILE_SIZE,
};
