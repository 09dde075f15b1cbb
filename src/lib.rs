//! # EDGAR Compensation Analyzer Library
//!
//! A library for extracting executive-compensation and income-tax-expense
//! data for Fortune-ranked companies from SEC EDGAR filings. Designed for
//! long multi-company runs over a rate-limited API, so every run is
//! checkpointed and resumable.
//!
//! ## Features
//!
//! - **Checkpoint/Resume**: progress is persisted atomically every few
//!   companies; interrupted runs pick up where they left off
//! - **Resume Decisions**: a decision engine matches new run requests
//!   against stored checkpoints and resumes, suggests, or starts fresh
//! - **EDGAR XBRL APIs**: tax expense from `us-gaap` facts, executive
//!   compensation from pay-versus-performance (`ecd`) disclosures
//! - **Rate Limiting**: built-in limiter honoring the SEC's fair-access
//!   guidance, with exponential-backoff retries
//! - **Reports**: CSV company-year summaries and full JSON reports
//!
//! ## Quick Start
//!
//! ```no_run
//! use edgar_comp_analyzer::checkpoint::CheckpointStore;
//! use edgar_comp_analyzer::directory::CompanyDirectory;
//! use edgar_comp_analyzer::extraction::create_extractor;
//! use edgar_comp_analyzer::orchestrator::{analysis_year_window, ExtractionOrchestrator};
//! use std::collections::BTreeMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = CheckpointStore::new("checkpoints");
//! let directory = CompanyDirectory::load_embedded()?;
//! let extractor = create_extractor("Acme Research admin@acme.example")?;
//! let orchestrator = ExtractionOrchestrator::new(store, extractor);
//!
//! let companies: Vec<_> = directory.top_companies(10).into_iter().cloned().collect();
//! let mut checkpoint = orchestrator.create_checkpoint(
//!     2023,
//!     analysis_year_window(2023, 5),
//!     &companies,
//!     BTreeMap::new(),
//! );
//! orchestrator.process_all_companies(&mut checkpoint, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several core modules:
//!
//! - [`checkpoint`] - Extraction records, the checkpoint model, and the
//!   atomic file store
//! - [`resume`] - Resume decision engine matching run requests to stored
//!   checkpoints
//! - [`extraction`] - Extraction service trait and the EDGAR implementation
//! - [`orchestrator`] - Per-company state machine and batch driver with
//!   retry, rate limiting, and periodic saves
//! - [`directory`] - Embedded Fortune-ranked company roster
//! - [`report`] - CSV and JSON report renderers
//! - [`cli`] - Command implementations for the binary

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Checkpoint data model and persistent store
pub mod checkpoint;

/// CLI command implementations
pub mod cli;

/// Embedded company roster with CIK lookup
pub mod directory;

/// Extraction service trait and EDGAR implementation
pub mod extraction;

/// Observability metrics
pub mod metrics;

/// Extraction orchestration with retry and rate limiting
pub mod orchestrator;

/// Report renderers
pub mod report;

/// Resume decision engine
pub mod resume;

/// Graceful shutdown coordination shared across modules
pub mod shutdown;

// Re-export commonly used types
pub use checkpoint::{Checkpoint, CheckpointStore, ExtractionRecord, ExtractionStatus};
pub use resume::{ResumeDecision, ResumeEngine};
