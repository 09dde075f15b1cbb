//! Run command implementation
//!
//! Applies the resume decision engine to pick up or create a checkpoint,
//! then drives the extraction orchestrator over it.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::directory::{CompanyDirectory, CompanyInfo};
use crate::extraction::create_extractor;
use crate::orchestrator::config::{
    DEFAULT_ANALYSIS_WINDOW_YEARS, DEFAULT_SAVE_FREQUENCY, MAX_COMPANY_RETRIES,
};
use crate::orchestrator::{analysis_year_window, ExtractionOrchestrator, ProgressCallback};
use crate::resume::{ResumeDecision, ResumeEngine};
use crate::shutdown::SharedShutdown;

use super::CliError;

/// Environment variable consulted when `--user-agent` is not given
const USER_AGENT_ENV: &str = "EDGAR_USER_AGENT";

/// EDGAR Compensation Analyzer CLI
#[derive(Parser, Debug)]
#[command(name = "edgar-comp-analyzer")]
#[command(
    about = "Extract executive compensation and tax expense data from SEC EDGAR",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Directory where analysis checkpoints are stored
    #[arg(long, global = true, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    /// Directory where rendered reports are written
    #[arg(long, global = true, default_value = "reports")]
    pub output_dir: PathBuf,

    /// Bind address for the optional Prometheus metrics endpoint
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Checkpoint store rooted at `--checkpoint-dir`
    pub fn checkpoint_store(&self) -> CheckpointStore {
        CheckpointStore::new(self.checkpoint_dir.clone())
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an extraction analysis
    Run(RunArgs),

    /// Inspect and manage stored checkpoints
    Checkpoints(super::CheckpointsCommand),

    /// Render reports from a stored checkpoint
    Report(super::ReportCommand),
}

/// Run command arguments
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Primary fiscal year to analyze
    #[arg(long, value_parser = clap::value_parser!(i32).range(1994..=2100))]
    pub year: i32,

    /// Number of top-ranked companies to analyze
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..=500))]
    pub companies: u32,

    /// Number of trailing fiscal years to extract, ending at --year
    #[arg(
        long,
        default_value_t = DEFAULT_ANALYSIS_WINDOW_YEARS,
        value_parser = clap::value_parser!(i32).range(1..=20)
    )]
    pub years_window: i32,

    /// Save the checkpoint after every N companies
    #[arg(
        long,
        default_value_t = DEFAULT_SAVE_FREQUENCY,
        value_parser = clap::value_parser!(u32).range(1..=100)
    )]
    pub save_frequency: u32,

    /// Maximum extraction attempts per company
    #[arg(
        long,
        default_value_t = MAX_COMPANY_RETRIES,
        value_parser = clap::value_parser!(u32).range(1..=20)
    )]
    pub max_retries: u32,

    /// Ignore existing checkpoints and start a fresh analysis
    #[arg(long, default_value_t = false)]
    pub force_new: bool,

    /// Disable checkpoint resume and always start a fresh analysis
    #[arg(long, default_value_t = false)]
    pub no_auto_resume: bool,

    /// Continue a suggested checkpoint instead of starting fresh
    #[arg(long, default_value_t = false)]
    pub accept_suggested: bool,

    /// Print the run summary as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// User-Agent header for EDGAR requests
    ///
    /// The SEC requires a descriptive User-Agent naming the requester,
    /// e.g. "Acme Research admin@acme.example". Falls back to the
    /// EDGAR_USER_AGENT environment variable.
    #[arg(long)]
    pub user_agent: Option<String>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(&self, cli: &Cli, shutdown: SharedShutdown) -> Result<(), CliError> {
        let user_agent = self.resolve_user_agent()?;
        let store = cli.checkpoint_store();

        let directory = CompanyDirectory::load_embedded()?;
        let selected: Vec<CompanyInfo> = directory
            .top_companies(self.companies as usize)
            .into_iter()
            .cloned()
            .collect();
        if (selected.len() as u32) < self.companies {
            info!(
                requested = self.companies,
                available = selected.len(),
                "Roster smaller than requested company count"
            );
        }

        let extractor = create_extractor(&user_agent)?;
        let orchestrator = ExtractionOrchestrator::new(store.clone(), extractor)
            .with_max_retries(self.max_retries)
            .with_save_frequency(self.save_frequency)
            .with_shutdown(shutdown.clone());

        let mut checkpoint = self.resolve_checkpoint(&store, &orchestrator, &selected);

        let progress_bar = create_progress_bar(u64::from(checkpoint.total_companies()), self.year);
        progress_bar.set_position(u64::from(
            checkpoint.completed_companies() + checkpoint.failed_companies(),
        ));
        let bar = progress_bar.clone();
        let callback = move |processed: u32, _total: u32| {
            bar.set_position(u64::from(processed));
        };
        let callback_ref: &ProgressCallback = &callback;

        orchestrator
            .process_all_companies(&mut checkpoint, Some(callback_ref))
            .await?;
        progress_bar.finish_and_clear();

        let interrupted = shutdown.is_shutdown_requested() && !checkpoint.is_complete();
        if self.json {
            output_json(&store, &checkpoint, interrupted);
        } else {
            output_human(&store, &checkpoint, interrupted);
        }
        Ok(())
    }

    fn resolve_user_agent(&self) -> Result<String, CliError> {
        if let Some(ua) = &self.user_agent {
            return Ok(ua.clone());
        }
        match std::env::var(USER_AGENT_ENV) {
            Ok(ua) if !ua.trim().is_empty() => Ok(ua),
            _ => Err(CliError::InvalidArgument(format!(
                "EDGAR requires a descriptive User-Agent; pass --user-agent or set {USER_AGENT_ENV}"
            ))),
        }
    }

    // ─── Resume policy ───────────────────────────────────────────────────────

    /// Apply the resume decision engine to pick the checkpoint to work on
    ///
    /// A suggested checkpoint is only continued with `--accept-suggested`;
    /// the non-interactive default prints the candidate and starts fresh.
    fn resolve_checkpoint(
        &self,
        store: &CheckpointStore,
        orchestrator: &ExtractionOrchestrator,
        companies: &[CompanyInfo],
    ) -> Checkpoint {
        let engine = ResumeEngine::new(store.clone()).with_auto_resume(!self.no_auto_resume);
        let decision =
            engine.find_resumable(self.year, Some(companies.len() as u32), self.force_new);

        match decision {
            ResumeDecision::AutoResume { checkpoint, reason } => {
                println!(
                    "Resuming analysis {} ({:.1}% complete): {}",
                    checkpoint.analysis_id(),
                    checkpoint.progress_percentage(),
                    reason
                );
                *checkpoint
            }
            ResumeDecision::Suggest { checkpoint, reason } => {
                if self.accept_suggested {
                    println!(
                        "Continuing suggested analysis {} ({:.1}% complete)",
                        checkpoint.analysis_id(),
                        checkpoint.progress_percentage()
                    );
                    *checkpoint
                } else {
                    println!(
                        "Found analysis {} at {:.1}% ({}); re-run with --accept-suggested to continue it.",
                        checkpoint.analysis_id(),
                        checkpoint.progress_percentage(),
                        reason
                    );
                    println!("Starting a fresh analysis.");
                    self.create_fresh(orchestrator, companies)
                }
            }
            ResumeDecision::StartNew { reason } => {
                info!(reason = %reason, "Starting new analysis");
                self.create_fresh(orchestrator, companies)
            }
        }
    }

    fn create_fresh(
        &self,
        orchestrator: &ExtractionOrchestrator,
        companies: &[CompanyInfo],
    ) -> Checkpoint {
        let years = analysis_year_window(self.year, self.years_window);
        let mut config = BTreeMap::new();
        config.insert(
            "requested_companies".to_string(),
            serde_json::json!(self.companies),
        );
        config.insert(
            "years_window".to_string(),
            serde_json::json!(self.years_window),
        );
        config.insert(
            "save_frequency".to_string(),
            serde_json::json!(self.save_frequency),
        );
        config.insert(
            "max_retries".to_string(),
            serde_json::json!(self.max_retries),
        );
        orchestrator.create_checkpoint(self.year, years, companies, config)
    }
}

// ─── Run summary output ──────────────────────────────────────────────────────

fn output_human(store: &CheckpointStore, checkpoint: &Checkpoint, interrupted: bool) {
    if interrupted {
        println!("\nExtraction interrupted; progress saved.");
        println!(
            "Re-run the same command to resume analysis {}.",
            checkpoint.analysis_id()
        );
    } else {
        println!("\nExtraction completed!");
    }
    println!("Analysis ID: {}", checkpoint.analysis_id());
    println!("Target year: {}", checkpoint.target_year());
    println!(
        "Companies completed: {}/{}",
        checkpoint.completed_companies(),
        checkpoint.total_companies()
    );
    if checkpoint.failed_companies() > 0 {
        println!("Companies failed: {}", checkpoint.failed_companies());
        for record in checkpoint.get_failed_companies() {
            println!(
                "  {} {}: {}",
                record.cik,
                record.company_name,
                record.error_message.as_deref().unwrap_or("unknown error")
            );
        }
    }
    println!("Success rate: {:.1}%", checkpoint.success_rate());
    println!(
        "Checkpoint: {}",
        store
            .checkpoint_path(checkpoint.analysis_id(), checkpoint.target_year())
            .display()
    );
}

fn output_json(store: &CheckpointStore, checkpoint: &Checkpoint, interrupted: bool) {
    let failed: Vec<serde_json::Value> = checkpoint
        .get_failed_companies()
        .iter()
        .map(|r| {
            serde_json::json!({
                "cik": r.cik,
                "company_name": r.company_name,
                "error": r.error_message,
            })
        })
        .collect();

    let output = serde_json::json!({
        "success": !interrupted,
        "interrupted": interrupted,
        "analysis_id": checkpoint.analysis_id(),
        "target_year": checkpoint.target_year(),
        "analysis_years": checkpoint.analysis_years(),
        "total_companies": checkpoint.total_companies(),
        "completed_companies": checkpoint.completed_companies(),
        "failed_companies": checkpoint.failed_companies(),
        "progress_percentage": checkpoint.progress_percentage(),
        "success_rate": checkpoint.success_rate(),
        "failed": failed,
        "checkpoint_path": store
            .checkpoint_path(checkpoint.analysis_id(), checkpoint.target_year())
            .display()
            .to_string(),
    });
    println!("{output}");
}

// ─── Progress bar ────────────────────────────────────────────────────────────

/// Create the company-level progress bar
fn create_progress_bar(total_companies: u64, target_year: i32) -> ProgressBar {
    let pb = ProgressBar::new(total_companies);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .expect("hardcoded template is valid")
            .progress_chars("#>-"),
    );
    pb.set_message(format!("Extracting fiscal {target_year} data"));
    pb
}
