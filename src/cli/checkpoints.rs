//! CLI commands for inspecting and managing stored checkpoints

use clap::Args;
use serde_json::json;

use crate::checkpoint::{Checkpoint, CheckpointStore};

use super::{Cli, CliError};

/// Checkpoints subcommand
#[derive(Debug, Args)]
pub struct CheckpointsCommand {
    #[command(subcommand)]
    action: CheckpointsAction,
}

/// Checkpoint actions
#[derive(Debug, clap::Subcommand)]
enum CheckpointsAction {
    /// List stored checkpoints, most recently updated first
    List {
        /// Print the listing as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show one checkpoint's progress and failures
    Show {
        /// Analysis id of the stored run
        #[arg(long)]
        analysis_id: String,

        /// Target year of the stored run
        #[arg(long)]
        year: i32,

        /// Print the detail as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Delete a stored checkpoint
    Delete {
        /// Analysis id of the stored run
        #[arg(long)]
        analysis_id: String,

        /// Target year of the stored run
        #[arg(long)]
        year: i32,
    },
}

impl CheckpointsCommand {
    /// Execute the checkpoints command
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let store = cli.checkpoint_store();
        match &self.action {
            CheckpointsAction::List { json } => self.execute_list(&store, *json),
            CheckpointsAction::Show {
                analysis_id,
                year,
                json,
            } => self.execute_show(&store, analysis_id, *year, *json),
            CheckpointsAction::Delete { analysis_id, year } => {
                self.execute_delete(&store, analysis_id, *year)
            }
        }
    }

    fn execute_list(&self, store: &CheckpointStore, json: bool) -> Result<(), CliError> {
        let summaries = store.list();

        if json {
            let entries: Vec<serde_json::Value> = summaries
                .iter()
                .map(|s| {
                    json!({
                        "analysis_id": s.analysis_id,
                        "target_year": s.target_year,
                        "total_companies": s.total_companies,
                        "completed_companies": s.completed_companies,
                        "failed_companies": s.failed_companies,
                        "progress_percentage": s.progress_percentage(),
                        "is_complete": s.is_complete(),
                        "created_at": s.created_at,
                        "last_updated": s.last_updated,
                    })
                })
                .collect();
            println!("{:#}", serde_json::Value::Array(entries));
            return Ok(());
        }

        if summaries.is_empty() {
            println!("No checkpoints found in {}", store.base_dir().display());
            return Ok(());
        }

        println!("Found {} checkpoint(s):\n", summaries.len());
        for s in &summaries {
            println!(
                "{} | year {} | {}/{} processed ({:.1}%) | updated {}",
                s.analysis_id,
                s.target_year,
                s.completed_companies + s.failed_companies,
                s.total_companies,
                s.progress_percentage(),
                s.last_updated.format("%Y-%m-%d %H:%M UTC")
            );
        }
        Ok(())
    }

    fn execute_show(
        &self,
        store: &CheckpointStore,
        analysis_id: &str,
        year: i32,
        json: bool,
    ) -> Result<(), CliError> {
        let checkpoint =
            store
                .load(analysis_id, year)
                .ok_or_else(|| CliError::CheckpointNotFound {
                    analysis_id: analysis_id.to_string(),
                    target_year: year,
                })?;

        if json {
            println!("{:#}", show_json(&checkpoint));
            return Ok(());
        }

        println!("Analysis ID: {}", checkpoint.analysis_id());
        println!("Target year: {}", checkpoint.target_year());
        println!("Analysis years: {:?}", checkpoint.analysis_years());
        println!(
            "Created: {}",
            checkpoint.created_at().format("%Y-%m-%d %H:%M UTC")
        );
        println!(
            "Updated: {}",
            checkpoint.last_updated().format("%Y-%m-%d %H:%M UTC")
        );
        println!(
            "Progress: {:.1}% ({}/{} companies)",
            checkpoint.progress_percentage(),
            checkpoint.completed_companies() + checkpoint.failed_companies(),
            checkpoint.total_companies()
        );
        println!("Completed: {}", checkpoint.completed_companies());
        println!("Failed: {}", checkpoint.failed_companies());
        println!("Pending: {}", checkpoint.get_pending_companies().len());

        let failed = checkpoint.get_failed_companies();
        if !failed.is_empty() {
            println!("\nFailed companies:");
            for record in failed {
                println!(
                    "  {} {} (retries: {}): {}",
                    record.cik,
                    record.company_name,
                    record.retry_count,
                    record.error_message.as_deref().unwrap_or("unknown error")
                );
            }
        }

        if !checkpoint.global_errors().is_empty() {
            println!("\nRun-level errors:");
            for err in checkpoint.global_errors() {
                println!(
                    "  [{}] {}",
                    err.occurred_at.format("%Y-%m-%d %H:%M UTC"),
                    err.message
                );
            }
        }
        Ok(())
    }

    fn execute_delete(
        &self,
        store: &CheckpointStore,
        analysis_id: &str,
        year: i32,
    ) -> Result<(), CliError> {
        if store.delete(analysis_id, year) {
            println!("Deleted checkpoint {analysis_id} (year {year})");
            Ok(())
        } else {
            Err(CliError::CheckpointNotFound {
                analysis_id: analysis_id.to_string(),
                target_year: year,
            })
        }
    }
}

fn show_json(checkpoint: &Checkpoint) -> serde_json::Value {
    let failed: Vec<serde_json::Value> = checkpoint
        .get_failed_companies()
        .iter()
        .map(|r| {
            json!({
                "cik": r.cik,
                "company_name": r.company_name,
                "retry_count": r.retry_count,
                "error": r.error_message,
            })
        })
        .collect();

    json!({
        "analysis_id": checkpoint.analysis_id(),
        "target_year": checkpoint.target_year(),
        "analysis_years": checkpoint.analysis_years(),
        "created_at": checkpoint.created_at(),
        "last_updated": checkpoint.last_updated(),
        "total_companies": checkpoint.total_companies(),
        "completed_companies": checkpoint.completed_companies(),
        "failed_companies": checkpoint.failed_companies(),
        "pending_companies": checkpoint.get_pending_companies().len(),
        "progress_percentage": checkpoint.progress_percentage(),
        "success_rate": checkpoint.success_rate(),
        "is_complete": checkpoint.is_complete(),
        "failed": failed,
        "global_errors": checkpoint.global_errors(),
    })
}
