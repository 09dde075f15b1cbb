//! CLI command for rendering reports from a stored checkpoint

use std::path::Path;

use clap::Args;

use crate::checkpoint::Checkpoint;
use crate::report::{write_json_report, CsvSummaryWriter};

use super::{Cli, CliError};

/// Report subcommand
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Analysis id of the stored run
    #[arg(long)]
    analysis_id: String,

    /// Target year of the stored run
    #[arg(long)]
    year: i32,

    /// Report format to render
    #[arg(long, value_enum, default_value_t = ReportFormat::Both)]
    format: ReportFormat,
}

/// Output format for the report command
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ReportFormat {
    /// CSV summary, one row per company-year
    Csv,
    /// Full JSON report
    Json,
    /// Both CSV and JSON
    Both,
}

impl ReportCommand {
    /// Execute the report command
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let store = cli.checkpoint_store();
        let checkpoint = store.load(&self.analysis_id, self.year).ok_or_else(|| {
            CliError::CheckpointNotFound {
                analysis_id: self.analysis_id.clone(),
                target_year: self.year,
            }
        })?;

        if matches!(self.format, ReportFormat::Csv | ReportFormat::Both) {
            let path = self.render_csv(&checkpoint, &cli.output_dir)?;
            println!("CSV summary: {path}");
        }
        if matches!(self.format, ReportFormat::Json | ReportFormat::Both) {
            let path = self.render_json(&checkpoint, &cli.output_dir)?;
            println!("JSON report: {path}");
        }
        Ok(())
    }

    fn render_csv(&self, checkpoint: &Checkpoint, output_dir: &Path) -> Result<String, CliError> {
        let path = output_dir.join(format!(
            "compensation_tax_summary_{}_{}.csv",
            self.analysis_id, self.year
        ));
        let mut writer = CsvSummaryWriter::new(&path)?;
        writer.write_checkpoint(checkpoint)?;
        let written = writer.close()?;
        Ok(written.display().to_string())
    }

    fn render_json(&self, checkpoint: &Checkpoint, output_dir: &Path) -> Result<String, CliError> {
        let path = output_dir.join(format!(
            "compensation_tax_report_{}_{}.json",
            self.analysis_id, self.year
        ));
        let written = write_json_report(checkpoint, &path)?;
        Ok(written.display().to_string())
    }
}
