//! Unit tests for CLI argument parsing

use std::path::PathBuf;

use clap::Parser;

use edgar_comp_analyzer::cli::{Cli, Commands};

fn parse(args: &[&str]) -> Cli {
    Cli::parse_from(args.iter().copied())
}

fn try_parse(args: &[&str]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(args.iter().copied())
}

#[test]
fn test_run_defaults() {
    let cli = parse(&["edgar-comp-analyzer", "run", "--year", "2023"]);

    assert_eq!(cli.checkpoint_dir, PathBuf::from("checkpoints"));
    assert_eq!(cli.output_dir, PathBuf::from("reports"));
    assert!(cli.metrics_addr.is_none());

    let Commands::Run(args) = cli.command else {
        panic!("Expected the run command");
    };
    assert_eq!(args.year, 2023);
    assert_eq!(args.companies, 10);
    assert_eq!(args.years_window, 5);
    assert_eq!(args.save_frequency, 5);
    assert_eq!(args.max_retries, 3);
    assert!(!args.force_new);
    assert!(!args.no_auto_resume);
    assert!(!args.accept_suggested);
    assert!(!args.json);
    assert!(args.user_agent.is_none());
}

#[test]
fn test_run_flag_overrides() {
    let cli = parse(&[
        "edgar-comp-analyzer",
        "--checkpoint-dir",
        "/var/lib/analyzer/checkpoints",
        "--output-dir",
        "/var/lib/analyzer/reports",
        "run",
        "--year",
        "2021",
        "--companies",
        "50",
        "--years-window",
        "3",
        "--save-frequency",
        "10",
        "--max-retries",
        "5",
        "--force-new",
        "--no-auto-resume",
        "--accept-suggested",
        "--json",
        "--user-agent",
        "Acme Research admin@acme.example",
    ]);

    assert_eq!(
        cli.checkpoint_dir,
        PathBuf::from("/var/lib/analyzer/checkpoints")
    );
    assert_eq!(cli.output_dir, PathBuf::from("/var/lib/analyzer/reports"));

    let Commands::Run(args) = cli.command else {
        panic!("Expected the run command");
    };
    assert_eq!(args.year, 2021);
    assert_eq!(args.companies, 50);
    assert_eq!(args.years_window, 3);
    assert_eq!(args.save_frequency, 10);
    assert_eq!(args.max_retries, 5);
    assert!(args.force_new);
    assert!(args.no_auto_resume);
    assert!(args.accept_suggested);
    assert!(args.json);
    assert_eq!(
        args.user_agent.as_deref(),
        Some("Acme Research admin@acme.example")
    );
}

/// Global flags are accepted after the subcommand as well
#[test]
fn test_global_flags_after_subcommand() {
    let cli = parse(&[
        "edgar-comp-analyzer",
        "run",
        "--year",
        "2023",
        "--checkpoint-dir",
        "local-checkpoints",
    ]);
    assert_eq!(cli.checkpoint_dir, PathBuf::from("local-checkpoints"));
}

#[test]
fn test_run_requires_year() {
    assert!(try_parse(&["edgar-comp-analyzer", "run"]).is_err());
}

#[test]
fn test_year_range_enforced() {
    assert!(try_parse(&["edgar-comp-analyzer", "run", "--year", "1993"]).is_err());
    assert!(try_parse(&["edgar-comp-analyzer", "run", "--year", "2101"]).is_err());
    assert!(try_parse(&["edgar-comp-analyzer", "run", "--year", "1994"]).is_ok());
}

#[test]
fn test_companies_range_enforced() {
    assert!(try_parse(&[
        "edgar-comp-analyzer",
        "run",
        "--year",
        "2023",
        "--companies",
        "0"
    ])
    .is_err());
    assert!(try_parse(&[
        "edgar-comp-analyzer",
        "run",
        "--year",
        "2023",
        "--companies",
        "501"
    ])
    .is_err());
    assert!(try_parse(&[
        "edgar-comp-analyzer",
        "run",
        "--year",
        "2023",
        "--companies",
        "500"
    ])
    .is_ok());
}

#[test]
fn test_tuning_ranges_enforced() {
    assert!(try_parse(&[
        "edgar-comp-analyzer",
        "run",
        "--year",
        "2023",
        "--years-window",
        "21"
    ])
    .is_err());
    assert!(try_parse(&[
        "edgar-comp-analyzer",
        "run",
        "--year",
        "2023",
        "--save-frequency",
        "0"
    ])
    .is_err());
    assert!(try_parse(&[
        "edgar-comp-analyzer",
        "run",
        "--year",
        "2023",
        "--max-retries",
        "0"
    ])
    .is_err());
}

#[test]
fn test_metrics_addr_parses_socket_addr() {
    let cli = parse(&[
        "edgar-comp-analyzer",
        "--metrics-addr",
        "127.0.0.1:9090",
        "checkpoints",
        "list",
    ]);
    let addr = cli.metrics_addr.unwrap();
    assert_eq!(addr.port(), 9090);

    assert!(try_parse(&[
        "edgar-comp-analyzer",
        "--metrics-addr",
        "not-an-addr",
        "checkpoints",
        "list"
    ])
    .is_err());
}

#[test]
fn test_checkpoints_subcommands_parse() {
    let cli = parse(&["edgar-comp-analyzer", "checkpoints", "list", "--json"]);
    assert!(matches!(cli.command, Commands::Checkpoints(_)));

    let cli = parse(&[
        "edgar-comp-analyzer",
        "checkpoints",
        "show",
        "--analysis-id",
        "fortune500_2023_ab12cd34",
        "--year",
        "2023",
    ]);
    assert!(matches!(cli.command, Commands::Checkpoints(_)));

    let cli = parse(&[
        "edgar-comp-analyzer",
        "checkpoints",
        "delete",
        "--analysis-id",
        "fortune500_2023_ab12cd34",
        "--year",
        "2023",
    ]);
    assert!(matches!(cli.command, Commands::Checkpoints(_)));

    // show and delete require the run identity
    assert!(try_parse(&["edgar-comp-analyzer", "checkpoints", "show"]).is_err());
    assert!(try_parse(&["edgar-comp-analyzer", "checkpoints", "delete"]).is_err());
}

#[test]
fn test_report_subcommand_parses() {
    let cli = parse(&[
        "edgar-comp-analyzer",
        "report",
        "--analysis-id",
        "fortune500_2023_ab12cd34",
        "--year",
        "2023",
    ]);
    assert!(matches!(cli.command, Commands::Report(_)));

    for format in ["csv", "json", "both"] {
        assert!(try_parse(&[
            "edgar-comp-analyzer",
            "report",
            "--analysis-id",
            "fortune500_2023_ab12cd34",
            "--year",
            "2023",
            "--format",
            format,
        ])
        .is_ok());
    }

    assert!(try_parse(&[
        "edgar-comp-analyzer",
        "report",
        "--analysis-id",
        "fortune500_2023_ab12cd34",
        "--year",
        "2023",
        "--format",
        "xml",
    ])
    .is_err());
}
