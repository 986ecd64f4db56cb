use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use oaslint::{DocumentLoader, LintConfig, Ruleset};
use std::io::Write;
use std::path::Path;

use crate::output::{Colors, FileReport, render_text};

#[derive(Parser)]
#[command(name = "oaslint")]
#[command(about = "Schema graph linter for OpenAPI and Swagger definitions", long_about = None)]
pub struct Cli {
    /// Increase verbosity (can be used multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to a YAML or JSON lint config overriding the discovered one
    #[arg(long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lint API definition files or directories
    Lint {
        /// File or directory to lint (can be specified multiple times)
        #[arg(long, required = true, action = clap::ArgAction::Append)]
        path: Vec<String>,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// List the built-in rules with their default severities
    ListRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

/// Run the CLI application
///
/// # Errors
///
/// Returns an error if command execution fails
pub fn run() -> Result<bool> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Execute CLI commands with a parsed Cli struct.
/// Returns `true` when any linted document has error-level violations.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration loading fails
/// - A named file is missing, unreadable or not an API definition
/// - Writing the output fails
pub fn run_with_cli(cli: Cli) -> Result<bool> {
    // WARNING (no -v), INFO (-v), DEBUG (-vv)
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };

    // Only initialize logging if not already initialized (for testing)
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let config = LintConfig::load(cli.config.as_deref().map(Path::new))?;

    match cli.command {
        Commands::Lint { path, format } => lint(&path, format, &config),
        Commands::ListRules => {
            let rules: Vec<serde_json::Value> = Ruleset::recommended()
                .rules()
                .iter()
                .map(|rule| {
                    let severity = config.severity_for(rule.name(), rule.default_severity());
                    serde_json::json!({
                        "name": rule.name(),
                        "description": rule.description(),
                        "severity": severity.map_or_else(|| "off".to_owned(), |s| s.to_string()),
                    })
                })
                .collect();
            print_result(&rules)?;
            Ok(false)
        }
    }
}

fn lint(paths: &[String], format: OutputFormat, config: &LintConfig) -> Result<bool> {
    let documents = DocumentLoader::new(paths).load()?;
    let ruleset = Ruleset::recommended();

    let reports: Vec<FileReport> = documents
        .iter()
        .map(|loaded| {
            tracing::info!("Linting {}", loaded.path.display());
            FileReport {
                file: loaded.path.display().to_string(),
                report: ruleset.lint(&loaded.document, config),
            }
        })
        .collect();
    let has_errors = reports.iter().any(|r| r.report.has_errors());

    match format {
        OutputFormat::Json => print_result(&reports)?,
        OutputFormat::Text => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            render_text(&mut handle, &reports, &Colors::new())?;
        }
    }

    Ok(has_errors)
}

fn print_result<T: serde::Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, value)?;
    writeln!(handle)?;
    Ok(())
}
