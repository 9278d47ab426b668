//! Sentinel CLI
//!
//! Command-line interface for the Sentinel alert triage pipeline.

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;
mod pipeline;
mod validator;

use commands::{cmd_audit, cmd_process, cmd_run, ProcessArgs, RunOverrides};
use config::AppConfig;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(version)]
#[command(about = "Automated triage and remediation of infrastructure alerts", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pipeline on simulated alerts until Ctrl+C
    Run {
        /// Seconds between simulator ticks
        #[arg(long)]
        interval: Option<u64>,

        /// Seed for a reproducible alert sequence
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Push a single alert through the pipeline
    Process {
        /// Alert source (service or host)
        #[arg(long)]
        source: Option<String>,

        /// Severity (INFO, WARNING, CRITICAL, FATAL)
        #[arg(long)]
        severity: Option<String>,

        /// Alert message
        #[arg(short, long)]
        message: Option<String>,

        /// Metadata entry as key=value (repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        metadata: Vec<String>,

        /// Read the alert from a JSON file
        #[arg(short, long, conflicts_with_all = ["source", "severity", "message"])]
        file: Option<PathBuf>,
    },

    /// Show the most recent audit records
    Audit {
        /// Number of records to show
        #[arg(long, default_value = "10")]
        last: usize,
    },

    /// Validate configuration
    Validate,

    /// Show current configuration
    Config {
        /// Show secrets (redacted by default)
        #[arg(long)]
        show_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::resolve(cli.config.as_deref())?;

    let logging = if cli.verbose {
        sn_observability::LoggingConfig::verbose()
    } else {
        sn_observability::LoggingConfig::default().with_level_name(&config.logging.level)
    };
    sn_observability::init_logging_with_config(logging.with_json(config.logging.json));

    match cli.command {
        Commands::Run { interval, seed } => {
            cmd_run(
                config,
                RunOverrides {
                    interval_secs: interval,
                    seed,
                },
            )
            .await
        }
        Commands::Process {
            source,
            severity,
            message,
            metadata,
            file,
        } => {
            cmd_process(
                config,
                ProcessArgs {
                    source,
                    severity,
                    message,
                    metadata,
                    file,
                },
                cli.format,
            )
            .await
        }
        Commands::Audit { last } => cmd_audit(&config, last, cli.format).await,
        Commands::Validate => cmd_validate(&config, cli.config.as_deref()),
        Commands::Config { show_secrets } => cmd_config(&config, show_secrets, cli.format),
    }
}

fn cmd_validate(config: &AppConfig, path: Option<&std::path::Path>) -> Result<()> {
    let source = path
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults and environment".to_string());
    println!("{} {}", "Validating configuration:".cyan(), source);

    let result = config.validate();
    result.print();

    if result.has_errors() {
        println!();
        anyhow::bail!(
            "configuration has {} error(s)",
            result.errors.len()
        );
    }

    println!();
    println!("{}", "Configuration is valid.".green().bold());
    Ok(())
}

fn cmd_config(config: &AppConfig, show_secrets: bool, format: OutputFormat) -> Result<()> {
    let config = if show_secrets {
        config.clone()
    } else {
        config.redact_secrets()
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => print!("{}", serde_yaml::to_string(&config)?),
    }
    Ok(())
}
