//! Process command - pushes one alert through the pipeline.

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Deserialize;
use sn_core::{Alert, AlertSeverity, AuditResult, PipelineOutcome};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::pipeline::build_orchestrator;
use crate::OutputFormat;

/// Alert given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ProcessArgs {
    pub source: Option<String>,
    pub severity: Option<String>,
    pub message: Option<String>,
    /// `key=value` pairs; values that parse as JSON keep their type.
    pub metadata: Vec<String>,
    /// JSON file holding the alert.
    pub file: Option<PathBuf>,
}

/// Alert as written in a JSON file. `id` and `timestamp` are assigned on load.
#[derive(Debug, Deserialize)]
struct AlertInput {
    source: String,
    severity: AlertSeverity,
    message: String,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

impl AlertInput {
    fn into_alert(self) -> Alert {
        let mut alert = Alert::new(self.source, self.severity, self.message);
        alert.metadata = self.metadata;
        alert
    }
}

pub async fn cmd_process(config: AppConfig, args: ProcessArgs, format: OutputFormat) -> Result<()> {
    let alert = build_alert(&args)?;
    let orchestrator = build_orchestrator(&config).await?;

    let outcome = orchestrator
        .process_alert(alert)
        .await
        .context("Alert processing failed; no audit record was written")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome.details)?),
        OutputFormat::Text => print_outcome(&outcome),
    }
    Ok(())
}

fn build_alert(args: &ProcessArgs) -> Result<Alert> {
    if let Some(path) = &args.file {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alert file: {}", path.display()))?;
        let input: AlertInput = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse alert file: {}", path.display()))?;
        let mut alert = input.into_alert();
        for (key, value) in parse_metadata(&args.metadata)? {
            alert.metadata.insert(key, value);
        }
        return Ok(alert);
    }

    let Some(message) = &args.message else {
        bail!("either --message or --file is required");
    };
    let severity = match &args.severity {
        Some(s) => s.parse::<AlertSeverity>().map_err(anyhow::Error::msg)?,
        None => AlertSeverity::Warning,
    };
    let source = args.source.clone().unwrap_or_else(|| "cli".to_string());

    let mut alert = Alert::new(source, severity, message.clone());
    for (key, value) in parse_metadata(&args.metadata)? {
        alert = alert.with_metadata(key, value);
    }
    Ok(alert)
}

fn parse_metadata(pairs: &[String]) -> Result<Vec<(String, serde_json::Value)>> {
    pairs
        .iter()
        .map(|pair| {
            let (key, raw) = pair
                .split_once('=')
                .with_context(|| format!("metadata must be key=value, got '{}'", pair))?;
            if key.trim().is_empty() {
                bail!("metadata key is empty in '{}'", pair);
            }
            let value = serde_json::from_str(raw)
                .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
            Ok((key.trim().to_string(), value))
        })
        .collect()
}

fn print_outcome(outcome: &PipelineOutcome) {
    let details = &outcome.details;
    let result = match details.result {
        AuditResult::Executed => details.result.as_str().green().bold(),
        AuditResult::PendingApproval => details.result.as_str().yellow().bold(),
        AuditResult::Failed => details.result.as_str().red().bold(),
    };

    println!("{}", "Alert Processed".bold());
    println!("───────────────");
    println!("Alert:       {} [{}] {}", details.alert.source, details.alert.severity, details.alert.message);
    println!("Root cause:  {}", details.diagnosis.root_cause);
    println!("Confidence:  {:.2}", details.diagnosis.confidence);
    if !details.diagnosis.alternative_hypotheses.is_empty() {
        println!("Alternatives: {}", details.diagnosis.alternative_hypotheses.join("; "));
    }
    println!("Action:      {} ({})", details.plan.action_type, details.plan.risk_level);
    println!("Result:      {}", result);
    println!("Audit ID:    {}", outcome.audit_event_id);
}
