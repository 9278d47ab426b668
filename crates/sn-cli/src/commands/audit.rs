//! Audit command - shows the most recent audit records.

use anyhow::{Context, Result};
use colored::Colorize;
use sn_core::{AlertProcessedDetails, AuditResult};
use sn_observability::{tail_audit_events, AuditEvent};

use crate::config::AppConfig;
use crate::OutputFormat;

pub async fn cmd_audit(config: &AppConfig, last: usize, format: OutputFormat) -> Result<()> {
    let path = &config.audit.file_path;
    let events = tail_audit_events(path, last)
        .await
        .with_context(|| format!("Failed to read audit trail: {}", path.display()))?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No audit records in {}", path.display());
        return Ok(());
    }

    println!("{}", format!("Last {} audit record(s), newest first", events.len()).bold());
    for event in &events {
        println!("{}", summarize(event));
    }
    Ok(())
}

fn summarize(event: &AuditEvent) -> String {
    let timestamp = event.timestamp.format("%Y-%m-%d %H:%M:%S");
    match AlertProcessedDetails::from_event(event) {
        Ok(details) => {
            let result = match details.result {
                AuditResult::Executed => details.result.as_str().green(),
                AuditResult::PendingApproval => details.result.as_str().yellow(),
                AuditResult::Failed => details.result.as_str().red(),
            };
            format!(
                "{}  {:<16}  {:<20}  {:<19}  {}",
                timestamp, result, details.alert.source, details.plan.action_type, details.diagnosis.root_cause
            )
        }
        Err(_) => format!("{}  {} / {}", timestamp, event.component, event.event),
    }
}
