//! Run command - feeds simulated alerts through the pipeline until Ctrl-C.

use anyhow::{Context, Result};
use colored::Colorize;
use sn_core::{alert_channel, AlertSimulator};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::pipeline::build_orchestrator;

/// Command-line adjustments to the ingestion settings.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub interval_secs: Option<u64>,
    pub seed: Option<u64>,
}

pub async fn cmd_run(mut config: AppConfig, overrides: RunOverrides) -> Result<()> {
    if let Some(interval) = overrides.interval_secs {
        config.ingestion.interval_secs = interval;
    }
    if let Some(seed) = overrides.seed {
        config.ingestion.seed = Some(seed);
    }

    let validation = config.validate();
    if validation.has_errors() {
        validation.print();
        anyhow::bail!("refusing to start with {} configuration error(s)", validation.errors.len());
    }

    let orchestrator = Arc::new(build_orchestrator(&config).await?);

    let ingestion = &config.ingestion;
    let mut simulator = AlertSimulator::new(Duration::from_secs(ingestion.interval_secs))
        .with_probability(ingestion.emission_probability);
    if let Some(seed) = ingestion.seed {
        simulator = simulator.with_seed(seed);
    }

    let (sender, receiver) = alert_channel(ingestion.channel_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    println!("{}", "Starting Sentinel...".green().bold());
    println!("Audit trail: {}", config.audit.file_path.display());
    println!(
        "Simulating alerts every {}s (p={:.2})",
        ingestion.interval_secs, ingestion.emission_probability
    );
    println!("Press Ctrl+C to stop");

    let producer = tokio::spawn(simulator.run(sender, shutdown_rx.clone()));
    let consumer = tokio::spawn(Arc::clone(&orchestrator).run(receiver, shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    println!("\n{}", "Shutting down...".yellow());
    let _ = shutdown_tx.send(true);

    let emitted = producer.await.context("Alert simulator task failed")?;
    let stats = consumer.await.context("Orchestrator task failed")?;

    println!();
    println!("{}", "Session Summary".bold());
    println!("───────────────");
    println!("Alerts emitted:    {}", emitted);
    println!("Alerts processed:  {}", stats.alerts_received);
    println!("Executed:          {}", stats.executed.to_string().green());
    println!("Pending approval:  {}", stats.pending_approval.to_string().yellow());
    println!("Failed:            {}", stats.failed.to_string().red());
    println!("Errors:            {}", stats.errors.to_string().red());

    Ok(())
}
