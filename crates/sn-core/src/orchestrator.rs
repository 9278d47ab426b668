//! Alert-processing orchestrator.
//!
//! Each alert runs `Enrich -> Diagnose -> EvaluateRisk -> Decide -> Audit`
//! exactly once. The decision branches only on `requires_approval`: plans
//! that need approval are recorded as PENDING_APPROVAL and never reach the
//! executor.
//!
//! A stage failure abandons the alert before the audit write, so a run
//! yields either one complete audit event or none. The processing loop
//! survives per-alert failures, including panics inside a stage.

use crate::audit::{AlertProcessedDetails, AuditResult};
use crate::diagnosis::{DiagnosisEngine, DiagnosisError};
use crate::enrichment::ContextEnricher;
use crate::history::HistoryStore;
use crate::incident::{Alert, Incident};
use crate::ingestion::AlertReceiver;
use crate::traits::{PlanExecutor, RiskPolicy};
use sn_observability::{AuditError, AuditSink, PipelineMetrics};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Errors that abandon a single alert's run.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Diagnosis failed: {0}")]
    Diagnosis(#[from] DiagnosisError),

    #[error("Audit write failed: {0}")]
    Audit(#[from] AuditError),

    #[error("Pipeline task aborted: {0}")]
    Aborted(String),
}

impl OrchestratorError {
    /// Stage label used in logs and metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            OrchestratorError::Diagnosis(_) => "diagnosis",
            OrchestratorError::Audit(_) => "audit",
            OrchestratorError::Aborted(_) => "aborted",
        }
    }
}

/// Counters kept across the processing loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorStats {
    /// Alerts taken off the channel.
    pub alerts_received: u64,
    /// Runs audited as EXECUTED.
    pub executed: u64,
    /// Runs audited as FAILED.
    pub failed: u64,
    /// Runs audited as PENDING_APPROVAL.
    pub pending_approval: u64,
    /// Runs abandoned without an audit record.
    pub errors: u64,
}

impl OrchestratorStats {
    /// Runs that produced an audit record.
    pub fn audited(&self) -> u64 {
        self.executed + self.failed + self.pending_approval
    }
}

/// Outcome of one completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    /// ID of the audit event written for the run.
    pub audit_event_id: Uuid,
    pub details: AlertProcessedDetails,
}

/// Sequences the pipeline stages for each alert.
pub struct Orchestrator {
    enricher: ContextEnricher,
    diagnosis: Arc<dyn DiagnosisEngine>,
    policy: Arc<dyn RiskPolicy>,
    executor: Arc<dyn PlanExecutor>,
    audit: Arc<dyn AuditSink>,
    recorder: Option<Arc<dyn HistoryStore>>,
    stats: Arc<RwLock<OrchestratorStats>>,
}

impl Orchestrator {
    pub fn new(
        enricher: ContextEnricher,
        diagnosis: Arc<dyn DiagnosisEngine>,
        policy: Arc<dyn RiskPolicy>,
        executor: Arc<dyn PlanExecutor>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        PipelineMetrics::register();
        Self {
            enricher,
            diagnosis,
            policy,
            executor,
            audit,
            recorder: None,
            stats: Arc::new(RwLock::new(OrchestratorStats::default())),
        }
    }

    /// Records each audited run's incident and plan into `store`.
    pub fn with_history_recorder(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.recorder = Some(store);
        self
    }

    pub async fn stats(&self) -> OrchestratorStats {
        self.stats.read().await.clone()
    }

    /// Runs the full pipeline for one alert.
    #[instrument(skip(self, alert), fields(alert_id = %alert.id, source = %alert.source))]
    pub async fn process_alert(&self, alert: Alert) -> Result<PipelineOutcome, OrchestratorError> {
        let context = self.enricher.build(alert).await;

        let diagnosis = self.diagnosis.analyze(&context).await?;
        debug!(
            root_cause = %diagnosis.root_cause,
            confidence = diagnosis.confidence,
            engine = %self.diagnosis.name(),
            "Diagnosis ready"
        );

        let mut plan = self.policy.evaluate_risk(diagnosis.clone());

        let result = if plan.requires_approval {
            info!(
                plan_id = %plan.id,
                action = %plan.action_type,
                risk_level = %plan.risk_level,
                "Plan held for approval"
            );
            AuditResult::PendingApproval
        } else if self.executor.execute_action(&mut plan).await {
            AuditResult::Executed
        } else {
            AuditResult::Failed
        };

        let details = AlertProcessedDetails {
            alert: context.alert,
            diagnosis,
            plan,
            result,
        };

        let event = details.to_event()?;
        self.audit.log_event(&event).await?;

        info!(
            audit_id = %event.id,
            result = %result,
            action = %details.plan.action_type,
            "Alert processed"
        );

        self.record_history(&details).await;

        Ok(PipelineOutcome {
            audit_event_id: event.id,
            details,
        })
    }

    /// Saves the incident and plan for an audited run. Failures are logged only.
    async fn record_history(&self, details: &AlertProcessedDetails) {
        let Some(store) = &self.recorder else {
            return;
        };

        let mut incident = Incident::from_alert(&details.alert);
        incident.set_status(details.result.incident_status());

        if let Err(e) = store.save_incident(&incident).await {
            warn!(error = %e, "Failed to record incident history");
            return;
        }
        if let Err(e) = store.save_plan(&details.plan, incident.id).await {
            warn!(error = %e, plan_id = %details.plan.id, "Failed to record plan history");
        }
    }

    async fn record_outcome(&self, outcome: &Result<PipelineOutcome, OrchestratorError>) {
        let mut stats = self.stats.write().await;
        match outcome {
            Ok(outcome) => {
                match outcome.details.result {
                    AuditResult::Executed => stats.executed += 1,
                    AuditResult::Failed => stats.failed += 1,
                    AuditResult::PendingApproval => stats.pending_approval += 1,
                }
                PipelineMetrics::record_alert_processed(outcome.details.result.as_str());
            }
            Err(e) => {
                stats.errors += 1;
                PipelineMetrics::record_alert_failed(e.stage());
            }
        }
    }

    /// Drains `alerts` one at a time until shutdown or until the channel closes.
    ///
    /// Alerts are processed strictly in arrival order with no overlap. Each
    /// run is isolated on its own task so that a failing or panicking stage
    /// only loses that alert.
    pub async fn run(
        self: Arc<Self>,
        mut alerts: AlertReceiver,
        mut shutdown: watch::Receiver<bool>,
    ) -> OrchestratorStats {
        info!("Orchestrator loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let alert = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                next = alerts.recv() => match next {
                    Some(alert) => alert,
                    None => {
                        debug!("Alert channel closed");
                        break;
                    }
                },
            };

            let alert_id = alert.id;
            self.stats.write().await.alerts_received += 1;

            let this = Arc::clone(&self);
            let outcome = match tokio::spawn(async move { this.process_alert(alert).await }).await {
                Ok(outcome) => outcome,
                Err(join_error) => Err(OrchestratorError::Aborted(join_error.to_string())),
            };

            if let Err(e) = &outcome {
                error!(
                    alert_id = %alert_id,
                    stage = e.stage(),
                    error = %e,
                    "Alert processing failed, continuing with next alert"
                );
            }
            self.record_outcome(&outcome).await;
        }

        let stats = self.stats().await;
        info!(
            received = stats.alerts_received,
            executed = stats.executed,
            failed = stats.failed,
            pending_approval = stats.pending_approval,
            errors = stats.errors,
            "Orchestrator loop stopped"
        );
        stats
    }
}
