//! # sn-core
//!
//! Alert-processing pipeline for Sentinel.
//!
//! This crate holds the domain model, the history boundary, context
//! enrichment, diagnosis, alert ingestion and the orchestrator that
//! sequences them. Risk policy and plan execution are reached through the
//! [`RiskPolicy`] and [`PlanExecutor`] seams.

pub mod audit;
pub mod diagnosis;
pub mod enrichment;
pub mod error;
pub mod history;
pub mod incident;
pub mod ingestion;
pub mod orchestrator;
pub mod remediation;
pub mod traits;

pub use audit::{AlertProcessedDetails, AuditResult, AUDIT_COMPONENT, AUDIT_EVENT_ALERT_PROCESSED};
pub use diagnosis::{
    DiagnosisEngine, DiagnosisError, DiagnosisStrategy, ReasoningEngine, Rule, RuleCondition,
    RuleEngine, RuleSet,
};
pub use enrichment::{ContextEnricher, EnrichedContext, EnrichmentConfig};
pub use error::ErrorKind;
pub use history::{HistoryError, HistoryStore, InMemoryHistoryStore};
#[cfg(feature = "database")]
pub use history::{SqliteAuditSink, SqliteHistoryStore};
pub use incident::{Alert, AlertSeverity, Incident, IncidentStatus};
pub use ingestion::{alert_channel, AlertReceiver, AlertSender, AlertSimulator};
pub use orchestrator::{Orchestrator, OrchestratorError, OrchestratorStats, PipelineOutcome};
pub use remediation::{
    ActionType, Diagnosis, PlanStatus, PlanTransitionError, RemediationPlan, RiskLevel,
};
pub use traits::{PlanExecutor, RiskPolicy};
