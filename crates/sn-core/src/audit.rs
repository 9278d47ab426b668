//! Audit record assembled for each processed alert.

use crate::incident::{Alert, IncidentStatus};
use crate::remediation::{Diagnosis, RemediationPlan};
use serde::{Deserialize, Serialize};
use sn_observability::{AuditError, AuditEvent};
use std::fmt;

/// Component name stamped on pipeline audit events.
pub const AUDIT_COMPONENT: &str = "Orchestrator";
/// Event name stamped on pipeline audit events.
pub const AUDIT_EVENT_ALERT_PROCESSED: &str = "AlertProcessed";

/// Branch the orchestrator took for an alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditResult {
    Executed,
    Failed,
    PendingApproval,
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Executed => "EXECUTED",
            AuditResult::Failed => "FAILED",
            AuditResult::PendingApproval => "PENDING_APPROVAL",
        }
    }

    /// Incident status recorded in history for this outcome.
    pub fn incident_status(&self) -> IncidentStatus {
        match self {
            AuditResult::Executed => IncidentStatus::Closed,
            AuditResult::PendingApproval => IncidentStatus::Mitigating,
            AuditResult::Failed => IncidentStatus::Open,
        }
    }
}

impl fmt::Display for AuditResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full snapshot of one pipeline run, stored as the audit event's details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertProcessedDetails {
    pub alert: Alert,
    pub diagnosis: Diagnosis,
    pub plan: RemediationPlan,
    pub result: AuditResult,
}

impl AlertProcessedDetails {
    /// Wraps the snapshot in a fresh audit event.
    pub fn to_event(&self) -> Result<AuditEvent, AuditError> {
        Ok(AuditEvent::new(
            AUDIT_COMPONENT,
            AUDIT_EVENT_ALERT_PROCESSED,
            serde_json::to_value(self)?,
        ))
    }

    /// Decodes the snapshot from an `AlertProcessed` event.
    pub fn from_event(event: &AuditEvent) -> Result<Self, AuditError> {
        Ok(serde_json::from_value(event.details.clone())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::AlertSeverity;
    use crate::remediation::{ActionType, RiskLevel};

    fn details() -> AlertProcessedDetails {
        let alert = Alert::new("db-primary", AlertSeverity::Warning, "Disk space low (/var/log)")
            .with_metadata("mount", "/var/log");
        let diagnosis = Diagnosis {
            alert_id: alert.id,
            root_cause: "Disk /var/log nearly full".to_string(),
            confidence: 1.0,
            alternative_hypotheses: vec![],
            reasoning_trace: "Matched rule 'Disk Space'".to_string(),
            suggested_actions: vec![ActionType::ClearCache, ActionType::Notification],
        };
        let mut plan =
            RemediationPlan::new(diagnosis.clone(), ActionType::ClearCache, RiskLevel::Safe, false);
        plan.mark_executed().unwrap();
        AlertProcessedDetails {
            alert,
            diagnosis,
            plan,
            result: AuditResult::Executed,
        }
    }

    #[test]
    fn test_result_wire_names() {
        assert_eq!(
            serde_json::to_string(&AuditResult::PendingApproval).unwrap(),
            "\"PENDING_APPROVAL\""
        );
        assert_eq!(
            serde_json::to_string(&AuditResult::Executed).unwrap(),
            "\"EXECUTED\""
        );
    }

    #[test]
    fn test_event_shape() {
        let event = details().to_event().unwrap();
        assert_eq!(event.component, "Orchestrator");
        assert_eq!(event.event, "AlertProcessed");
        for key in ["alert", "diagnosis", "plan", "result"] {
            assert!(event.details.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(event.details["result"], "EXECUTED");
        assert_eq!(event.details["plan"]["risk_level"], "SAFE");
    }

    #[test]
    fn test_snapshot_survives_jsonl() {
        let details = details();
        let event = details.to_event().unwrap();
        let line = event.to_json_line().unwrap();
        let decoded = AuditEvent::from_json_line(&line).unwrap();

        assert_eq!(decoded, event);
        assert_eq!(AlertProcessedDetails::from_event(&decoded).unwrap(), details);
    }

    #[test]
    fn test_confidence_survives_jsonl_exactly() {
        let mut details = details();
        details.diagnosis.confidence = 0.9856906946328695;
        details.plan.diagnosis.confidence = 0.9856906946328695;

        let line = details.to_event().unwrap().to_json_line().unwrap();
        let decoded = AuditEvent::from_json_line(&line).unwrap();
        let restored = AlertProcessedDetails::from_event(&decoded).unwrap();

        assert_eq!(
            restored.diagnosis.confidence.to_bits(),
            0.9856906946328695f64.to_bits()
        );
        assert_eq!(restored, details);
    }

    #[test]
    fn test_incident_status_mapping() {
        assert_eq!(AuditResult::Executed.incident_status(), IncidentStatus::Closed);
        assert_eq!(
            AuditResult::PendingApproval.incident_status(),
            IncidentStatus::Mitigating
        );
        assert_eq!(AuditResult::Failed.incident_status(), IncidentStatus::Open);
    }
}
