//! Diagnosis and remediation plan models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// The closed set of remediation actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    RestartService,
    ClearCache,
    ScaleUp,
    BlockIp,
    Notification,
    ManualIntervention,
}

impl ActionType {
    /// Every action type, in declaration order.
    pub const ALL: [ActionType; 6] = [
        ActionType::RestartService,
        ActionType::ClearCache,
        ActionType::ScaleUp,
        ActionType::BlockIp,
        ActionType::Notification,
        ActionType::ManualIntervention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::RestartService => "RESTART_SERVICE",
            ActionType::ClearCache => "CLEAR_CACHE",
            ActionType::ScaleUp => "SCALE_UP",
            ActionType::BlockIp => "BLOCK_IP",
            ActionType::Notification => "NOTIFICATION",
            ActionType::ManualIntervention => "MANUAL_INTERVENTION",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionType::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action type: {}", s))
    }
}

/// Risk classification of an action. Ordered `Safe < Moderate < Critical`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Safe,
    Moderate,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SAFE" => Ok(RiskLevel::Safe),
            "MODERATE" => Ok(RiskLevel::Moderate),
            "CRITICAL" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

/// Lifecycle status of a remediation plan.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanStatus {
    Pending,
    Approved,
    Executed,
    Failed,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Pending => "PENDING",
            PlanStatus::Approved => "APPROVED",
            PlanStatus::Executed => "EXECUTED",
            PlanStatus::Failed => "FAILED",
        }
    }

    /// Executed and failed plans never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Executed | PlanStatus::Failed)
    }

    /// Whether `self -> to` is an edge of the lifecycle graph.
    pub fn can_transition_to(&self, to: PlanStatus) -> bool {
        matches!(
            (self, to),
            (PlanStatus::Pending, PlanStatus::Approved)
                | (PlanStatus::Pending, PlanStatus::Executed)
                | (PlanStatus::Pending, PlanStatus::Failed)
                | (PlanStatus::Approved, PlanStatus::Executed)
                | (PlanStatus::Approved, PlanStatus::Failed)
        )
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PlanStatus::Pending),
            "APPROVED" => Ok(PlanStatus::Approved),
            "EXECUTED" => Ok(PlanStatus::Executed),
            "FAILED" => Ok(PlanStatus::Failed),
            other => Err(format!("unknown plan status: {}", other)),
        }
    }
}

/// A root-cause hypothesis for one alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub alert_id: Uuid,
    pub root_cause: String,
    /// Always within `[0.0, 1.0]`.
    pub confidence: f64,
    #[serde(default)]
    pub alternative_hypotheses: Vec<String>,
    #[serde(default)]
    pub reasoning_trace: String,
    /// Ordered by preference; may be empty.
    #[serde(default)]
    pub suggested_actions: Vec<ActionType>,
}

impl Diagnosis {
    /// Root cause reported when nothing explains the alert.
    pub const UNKNOWN_ROOT_CAUSE: &'static str = "Unknown Anomaly";

    /// The diagnosis for an alert nothing matched: zero confidence, hand it to a human.
    pub fn unknown(alert_id: Uuid) -> Self {
        Self {
            alert_id,
            root_cause: Self::UNKNOWN_ROOT_CAUSE.to_string(),
            confidence: 0.0,
            alternative_hypotheses: Vec::new(),
            reasoning_trace: "No diagnostic rule matched the alert".to_string(),
            suggested_actions: vec![ActionType::ManualIntervention],
        }
    }
}

/// Error returned when a plan is moved along an edge the lifecycle forbids.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid plan transition for {plan_id}: {from} -> {to}")]
pub struct PlanTransitionError {
    pub plan_id: Uuid,
    pub from: PlanStatus,
    pub to: PlanStatus,
}

/// A single chosen, risk-classified remediation action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationPlan {
    pub id: Uuid,
    pub diagnosis: Diagnosis,
    pub action_type: ActionType,
    pub risk_level: RiskLevel,
    pub requires_approval: bool,
    pub status: PlanStatus,
}

impl RemediationPlan {
    /// Creates a pending plan.
    pub fn new(
        diagnosis: Diagnosis,
        action_type: ActionType,
        risk_level: RiskLevel,
        requires_approval: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            diagnosis,
            action_type,
            risk_level,
            requires_approval,
            status: PlanStatus::Pending,
        }
    }

    /// Whether the executor may run this plan now.
    pub fn is_cleared_for_execution(&self) -> bool {
        !self.requires_approval || self.status == PlanStatus::Approved
    }

    /// Records an operator approval.
    pub fn approve(&mut self) -> Result<(), PlanTransitionError> {
        self.transition(PlanStatus::Approved)
    }

    pub fn mark_executed(&mut self) -> Result<(), PlanTransitionError> {
        self.transition(PlanStatus::Executed)
    }

    pub fn mark_failed(&mut self) -> Result<(), PlanTransitionError> {
        self.transition(PlanStatus::Failed)
    }

    fn transition(&mut self, to: PlanStatus) -> Result<(), PlanTransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(PlanTransitionError {
                plan_id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnosis() -> Diagnosis {
        Diagnosis {
            alert_id: Uuid::new_v4(),
            root_cause: "Disk /var/log nearly full".to_string(),
            confidence: 1.0,
            alternative_hypotheses: vec!["log rotation stalled".to_string()],
            reasoning_trace: "matched rule Disk Space".to_string(),
            suggested_actions: vec![ActionType::ClearCache, ActionType::Notification],
        }
    }

    #[test]
    fn test_action_type_wire_names() {
        for action in ActionType::ALL {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
            assert_eq!(action.as_str().parse::<ActionType>(), Ok(action));
        }
        assert!("REBOOT_DATACENTER".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_risk_order() {
        assert!(RiskLevel::Safe < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::Critical);
    }

    #[test]
    fn test_unknown_diagnosis() {
        let id = Uuid::new_v4();
        let d = Diagnosis::unknown(id);
        assert_eq!(d.alert_id, id);
        assert_eq!(d.root_cause, "Unknown Anomaly");
        assert_eq!(d.confidence, 0.0);
        assert_eq!(d.suggested_actions, vec![ActionType::ManualIntervention]);
    }

    #[test]
    fn test_new_plan_is_pending() {
        let plan = RemediationPlan::new(diagnosis(), ActionType::ClearCache, RiskLevel::Safe, false);
        assert_eq!(plan.status, PlanStatus::Pending);
        assert!(plan.is_cleared_for_execution());
    }

    #[test]
    fn test_approval_path() {
        let mut plan =
            RemediationPlan::new(diagnosis(), ActionType::RestartService, RiskLevel::Moderate, true);
        assert!(!plan.is_cleared_for_execution());

        plan.approve().unwrap();
        assert!(plan.is_cleared_for_execution());
        plan.mark_executed().unwrap();
        assert_eq!(plan.status, PlanStatus::Executed);
    }

    #[test]
    fn test_direct_pending_to_failed() {
        let mut plan = RemediationPlan::new(diagnosis(), ActionType::ScaleUp, RiskLevel::Moderate, false);
        plan.mark_failed().unwrap();
        assert_eq!(plan.status, PlanStatus::Failed);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut plan = RemediationPlan::new(diagnosis(), ActionType::ClearCache, RiskLevel::Safe, false);
        plan.mark_executed().unwrap();

        let err = plan.mark_failed().unwrap_err();
        assert_eq!(err.from, PlanStatus::Executed);
        assert_eq!(err.to, PlanStatus::Failed);
        assert!(plan.approve().is_err());
        assert_eq!(plan.status, PlanStatus::Executed);
    }

    #[test]
    fn test_cannot_approve_twice() {
        let mut plan =
            RemediationPlan::new(diagnosis(), ActionType::BlockIp, RiskLevel::Moderate, true);
        plan.approve().unwrap();
        assert!(plan.approve().is_err());
    }

    #[test]
    fn test_plan_round_trips_through_json() {
        let plan = RemediationPlan::new(diagnosis(), ActionType::ClearCache, RiskLevel::Safe, false);
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains("\"CLEAR_CACHE\""));
        assert!(json.contains("\"PENDING\""));
        let decoded: RemediationPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, plan);
    }

    #[test]
    fn test_confidence_keeps_every_bit() {
        for confidence in [0.9856906946328695, 0.1 + 0.2, 1.0 / 3.0, f64::MIN_POSITIVE] {
            let original = Diagnosis {
                confidence,
                ..diagnosis()
            };
            let json = serde_json::to_string(&original).unwrap();
            let decoded: Diagnosis = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded.confidence.to_bits(), confidence.to_bits(), "{}", json);
        }
    }
}
