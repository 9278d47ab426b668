//! Risk policy evaluation.
//!
//! | Action | Risk |
//! |---|---|
//! | NOTIFICATION, CLEAR_CACHE | SAFE |
//! | SCALE_UP, RESTART_SERVICE, BLOCK_IP | MODERATE |
//! | MANUAL_INTERVENTION | CRITICAL |
//!
//! SAFE never needs approval, CRITICAL always does, and MODERATE follows
//! [`PolicyConfig::auto_approve_moderate`].

use crate::config::PolicyConfig;
use sn_core::{ActionType, Diagnosis, RemediationPlan, RiskLevel, RiskPolicy};
use tracing::{debug, instrument};

/// Fixed risk of an action type.
pub fn risk_for(action: ActionType) -> RiskLevel {
    match action {
        ActionType::Notification | ActionType::ClearCache => RiskLevel::Safe,
        ActionType::ScaleUp | ActionType::RestartService | ActionType::BlockIp => {
            RiskLevel::Moderate
        }
        ActionType::ManualIntervention => RiskLevel::Critical,
    }
}

/// Approval gate for a risk level.
pub fn requires_approval(risk: RiskLevel, config: &PolicyConfig) -> bool {
    match risk {
        RiskLevel::Safe => false,
        RiskLevel::Moderate => !config.auto_approve_moderate,
        RiskLevel::Critical => true,
    }
}

/// Maps diagnoses to risk-classified, PENDING plans.
#[derive(Debug, Clone, Default)]
pub struct RiskPolicyEvaluator {
    config: PolicyConfig,
}

impl RiskPolicyEvaluator {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// First suggested action, or MANUAL_INTERVENTION when there is none.
    pub fn select_action(diagnosis: &Diagnosis) -> ActionType {
        diagnosis
            .suggested_actions
            .first()
            .copied()
            .unwrap_or(ActionType::ManualIntervention)
    }
}

impl RiskPolicy for RiskPolicyEvaluator {
    #[instrument(skip(self, diagnosis), fields(alert_id = %diagnosis.alert_id))]
    fn evaluate_risk(&self, diagnosis: Diagnosis) -> RemediationPlan {
        let action = Self::select_action(&diagnosis);
        let risk = risk_for(action);
        let approval = requires_approval(risk, &self.config);

        debug!(
            action = %action,
            risk_level = %risk,
            requires_approval = approval,
            "Risk evaluated"
        );

        RemediationPlan::new(diagnosis, action, risk, approval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sn_core::{Alert, AlertSeverity, PlanStatus};

    fn diagnosis_with(actions: Vec<ActionType>) -> Diagnosis {
        let alert = Alert::new("web-01", AlertSeverity::Warning, "test");
        let mut d = Diagnosis::unknown(alert.id);
        d.suggested_actions = actions;
        d
    }

    #[test]
    fn test_risk_table_is_total() {
        for action in ActionType::ALL {
            let expected = match action {
                ActionType::Notification | ActionType::ClearCache => RiskLevel::Safe,
                ActionType::ManualIntervention => RiskLevel::Critical,
                _ => RiskLevel::Moderate,
            };
            assert_eq!(risk_for(action), expected, "{}", action);
        }
    }

    #[test]
    fn test_approval_gate_for_every_action_and_setting() {
        for auto in [true, false] {
            let evaluator = RiskPolicyEvaluator::new(PolicyConfig {
                auto_approve_moderate: auto,
            });
            for action in ActionType::ALL {
                let plan = evaluator.evaluate_risk(diagnosis_with(vec![action]));
                let expected = match plan.risk_level {
                    RiskLevel::Safe => false,
                    RiskLevel::Moderate => !auto,
                    RiskLevel::Critical => true,
                };
                assert_eq!(plan.requires_approval, expected, "{} auto={}", action, auto);
                assert_eq!(plan.action_type, action);
                assert_eq!(plan.status, PlanStatus::Pending);
            }
        }
    }

    #[test]
    fn test_first_suggestion_is_chosen() {
        let plan = RiskPolicyEvaluator::default().evaluate_risk(diagnosis_with(vec![
            ActionType::ClearCache,
            ActionType::RestartService,
        ]));
        assert_eq!(plan.action_type, ActionType::ClearCache);
        assert_eq!(plan.risk_level, RiskLevel::Safe);
        assert!(!plan.requires_approval);
    }

    #[test]
    fn test_empty_suggestions_escalate_to_manual() {
        let plan = RiskPolicyEvaluator::default().evaluate_risk(diagnosis_with(vec![]));
        assert_eq!(plan.action_type, ActionType::ManualIntervention);
        assert_eq!(plan.risk_level, RiskLevel::Critical);
        assert!(plan.requires_approval);
    }

    #[test]
    fn test_plan_carries_diagnosis() {
        let diagnosis = diagnosis_with(vec![ActionType::ScaleUp]);
        let plan = RiskPolicyEvaluator::default().evaluate_risk(diagnosis.clone());
        assert_eq!(plan.diagnosis, diagnosis);
        assert!(!plan.requires_approval);
    }
}
