//! Create ticket action.
//!
//! Hands the incident to a human by opening a ticket in the tracker.

use crate::registry::{ActionContext, ActionError, ActionHandler, ActionResult, SimulatedEffect};
use async_trait::async_trait;
use chrono::Utc;
use sn_core::ActionType;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Action to open a manual-intervention ticket.
pub struct CreateTicketAction {
    effect: SimulatedEffect,
}

impl CreateTicketAction {
    /// Creates a new create ticket action.
    pub fn new(effect: SimulatedEffect) -> Self {
        Self { effect }
    }
}

#[async_trait]
impl ActionHandler for CreateTicketAction {
    fn action_type(&self) -> ActionType {
        ActionType::ManualIntervention
    }

    fn name(&self) -> &str {
        "create_ticket"
    }

    fn description(&self) -> &str {
        "Creates a ticket in the issue tracker for manual intervention"
    }

    #[instrument(skip(self, context), fields(plan_id = %context.plan_id))]
    async fn execute(&self, context: &ActionContext) -> Result<ActionResult, ActionError> {
        let started_at = Utc::now();
        let title = format!("Manual intervention: {}", context.root_cause);
        info!(title = %title, "Creating ticket");

        self.effect.apply().await?;

        let mut output = HashMap::new();
        output.insert("title".to_string(), serde_json::json!(title));
        output.insert("tracker".to_string(), serde_json::json!("jira"));
        output.insert(
            "alert_id".to_string(),
            serde_json::json!(context.alert_id.to_string()),
        );

        Ok(ActionResult::success(
            context,
            "Ticket created in Jira",
            started_at,
            output,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sn_core::{Diagnosis, RemediationPlan, RiskLevel};
    use uuid::Uuid;

    #[tokio::test]
    async fn test_create_ticket() {
        let plan = RemediationPlan::new(
            Diagnosis::unknown(Uuid::new_v4()),
            ActionType::ManualIntervention,
            RiskLevel::Critical,
            true,
        );
        let action = CreateTicketAction::new(SimulatedEffect::default());

        let result = action
            .execute(&ActionContext::from_plan(&plan))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.output["title"], "Manual intervention: Unknown Anomaly");
        assert_eq!(result.output["tracker"], "jira");
    }
}
