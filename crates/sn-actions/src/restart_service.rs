//! Service restart action.
//!
//! Restarts the affected service over SSH. The transport is simulated.

use crate::registry::{ActionContext, ActionError, ActionHandler, ActionResult, SimulatedEffect};
use async_trait::async_trait;
use chrono::Utc;
use sn_core::ActionType;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Action to restart the service behind an alert.
pub struct RestartServiceAction {
    effect: SimulatedEffect,
}

impl RestartServiceAction {
    /// Creates a new restart service action.
    pub fn new(effect: SimulatedEffect) -> Self {
        Self { effect }
    }
}

#[async_trait]
impl ActionHandler for RestartServiceAction {
    fn action_type(&self) -> ActionType {
        ActionType::RestartService
    }

    fn name(&self) -> &str {
        "restart_service"
    }

    fn description(&self) -> &str {
        "Restarts the affected service over SSH"
    }

    #[instrument(skip(self, context), fields(plan_id = %context.plan_id))]
    async fn execute(&self, context: &ActionContext) -> Result<ActionResult, ActionError> {
        let started_at = Utc::now();
        info!(root_cause = %context.root_cause, "Restarting service via SSH");

        self.effect.apply().await?;

        let mut output = HashMap::new();
        output.insert("transport".to_string(), serde_json::json!("ssh"));
        output.insert(
            "alert_id".to_string(),
            serde_json::json!(context.alert_id.to_string()),
        );

        Ok(ActionResult::success(
            context,
            "Service restarted successfully via SSH",
            started_at,
            output,
        ))
    }
}
