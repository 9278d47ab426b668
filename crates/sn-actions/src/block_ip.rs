//! Firewall block action.

use crate::registry::{ActionContext, ActionError, ActionHandler, ActionResult, SimulatedEffect};
use async_trait::async_trait;
use chrono::Utc;
use sn_core::ActionType;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Action to add a deny rule at the perimeter firewall.
pub struct BlockIpAction {
    effect: SimulatedEffect,
}

impl BlockIpAction {
    /// Creates a new block IP action.
    pub fn new(effect: SimulatedEffect) -> Self {
        Self { effect }
    }
}

#[async_trait]
impl ActionHandler for BlockIpAction {
    fn action_type(&self) -> ActionType {
        ActionType::BlockIp
    }

    fn name(&self) -> &str {
        "block_ip"
    }

    fn description(&self) -> &str {
        "Adds a deny rule for the offending address to the firewall"
    }

    #[instrument(skip(self, context), fields(plan_id = %context.plan_id))]
    async fn execute(&self, context: &ActionContext) -> Result<ActionResult, ActionError> {
        let started_at = Utc::now();
        info!("Adding firewall rule");

        self.effect.apply().await?;

        let mut output = HashMap::new();
        output.insert("rule".to_string(), serde_json::json!("deny"));
        output.insert(
            "reason".to_string(),
            serde_json::json!(context.root_cause.clone()),
        );

        Ok(ActionResult::success(
            context,
            "Firewall rule added",
            started_at,
            output,
        ))
    }
}
