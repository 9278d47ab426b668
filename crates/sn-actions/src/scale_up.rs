//! Scale-up action.
//!
//! Grows the affected scaling group by one instance.

use crate::registry::{ActionContext, ActionError, ActionHandler, ActionResult, SimulatedEffect};
use async_trait::async_trait;
use chrono::Utc;
use sn_core::ActionType;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Instances added per scale-up.
pub const SCALE_STEP: u32 = 1;

/// Action to add capacity to a scaling group.
pub struct ScaleUpAction {
    effect: SimulatedEffect,
}

impl ScaleUpAction {
    /// Creates a new scale up action.
    pub fn new(effect: SimulatedEffect) -> Self {
        Self { effect }
    }
}

#[async_trait]
impl ActionHandler for ScaleUpAction {
    fn action_type(&self) -> ActionType {
        ActionType::ScaleUp
    }

    fn name(&self) -> &str {
        "scale_up"
    }

    fn description(&self) -> &str {
        "Adds one instance to the affected scaling group"
    }

    #[instrument(skip(self, context), fields(plan_id = %context.plan_id))]
    async fn execute(&self, context: &ActionContext) -> Result<ActionResult, ActionError> {
        let started_at = Utc::now();
        info!(step = SCALE_STEP, "Updating scaling group");

        self.effect.apply().await?;

        let mut output = HashMap::new();
        output.insert("instances_added".to_string(), serde_json::json!(SCALE_STEP));

        Ok(ActionResult::success(
            context,
            &format!("Scaling group updated to +{} instance", SCALE_STEP),
            started_at,
            output,
        ))
    }
}
