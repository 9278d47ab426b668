//! Cache clearing action.

use crate::registry::{ActionContext, ActionError, ActionHandler, ActionResult, SimulatedEffect};
use async_trait::async_trait;
use chrono::Utc;
use sn_core::ActionType;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Action to clear application caches through their admin API.
pub struct ClearCacheAction {
    effect: SimulatedEffect,
}

impl ClearCacheAction {
    pub fn new(effect: SimulatedEffect) -> Self {
        Self { effect }
    }
}

#[async_trait]
impl ActionHandler for ClearCacheAction {
    fn action_type(&self) -> ActionType {
        ActionType::ClearCache
    }

    fn name(&self) -> &str {
        "clear_cache"
    }

    fn description(&self) -> &str {
        "Clears application caches through the admin API"
    }

    #[instrument(skip(self, context), fields(plan_id = %context.plan_id))]
    async fn execute(&self, context: &ActionContext) -> Result<ActionResult, ActionError> {
        let started_at = Utc::now();
        info!("Clearing cache via API");

        self.effect.apply().await?;

        let mut output = HashMap::new();
        output.insert("transport".to_string(), serde_json::json!("api"));

        Ok(ActionResult::success(
            context,
            "Cache cleared via API",
            started_at,
            output,
        ))
    }
}
