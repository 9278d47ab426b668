//! Notification action.
//!
//! Sends the diagnosis to the on-call channel (Slack and e-mail).

use crate::registry::{ActionContext, ActionError, ActionHandler, ActionResult, SimulatedEffect};
use async_trait::async_trait;
use chrono::Utc;
use sn_core::ActionType;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Channels a notification is fanned out to.
pub const NOTIFICATION_CHANNELS: [&str; 2] = ["slack", "email"];

/// Action to notify the on-call team.
pub struct NotifyAction {
    effect: SimulatedEffect,
}

impl NotifyAction {
    /// Creates a new notify action.
    pub fn new(effect: SimulatedEffect) -> Self {
        Self { effect }
    }

    fn render(context: &ActionContext) -> String {
        format!(
            "[{}] {} (confidence {:.2})",
            context.risk_level, context.root_cause, context.confidence
        )
    }
}

#[async_trait]
impl ActionHandler for NotifyAction {
    fn action_type(&self) -> ActionType {
        ActionType::Notification
    }

    fn name(&self) -> &str {
        "notify"
    }

    fn description(&self) -> &str {
        "Sends the diagnosis to the on-call team over Slack and e-mail"
    }

    #[instrument(skip(self, context), fields(plan_id = %context.plan_id))]
    async fn execute(&self, context: &ActionContext) -> Result<ActionResult, ActionError> {
        let started_at = Utc::now();
        let body = Self::render(context);
        info!(channels = ?NOTIFICATION_CHANNELS, "Sending notification");

        self.effect.apply().await?;

        let mut output = HashMap::new();
        output.insert(
            "channels".to_string(),
            serde_json::json!(NOTIFICATION_CHANNELS),
        );
        output.insert("body".to_string(), serde_json::json!(body));

        Ok(ActionResult::success(
            context,
            "Slack/Email sent",
            started_at,
            output,
        ))
    }
}
