//! Action handler trait and registry.
//!
//! Every [`ActionType`] is served by at most one [`ActionHandler`]. The
//! registry only stores and hands out handlers; gating, timeouts and plan
//! state live in [`crate::executor::ActionExecutor`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sn_core::{ActionType, ErrorKind, RemediationPlan, RiskLevel};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    BlockIpAction, ClearCacheAction, CreateTicketAction, NotifyAction, RestartServiceAction,
    ScaleUpAction,
};

/// Errors that can occur during action execution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timeout: action did not complete within {0} seconds")]
    Timeout(u64),
}

impl ActionError {
    /// Every action failure is an execution failure; none are retried.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Execution
    }
}

/// Result of an action execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Unique execution ID.
    pub execution_id: Uuid,
    pub plan_id: Uuid,
    pub action_type: ActionType,
    pub success: bool,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Handler-specific output data.
    pub output: HashMap<String, serde_json::Value>,
}

impl ActionResult {
    /// Creates a successful result.
    pub fn success(
        context: &ActionContext,
        message: &str,
        started_at: DateTime<Utc>,
        output: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self::finished(context, true, message, started_at, output)
    }

    /// Creates a failed result.
    pub fn failure(context: &ActionContext, error: &str, started_at: DateTime<Utc>) -> Self {
        Self::finished(context, false, error, started_at, HashMap::new())
    }

    fn finished(
        context: &ActionContext,
        success: bool,
        message: &str,
        started_at: DateTime<Utc>,
        output: HashMap<String, serde_json::Value>,
    ) -> Self {
        let completed_at = Utc::now();
        Self {
            execution_id: Uuid::new_v4(),
            plan_id: context.plan_id,
            action_type: context.action_type,
            success,
            message: message.to_string(),
            started_at,
            completed_at,
            duration_ms: (completed_at - started_at).num_milliseconds().max(0) as u64,
            output,
        }
    }
}

/// What a handler gets to see of the plan it runs.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub plan_id: Uuid,
    pub alert_id: Uuid,
    pub action_type: ActionType,
    pub risk_level: RiskLevel,
    pub root_cause: String,
    pub confidence: f64,
}

impl ActionContext {
    pub fn from_plan(plan: &RemediationPlan) -> Self {
        Self {
            plan_id: plan.id,
            alert_id: plan.diagnosis.alert_id,
            action_type: plan.action_type,
            risk_level: plan.risk_level,
            root_cause: plan.diagnosis.root_cause.clone(),
            confidence: plan.diagnosis.confidence,
        }
    }
}

/// A side-effecting remediation step.
///
/// Handlers report failure through `Err`; the executor owns the plan
/// status and never lets a handler touch it.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// The action type this handler serves.
    fn action_type(&self) -> ActionType;

    /// Returns the handler name.
    fn name(&self) -> &str;

    /// Returns a description of the handler.
    fn description(&self) -> &str;

    /// Performs the side effect.
    async fn execute(&self, context: &ActionContext) -> Result<ActionResult, ActionError>;
}

/// Stand-in for a real side effect: waits for a fixed latency and then
/// succeeds, or fails with a configured message.
#[derive(Debug, Clone, Default)]
pub struct SimulatedEffect {
    latency: Duration,
    failure: Option<String>,
}

impl SimulatedEffect {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            failure: None,
        }
    }

    /// Makes every run fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub async fn apply(&self) -> Result<(), ActionError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match &self.failure {
            Some(message) => Err(ActionError::ExecutionFailed(message.clone())),
            None => Ok(()),
        }
    }
}

/// Registry of action handlers keyed by action type.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    handlers: HashMap<ActionType, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with one simulated handler per action type.
    pub fn with_simulated_handlers(latency: Duration) -> Self {
        let effect = SimulatedEffect::new(latency);
        let mut registry = Self::new();
        registry.register(Arc::new(RestartServiceAction::new(effect.clone())));
        registry.register(Arc::new(ClearCacheAction::new(effect.clone())));
        registry.register(Arc::new(ScaleUpAction::new(effect.clone())));
        registry.register(Arc::new(BlockIpAction::new(effect.clone())));
        registry.register(Arc::new(NotifyAction::new(effect.clone())));
        registry.register(Arc::new(CreateTicketAction::new(effect)));
        registry
    }

    /// Registers a handler, replacing any previous one for the same type.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        self.handlers.insert(handler.action_type(), handler);
    }

    /// Removes the handler for an action type.
    pub fn unregister(&mut self, action: ActionType) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.remove(&action)
    }

    pub fn get(&self, action: ActionType) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&action).cloned()
    }

    /// Lists registered action types in declaration order.
    pub fn list(&self) -> Vec<ActionType> {
        ActionType::ALL
            .into_iter()
            .filter(|a| self.handlers.contains_key(a))
            .collect()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("handlers", &self.list())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sn_core::Diagnosis;

    fn context(action: ActionType) -> ActionContext {
        let plan = RemediationPlan::new(
            Diagnosis::unknown(Uuid::new_v4()),
            action,
            RiskLevel::Safe,
            false,
        );
        ActionContext::from_plan(&plan)
    }

    #[test]
    fn test_simulated_registry_covers_every_action() {
        let registry = ActionRegistry::with_simulated_handlers(Duration::ZERO);
        assert_eq!(registry.list(), ActionType::ALL.to_vec());
        for action in ActionType::ALL {
            let handler = registry.get(action).unwrap();
            assert_eq!(handler.action_type(), action);
        }
    }

    #[test]
    fn test_unregister() {
        let mut registry = ActionRegistry::with_simulated_handlers(Duration::ZERO);
        assert!(registry.unregister(ActionType::BlockIp).is_some());
        assert!(registry.get(ActionType::BlockIp).is_none());
        assert_eq!(registry.list().len(), 5);
    }

    #[tokio::test]
    async fn test_handler_reports_success() {
        let registry = ActionRegistry::with_simulated_handlers(Duration::ZERO);
        let ctx = context(ActionType::ClearCache);
        let result = registry
            .get(ActionType::ClearCache)
            .unwrap()
            .execute(&ctx)
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.plan_id, ctx.plan_id);
        assert_eq!(result.action_type, ActionType::ClearCache);
        assert_eq!(result.message, "Cache cleared via API");
    }

    #[tokio::test]
    async fn test_failing_effect() {
        let effect = SimulatedEffect::default().failing("ssh: connection refused");
        let err = effect.apply().await.unwrap_err();
        assert_eq!(
            err,
            ActionError::ExecutionFailed("ssh: connection refused".to_string())
        );
        assert_eq!(err.kind(), ErrorKind::Execution);
    }

    #[test]
    fn test_error_variants_are_execution_failures() {
        let errors = [
            ActionError::ExecutionFailed("disk full".to_string()),
            ActionError::Timeout(30),
        ];
        for err in &errors {
            match err {
                ActionError::ExecutionFailed(_) | ActionError::Timeout(_) => {}
            }
            assert_eq!(err.kind(), ErrorKind::Execution);
        }
        assert_eq!(errors[0].to_string(), "Execution failed: disk full");
        assert_eq!(
            errors[1].to_string(),
            "Timeout: action did not complete within 30 seconds"
        );
    }

    #[test]
    fn test_failure_result() {
        let ctx = context(ActionType::ScaleUp);
        let result = ActionResult::failure(&ctx, "boom", Utc::now());
        assert!(!result.success);
        assert!(result.output.is_empty());
        assert_eq!(result.message, "boom");
    }
}
