//! Plan execution.
//!
//! [`ActionExecutor`] is the only code that moves a plan to EXECUTED or
//! FAILED. Before dispatching it checks the approval gate; a refused plan
//! is returned untouched.

use crate::registry::{ActionContext, ActionError, ActionHandler, ActionRegistry, ActionResult};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sn_core::{ErrorKind, PlanExecutor, RemediationPlan};
use sn_observability::PipelineMetrics;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// Number of action results kept for inspection.
const RECENT_RESULTS_CAPACITY: usize = 100;

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Upper bound on a single action, in seconds.
    #[serde(default = "default_action_timeout_secs")]
    pub action_timeout_secs: u64,
    /// Artificial latency of the simulated handlers, in milliseconds.
    #[serde(default)]
    pub simulated_latency_ms: u64,
}

fn default_action_timeout_secs() -> u64 {
    30
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            action_timeout_secs: default_action_timeout_secs(),
            simulated_latency_ms: 0,
        }
    }
}

impl ExecutorConfig {
    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action_timeout_secs)
    }

    pub fn simulated_latency(&self) -> Duration {
        Duration::from_millis(self.simulated_latency_ms)
    }
}

/// Runs remediation plans through their registered handlers.
#[derive(Debug)]
pub struct ActionExecutor {
    registry: ActionRegistry,
    config: ExecutorConfig,
    recent: Mutex<VecDeque<ActionResult>>,
}

impl ActionExecutor {
    /// Creates an executor over an explicit registry.
    pub fn new(registry: ActionRegistry, config: ExecutorConfig) -> Self {
        Self {
            registry,
            config,
            recent: Mutex::new(VecDeque::new()),
        }
    }

    /// Creates an executor with one simulated handler per action type.
    pub fn with_default_handlers(config: ExecutorConfig) -> Self {
        let registry = ActionRegistry::with_simulated_handlers(config.simulated_latency());
        Self::new(registry, config)
    }

    /// Registers a handler, replacing the existing one for its action type.
    pub fn register(&mut self, handler: Arc<dyn ActionHandler>) {
        self.registry.register(handler);
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Most recent handler results, newest first.
    pub async fn recent_results(&self) -> Vec<ActionResult> {
        self.recent.lock().await.iter().rev().cloned().collect()
    }

    async fn remember(&self, result: ActionResult) {
        let mut recent = self.recent.lock().await;
        if recent.len() == RECENT_RESULTS_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(result);
    }

    async fn dispatch(
        &self,
        handler: &dyn ActionHandler,
        context: &ActionContext,
    ) -> Result<ActionResult, ActionError> {
        let timeout = self.config.action_timeout();
        match tokio::time::timeout(timeout, handler.execute(context)).await {
            Ok(Ok(result)) if result.success => Ok(result),
            Ok(Ok(result)) => Err(ActionError::ExecutionFailed(result.message)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ActionError::Timeout(self.config.action_timeout_secs)),
        }
    }
}

#[async_trait]
impl PlanExecutor for ActionExecutor {
    #[instrument(
        skip(self, plan),
        fields(plan_id = %plan.id, action = %plan.action_type, risk_level = %plan.risk_level)
    )]
    async fn execute_action(&self, plan: &mut RemediationPlan) -> bool {
        let action = plan.action_type;

        if plan.status.is_terminal() {
            warn!(status = %plan.status, "Refusing to execute a plan that already finished");
            PipelineMetrics::record_action_refused(action.as_str());
            return false;
        }

        if !plan.is_cleared_for_execution() {
            warn!(
                kind = %ErrorKind::ApprovalViolation,
                status = %plan.status,
                "Attempted to execute unapproved plan"
            );
            PipelineMetrics::record_action_refused(action.as_str());
            return false;
        }

        let Some(handler) = self.registry.get(action) else {
            info!("No handler registered for action, treating as no-op");
            return match plan.mark_executed() {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, "Could not record no-op execution");
                    false
                }
            };
        };

        let context = ActionContext::from_plan(plan);
        let started = Instant::now();
        let started_at = Utc::now();
        let outcome = self.dispatch(handler.as_ref(), &context).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(result) => {
                PipelineMetrics::record_action(action.as_str(), true, elapsed);
                info!(handler = handler.name(), message = %result.message, "Action executed");
                self.remember(result).await;
                match plan.mark_executed() {
                    Ok(()) => true,
                    Err(e) => {
                        error!(error = %e, "Action ran but the plan could not be marked executed");
                        false
                    }
                }
            }
            Err(e) => {
                PipelineMetrics::record_action(action.as_str(), false, elapsed);
                error!(
                    handler = handler.name(),
                    kind = %e.kind(),
                    error = %e,
                    "Action execution failed"
                );
                self.remember(ActionResult::failure(&context, &e.to_string(), started_at))
                    .await;
                if let Err(transition) = plan.mark_failed() {
                    error!(error = %transition, "Could not mark plan failed");
                }
                false
            }
        }
    }
}
