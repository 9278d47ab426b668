//! Stage seams implemented outside this crate.
//!
//! The orchestrator depends only on these traits; the policy and executor
//! crates provide the implementations.

use crate::remediation::{Diagnosis, RemediationPlan};
use async_trait::async_trait;

/// Turns a diagnosis into a risk-classified plan.
pub trait RiskPolicy: Send + Sync {
    /// Total: every diagnosis yields a PENDING plan.
    fn evaluate_risk(&self, diagnosis: Diagnosis) -> RemediationPlan;
}

/// Runs a remediation plan.
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    /// Returns true when the action ran and the plan is now EXECUTED.
    ///
    /// Never returns an error: refusals leave the plan untouched and
    /// failures mark it FAILED, both reported as `false`.
    async fn execute_action(&self, plan: &mut RemediationPlan) -> bool;
}
