//! Root-cause diagnosis.
//!
//! Two strategies sit behind [`DiagnosisEngine`]:
//!
//! - [`RuleEngine`]: ordered, deterministic pattern matching, no I/O
//! - [`ReasoningEngine`]: asks a reasoning backend and, on any failure,
//!   answers with its fallback engine instead
//!
//! Which one runs is decided once, when the pipeline is assembled, through
//! [`DiagnosisStrategy`].

pub mod reasoning;
pub mod rules;

pub use reasoning::ReasoningEngine;
pub use rules::{Rule, RuleCondition, RuleEngine, RuleSet};

use crate::enrichment::EnrichedContext;
use crate::error::ErrorKind;
use crate::remediation::Diagnosis;
use async_trait::async_trait;
use sn_connectors::{ReasoningBackend, ReasoningError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while producing a diagnosis.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagnosisError {
    #[error("Reasoning backend failed: {0}")]
    Reasoning(#[from] ReasoningError),

    #[error("Reasoning backend did not answer within {0} seconds")]
    Timeout(u64),

    #[error("Invalid diagnosis payload: {0}")]
    Validation(String),

    #[error("Diagnosis engine failed: {0}")]
    Engine(String),
}

impl DiagnosisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiagnosisError::Reasoning(e) if !e.is_transient() => ErrorKind::Validation,
            DiagnosisError::Validation(_) => ErrorKind::Validation,
            _ => ErrorKind::TransientBackend,
        }
    }
}

/// Produces a diagnosis for an enriched alert.
#[async_trait]
pub trait DiagnosisEngine: Send + Sync {
    /// Engine name used in logs.
    fn name(&self) -> &str;

    async fn analyze(&self, context: &EnrichedContext) -> Result<Diagnosis, DiagnosisError>;
}

/// Deployment-time choice of diagnosis strategy.
pub enum DiagnosisStrategy {
    /// Rules only.
    RuleBased(RuleEngine),
    /// Reasoning backend first, rules when it fails.
    ReasoningBacked {
        backend: Arc<dyn ReasoningBackend>,
        fallback: RuleEngine,
        timeout: Duration,
        lookback_hours: u32,
    },
}

impl DiagnosisStrategy {
    /// Builds the engine for this strategy.
    pub fn build(self) -> Arc<dyn DiagnosisEngine> {
        match self {
            DiagnosisStrategy::RuleBased(rules) => Arc::new(rules),
            DiagnosisStrategy::ReasoningBacked {
                backend,
                fallback,
                timeout,
                lookback_hours,
            } => Arc::new(
                ReasoningEngine::new(backend, Arc::new(fallback), timeout)
                    .with_lookback_hours(lookback_hours),
            ),
        }
    }
}
