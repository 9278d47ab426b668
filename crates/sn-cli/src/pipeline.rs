//! Pipeline assembly from configuration.

use anyhow::{Context, Result};
use sn_actions::ActionExecutor;
use sn_connectors::HttpReasoningBackend;
use sn_core::{
    ContextEnricher, DiagnosisEngine, DiagnosisStrategy, HistoryStore, InMemoryHistoryStore,
    Orchestrator, RuleEngine, SqliteHistoryStore,
};
use sn_observability::JsonlAuditSink;
use sn_policy::RiskPolicyEvaluator;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::{AppConfig, HistoryBackend};

/// Builds the orchestrator and its collaborators.
pub async fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let rules = config.rules.load()?;
    let rule_engine = RuleEngine::new(rules).context("Invalid diagnostic rules")?;

    let strategy = if config.reasoning.enabled {
        let backend = HttpReasoningBackend::new(config.reasoning.clone())
            .context("Failed to create reasoning backend")?;
        DiagnosisStrategy::ReasoningBacked {
            backend: Arc::new(backend),
            fallback: rule_engine,
            timeout: Duration::from_secs(config.reasoning.timeout_secs),
            lookback_hours: config.enrichment.lookback_hours,
        }
    } else {
        DiagnosisStrategy::RuleBased(rule_engine)
    };
    let diagnosis = strategy.build();

    let history = history_store(config).await?;
    let enricher = match &history {
        Some(store) => ContextEnricher::new(store.clone(), config.enrichment.clone()),
        None => ContextEnricher::without_history(config.enrichment.clone()),
    };

    info!(
        engine = diagnosis.name(),
        history = config.history.backend.as_str(),
        audit_file = %config.audit.file_path.display(),
        auto_approve_moderate = config.policy.auto_approve_moderate,
        "Pipeline assembled"
    );

    let orchestrator = Orchestrator::new(
        enricher,
        diagnosis,
        Arc::new(RiskPolicyEvaluator::new(config.policy.clone())),
        Arc::new(ActionExecutor::with_default_handlers(config.executor.clone())),
        Arc::new(JsonlAuditSink::new(config.audit.file_path.clone())),
    );
    Ok(match history {
        Some(store) => orchestrator.with_history_recorder(store),
        None => orchestrator,
    })
}

/// The configured history store, or `None` when history is disabled.
async fn history_store(config: &AppConfig) -> Result<Option<Arc<dyn HistoryStore>>> {
    match config.history.backend {
        HistoryBackend::Disabled => Ok(None),
        HistoryBackend::Memory => Ok(Some(Arc::new(InMemoryHistoryStore::new()))),
        HistoryBackend::Sqlite => {
            let url = &config.history.database_url;
            let store = SqliteHistoryStore::connect(url)
                .await
                .with_context(|| format!("Failed to open history database: {}", url))?;
            Ok(Some(Arc::new(store)))
        }
    }
}
