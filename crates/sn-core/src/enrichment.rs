//! Context enrichment for incoming alerts.
//!
//! The enricher attaches bounded history to an alert:
//!
//! - recent incidents from the same source or with the same severity,
//!   within the lookback window, newest first
//! - remediation plans already executed for incidents of the same source,
//!   newest first
//!
//! Enrichment fails open. If the history store errors or times out, the
//! alert continues with empty history. With history disabled no query is
//! issued at all.

use crate::history::{HistoryError, HistoryStore};
use crate::incident::{Alert, Incident};
use crate::remediation::RemediationPlan;
use serde::{Deserialize, Serialize};
use sn_observability::PipelineMetrics;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Enrichment limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Lookback window for similar incidents, in hours.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,
    /// Maximum number of similar incidents attached.
    #[serde(default = "default_recent_incident_limit")]
    pub recent_incident_limit: usize,
    /// Maximum number of past executed plans attached.
    #[serde(default = "default_past_remediation_limit")]
    pub past_remediation_limit: usize,
    /// Per-query deadline.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

fn default_lookback_hours() -> u32 {
    24
}

fn default_recent_incident_limit() -> usize {
    10
}

fn default_past_remediation_limit() -> usize {
    5
}

fn default_query_timeout_secs() -> u64 {
    5
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            lookback_hours: default_lookback_hours(),
            recent_incident_limit: default_recent_incident_limit(),
            past_remediation_limit: default_past_remediation_limit(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

/// An alert plus the history relevant to diagnosing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedContext {
    pub alert: Alert,
    /// Newest first, bounded by `recent_incident_limit`.
    pub recent_similar_incidents: Vec<Incident>,
    /// Newest first, bounded by `past_remediation_limit`.
    pub past_remediations_for_source: Vec<RemediationPlan>,
}

impl EnrichedContext {
    /// Context carrying no history.
    pub fn minimal(alert: Alert) -> Self {
        Self {
            alert,
            recent_similar_incidents: Vec::new(),
            past_remediations_for_source: Vec::new(),
        }
    }

    pub fn has_history(&self) -> bool {
        !self.recent_similar_incidents.is_empty() || !self.past_remediations_for_source.is_empty()
    }
}

/// Builds [`EnrichedContext`] values from a history store.
pub struct ContextEnricher {
    store: Option<Arc<dyn HistoryStore>>,
    config: EnrichmentConfig,
}

impl ContextEnricher {
    pub fn new(store: Arc<dyn HistoryStore>, config: EnrichmentConfig) -> Self {
        Self {
            store: Some(store),
            config,
        }
    }

    /// An enricher that never queries history.
    pub fn without_history(config: EnrichmentConfig) -> Self {
        Self {
            store: None,
            config,
        }
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Builds the context for an alert. Never fails.
    #[instrument(skip(self, alert), fields(alert_id = %alert.id, source = %alert.source))]
    pub async fn build(&self, alert: Alert) -> EnrichedContext {
        let Some(store) = &self.store else {
            debug!("History disabled, using minimal context");
            return EnrichedContext::minimal(alert);
        };

        match self.query_history(store.as_ref(), &alert).await {
            Ok((incidents, plans)) => {
                debug!(
                    incidents = incidents.len(),
                    remediations = plans.len(),
                    "Context enriched"
                );
                EnrichedContext {
                    alert,
                    recent_similar_incidents: incidents,
                    past_remediations_for_source: plans,
                }
            }
            Err(e) => {
                warn!(
                    error = %e,
                    kind = %e.kind(),
                    "History lookup failed, continuing without history"
                );
                PipelineMetrics::record_enrichment_degraded();
                EnrichedContext::minimal(alert)
            }
        }
    }

    async fn query_history(
        &self,
        store: &dyn HistoryStore,
        alert: &Alert,
    ) -> Result<(Vec<Incident>, Vec<RemediationPlan>), HistoryError> {
        let incidents = self
            .bounded(store.get_recent_similar(
                &alert.source,
                alert.severity,
                self.config.lookback_hours,
                self.config.recent_incident_limit,
            ))
            .await?;

        let plans = self
            .bounded(store.get_past_executed_for_source(
                &alert.source,
                self.config.past_remediation_limit,
            ))
            .await?;

        Ok((incidents, plans))
    }

    async fn bounded<T>(
        &self,
        query: impl Future<Output = Result<T, HistoryError>>,
    ) -> Result<T, HistoryError> {
        let deadline = Duration::from_secs(self.config.query_timeout_secs);
        tokio::time::timeout(deadline, query)
            .await
            .map_err(|_| HistoryError::Timeout(self.config.query_timeout_secs))?
    }
}
