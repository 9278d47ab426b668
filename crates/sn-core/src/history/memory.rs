//! In-memory history store.

use super::{lookback_cutoff, HistoryError, HistoryStore};
use crate::incident::{AlertSeverity, Incident};
use crate::remediation::{PlanStatus, RemediationPlan};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct StoredPlan {
    plan: RemediationPlan,
    incident_id: Uuid,
    recorded_at: DateTime<Utc>,
}

/// History store kept in process memory.
///
/// Used when no database is configured and as the test double for the
/// pipeline: [`set_unavailable`](Self::set_unavailable) makes every call
/// fail as if the backend were unreachable.
pub struct InMemoryHistoryStore {
    incidents: Arc<RwLock<Vec<Incident>>>,
    plans: Arc<RwLock<Vec<StoredPlan>>>,
    unavailable: AtomicBool,
    queries: AtomicUsize,
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            incidents: Arc::new(RwLock::new(Vec::new())),
            plans: Arc::new(RwLock::new(Vec::new())),
            unavailable: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
        }
    }

    /// Toggles simulated unavailability.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of read queries served or refused so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Snapshot of all stored incidents, in insertion order.
    pub async fn incidents(&self) -> Vec<Incident> {
        self.incidents.read().await.clone()
    }

    /// Snapshot of all stored plans with their incident IDs, in insertion order.
    pub async fn plans(&self) -> Vec<(RemediationPlan, Uuid)> {
        self.plans
            .read()
            .await
            .iter()
            .map(|p| (p.plan.clone(), p.incident_id))
            .collect()
    }

    fn check_available(&self) -> Result<(), HistoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(HistoryError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn save_incident(&self, incident: &Incident) -> Result<(), HistoryError> {
        self.check_available()?;
        let mut incidents = self.incidents.write().await;
        match incidents.iter_mut().find(|i| i.id == incident.id) {
            Some(existing) => *existing = incident.clone(),
            None => incidents.push(incident.clone()),
        }
        Ok(())
    }

    async fn get_recent_similar(
        &self,
        source: &str,
        severity: AlertSeverity,
        hours: u32,
        limit: usize,
    ) -> Result<Vec<Incident>, HistoryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let cutoff = lookback_cutoff(hours);
        let incidents = self.incidents.read().await;

        // Reverse first so equal timestamps keep newest-inserted first after the stable sort.
        let mut matches: Vec<Incident> = incidents
            .iter()
            .rev()
            .filter(|i| i.source == source || i.severity == severity)
            .filter(|i| i.created_at >= cutoff)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn save_plan(&self, plan: &RemediationPlan, incident_id: Uuid) -> Result<(), HistoryError> {
        self.check_available()?;
        let mut plans = self.plans.write().await;
        match plans.iter_mut().find(|p| p.plan.id == plan.id) {
            Some(existing) => {
                existing.plan = plan.clone();
                existing.incident_id = incident_id;
            }
            None => plans.push(StoredPlan {
                plan: plan.clone(),
                incident_id,
                recorded_at: Utc::now(),
            }),
        }
        Ok(())
    }

    async fn get_past_executed_for_source(
        &self,
        source: &str,
        limit: usize,
    ) -> Result<Vec<RemediationPlan>, HistoryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let incidents = self.incidents.read().await;
        let plans = self.plans.read().await;

        let mut matches: Vec<&StoredPlan> = plans
            .iter()
            .rev()
            .filter(|p| p.plan.status == PlanStatus::Executed)
            .filter(|p| {
                incidents
                    .iter()
                    .any(|i| i.id == p.incident_id && i.source == source)
            })
            .collect();
        matches.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));

        Ok(matches
            .into_iter()
            .take(limit)
            .map(|p| p.plan.clone())
            .collect())
    }
}
