//! Incident and remediation history.
//!
//! The pipeline reads history through [`HistoryStore`] and never sees how a
//! store lays its data out. Storage rows stay private to each implementation
//! and are translated to domain entities at this boundary.

mod memory;
#[cfg(feature = "database")]
mod sqlite;

pub use memory::InMemoryHistoryStore;
#[cfg(feature = "database")]
pub use sqlite::{SqliteAuditSink, SqliteHistoryStore};

use crate::error::ErrorKind;
use crate::incident::{AlertSeverity, Incident};
use crate::remediation::RemediationPlan;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Oldest `created_at` inside a lookback window of `hours`. A window reaching
/// past the representable range means no cutoff at all.
pub(crate) fn lookback_cutoff(hours: u32) -> DateTime<Utc> {
    Utc::now()
        .checked_sub_signed(Duration::hours(i64::from(hours)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Errors raised by a history store.
#[derive(Error, Debug, Clone)]
pub enum HistoryError {
    #[error("History store unavailable: {0}")]
    Unavailable(String),

    #[error("History query failed: {0}")]
    Query(String),

    #[error("History query timed out after {0} seconds")]
    Timeout(u64),

    #[error("History record could not be decoded: {0}")]
    Serialization(String),
}

impl HistoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HistoryError::Serialization(_) => ErrorKind::Validation,
            _ => ErrorKind::TransientBackend,
        }
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(err: serde_json::Error) -> Self {
        HistoryError::Serialization(err.to_string())
    }
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for HistoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                HistoryError::Unavailable(err.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                HistoryError::Serialization(err.to_string())
            }
            other => HistoryError::Query(other.to_string()),
        }
    }
}

/// Persistence of past incidents and the plans produced for them.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Inserts or updates an incident.
    async fn save_incident(&self, incident: &Incident) -> Result<(), HistoryError>;

    /// Incidents from `source` OR with `severity`, created in the last
    /// `hours`, newest first, at most `limit`.
    async fn get_recent_similar(
        &self,
        source: &str,
        severity: AlertSeverity,
        hours: u32,
        limit: usize,
    ) -> Result<Vec<Incident>, HistoryError>;

    /// Inserts or updates a plan attached to an incident.
    async fn save_plan(&self, plan: &RemediationPlan, incident_id: Uuid) -> Result<(), HistoryError>;

    /// EXECUTED plans whose incident came from `source`, newest first, at most `limit`.
    async fn get_past_executed_for_source(
        &self,
        source: &str,
        limit: usize,
    ) -> Result<Vec<RemediationPlan>, HistoryError>;
}
