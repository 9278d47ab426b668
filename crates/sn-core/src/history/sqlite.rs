//! SQLite-backed history store and audit sink.

use super::{lookback_cutoff, HistoryError, HistoryStore};
use crate::incident::{AlertSeverity, Incident};
use crate::remediation::{PlanStatus, RemediationPlan};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sn_observability::{AuditError, AuditEvent, AuditSink};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

const CREATE_INCIDENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS incidents (
        id TEXT PRIMARY KEY,
        alert_id TEXT NOT NULL,
        source TEXT NOT NULL,
        severity TEXT NOT NULL,
        message TEXT NOT NULL,
        metadata TEXT NOT NULL DEFAULT '{}',
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        closed_at TEXT
    )
"#;

const CREATE_PLANS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS remediation_plans (
        id TEXT PRIMARY KEY,
        incident_id TEXT NOT NULL REFERENCES incidents(id),
        diagnosis TEXT NOT NULL,
        action_type TEXT NOT NULL,
        risk_level TEXT NOT NULL,
        requires_approval INTEGER NOT NULL,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
"#;

const CREATE_AUDIT_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS audit_events (
        id TEXT PRIMARY KEY,
        timestamp TEXT NOT NULL,
        component TEXT NOT NULL,
        event TEXT NOT NULL,
        details TEXT NOT NULL
    )
"#;

const CREATE_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS idx_incidents_source ON incidents(source)",
    "CREATE INDEX IF NOT EXISTS idx_incidents_created_at ON incidents(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_plans_incident ON remediation_plans(incident_id)",
];

/// Fixed-width UTC timestamps so text comparison orders chronologically.
fn db_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, HistoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| HistoryError::Serialization(e.to_string()))
}

fn parse_uuid(value: &str) -> Result<Uuid, HistoryError> {
    Uuid::parse_str(value).map_err(|e| HistoryError::Serialization(e.to_string()))
}

fn parse_enum<T: FromStr<Err = String>>(value: &str) -> Result<T, HistoryError> {
    value.parse().map_err(HistoryError::Serialization)
}

/// Opens a pool, creating the database file if needed.
async fn open_pool(database_url: &str) -> Result<SqlitePool, HistoryError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| HistoryError::Unavailable(e.to_string()))?
        .create_if_missing(true);

    // An in-memory database exists per connection, so keep exactly one.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| HistoryError::Unavailable(e.to_string()))
}

/// History store persisted in SQLite.
#[derive(Clone)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and creates the schema.
    pub async fn connect(database_url: &str) -> Result<Self, HistoryError> {
        let store = Self::new(open_pool(database_url).await?);
        store.migrate().await?;
        Ok(store)
    }

    /// Creates tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<(), HistoryError> {
        info!("Running history schema migrations");
        for statement in [CREATE_INCIDENTS_TABLE, CREATE_PLANS_TABLE, CREATE_AUDIT_TABLE]
            .into_iter()
            .chain(CREATE_INDEXES)
        {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// The underlying pool, for sharing with [`SqliteAuditSink`].
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn save_incident(&self, incident: &Incident) -> Result<(), HistoryError> {
        let metadata = serde_json::to_string(&incident.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO incidents (id, alert_id, source, severity, message, metadata, status, created_at, closed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                metadata = excluded.metadata,
                closed_at = excluded.closed_at
            "#,
        )
        .bind(incident.id.to_string())
        .bind(incident.alert_id.to_string())
        .bind(&incident.source)
        .bind(incident.severity.as_str())
        .bind(&incident.message)
        .bind(metadata)
        .bind(incident.status.as_str())
        .bind(db_timestamp(&incident.created_at))
        .bind(incident.closed_at.as_ref().map(db_timestamp))
        .execute(&self.pool)
        .await?;

        debug!(incident_id = %incident.id, "Incident saved");
        Ok(())
    }

    async fn get_recent_similar(
        &self,
        source: &str,
        severity: AlertSeverity,
        hours: u32,
        limit: usize,
    ) -> Result<Vec<Incident>, HistoryError> {
        let cutoff = lookback_cutoff(hours);

        let rows: Vec<IncidentRow> = sqlx::query_as(
            r#"
            SELECT id, alert_id, source, severity, message, metadata, status, created_at, closed_at
            FROM incidents
            WHERE (source = ? OR severity = ?) AND created_at >= ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(source)
        .bind(severity.as_str())
        .bind(db_timestamp(&cutoff))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Incident::try_from).collect()
    }

    async fn save_plan(&self, plan: &RemediationPlan, incident_id: Uuid) -> Result<(), HistoryError> {
        let diagnosis = serde_json::to_string(&plan.diagnosis)?;

        sqlx::query(
            r#"
            INSERT INTO remediation_plans (id, incident_id, diagnosis, action_type, risk_level, requires_approval, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                requires_approval = excluded.requires_approval
            "#,
        )
        .bind(plan.id.to_string())
        .bind(incident_id.to_string())
        .bind(diagnosis)
        .bind(plan.action_type.as_str())
        .bind(plan.risk_level.as_str())
        .bind(plan.requires_approval)
        .bind(plan.status.as_str())
        .bind(db_timestamp(&Utc::now()))
        .execute(&self.pool)
        .await?;

        debug!(plan_id = %plan.id, incident_id = %incident_id, "Plan saved");
        Ok(())
    }

    async fn get_past_executed_for_source(
        &self,
        source: &str,
        limit: usize,
    ) -> Result<Vec<RemediationPlan>, HistoryError> {
        let rows: Vec<PlanRow> = sqlx::query_as(
            r#"
            SELECT p.id, p.diagnosis, p.action_type, p.risk_level, p.requires_approval, p.status
            FROM remediation_plans p
            JOIN incidents i ON i.id = p.incident_id
            WHERE i.source = ? AND p.status = ?
            ORDER BY p.created_at DESC, p.rowid DESC
            LIMIT ?
            "#,
        )
        .bind(source)
        .bind(PlanStatus::Executed.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RemediationPlan::try_from).collect()
    }
}

/// Audit sink appending to the `audit_events` table.
///
/// Rows are only ever inserted.
#[derive(Clone)]
pub struct SqliteAuditSink {
    pool: SqlitePool,
}

impl SqliteAuditSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Reads back the newest `limit` events.
    pub async fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, AuditError> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, timestamp, component, event, details
            FROM audit_events
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditError::Unavailable(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                AuditEvent::try_from(row).map_err(|e| AuditError::Unavailable(e.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
    async fn log_event(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let details = serde_json::to_string(&event.details)?;

        sqlx::query(
            "INSERT INTO audit_events (id, timestamp, component, event, details) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(event.id.to_string())
        .bind(db_timestamp(&event.timestamp))
        .bind(&event.component)
        .bind(&event.event)
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(|e| AuditError::Unavailable(e.to_string()))?;

        Ok(())
    }
}

// Row shapes. These never leave this module.

#[derive(sqlx::FromRow)]
struct IncidentRow {
    id: String,
    alert_id: String,
    source: String,
    severity: String,
    message: String,
    metadata: String,
    status: String,
    created_at: String,
    closed_at: Option<String>,
}

impl TryFrom<IncidentRow> for Incident {
    type Error = HistoryError;

    fn try_from(row: IncidentRow) -> Result<Self, Self::Error> {
        Ok(Incident {
            id: parse_uuid(&row.id)?,
            alert_id: parse_uuid(&row.alert_id)?,
            source: row.source,
            severity: parse_enum(&row.severity)?,
            message: row.message,
            metadata: serde_json::from_str(&row.metadata)?,
            status: parse_enum(&row.status)?,
            created_at: parse_timestamp(&row.created_at)?,
            closed_at: row.closed_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PlanRow {
    id: String,
    diagnosis: String,
    action_type: String,
    risk_level: String,
    requires_approval: bool,
    status: String,
}

impl TryFrom<PlanRow> for RemediationPlan {
    type Error = HistoryError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        Ok(RemediationPlan {
            id: parse_uuid(&row.id)?,
            diagnosis: serde_json::from_str(&row.diagnosis)?,
            action_type: parse_enum(&row.action_type)?,
            risk_level: parse_enum(&row.risk_level)?,
            requires_approval: row.requires_approval,
            status: parse_enum(&row.status)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    id: String,
    timestamp: String,
    component: String,
    event: String,
    details: String,
}

impl TryFrom<AuditRow> for AuditEvent {
    type Error = HistoryError;

    fn try_from(row: AuditRow) -> Result<Self, Self::Error> {
        Ok(AuditEvent {
            id: parse_uuid(&row.id)?,
            timestamp: parse_timestamp(&row.timestamp)?,
            component: row.component,
            event: row.event,
            details: serde_json::from_str(&row.details)?,
        })
    }
}
