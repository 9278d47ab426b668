//! Audit trail for Sentinel.
//!
//! Audit events are write-once: sinks append them and never rewrite or
//! delete. The persisted wire form is one JSON object per line.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Errors that can occur while writing or reading the audit trail.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

/// An immutable record of one pipeline outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub id: Uuid,
    /// When the event was recorded.
    pub timestamp: DateTime<Utc>,
    /// Component that emitted the event.
    pub component: String,
    /// Event name.
    pub event: String,
    /// Structured snapshot of the outcome.
    pub details: serde_json::Value,
}

impl AuditEvent {
    /// Creates a new event stamped with a fresh ID and the current time.
    pub fn new(component: &str, event: &str, details: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            component: component.to_string(),
            event: event.to_string(),
            details,
        }
    }

    /// Encodes the event as a single JSONL record (no trailing newline).
    pub fn to_json_line(&self) -> Result<String, AuditError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes an event from a single JSONL record.
    pub fn from_json_line(line: &str) -> Result<Self, AuditError> {
        Ok(serde_json::from_str(line.trim())?)
    }
}

/// Append-only destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends one event. Implementations must never mutate earlier events.
    async fn log_event(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Audit sink appending JSON lines to a file.
pub struct JsonlAuditSink {
    path: PathBuf,
    /// Serializes appends so concurrent writers never interleave lines.
    write_lock: Mutex<()>,
}

impl JsonlAuditSink {
    /// Creates a sink writing to the given path. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the audit file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for JsonlAuditSink {
    async fn log_event(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let mut line = event.to_json_line()?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                error!(
                    audit_id = %event.id,
                    path = %self.path.display(),
                    "Failed to open audit file: {}",
                    e
                );
                e
            })?;

        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        debug!(audit_id = %event.id, event = %event.event, "Audit event appended");
        Ok(())
    }
}

/// Reads every event from a JSONL audit file, oldest first.
///
/// A missing file is an empty trail. Lines that fail to decode are skipped
/// with a warning.
pub async fn read_audit_events(path: impl AsRef<Path>) -> Result<Vec<AuditEvent>, AuditError> {
    let path = path.as_ref();
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut events = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match AuditEvent::from_json_line(line) {
            Ok(event) => events.push(event),
            Err(e) => warn!(line = index + 1, "Skipping unreadable audit record: {}", e),
        }
    }
    Ok(events)
}

/// Reads the last `limit` events from a JSONL audit file, newest first.
pub async fn tail_audit_events(
    path: impl AsRef<Path>,
    limit: usize,
) -> Result<Vec<AuditEvent>, AuditError> {
    let events = read_audit_events(path).await?;
    Ok(events.into_iter().rev().take(limit).collect())
}

/// In-memory audit sink, used in tests and for dry runs.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
    failing: AtomicBool,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of all recorded events, oldest first.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }

    /// Number of recorded events.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Whether no events have been recorded.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn log_event(&self, event: &AuditEvent) -> Result<(), AuditError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuditError::Unavailable(
                "memory audit sink is set to fail".to_string(),
            ));
        }
        self.events.write().await.push(event.clone());
        Ok(())
    }
}
