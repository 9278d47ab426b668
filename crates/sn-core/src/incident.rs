//! Alert and incident data models.
//!
//! An [`Alert`] is the raw observation entering the pipeline. An
//! [`Incident`] is the persisted record of how an alert was handled; the
//! pipeline only reads incidents back as history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Severity of an incoming alert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
    Fatal,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
            AlertSeverity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertSeverity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(AlertSeverity::Info),
            "WARNING" | "WARN" => Ok(AlertSeverity::Warning),
            "CRITICAL" => Ok(AlertSeverity::Critical),
            "FATAL" => Ok(AlertSeverity::Fatal),
            other => Err(format!("unknown alert severity: {}", other)),
        }
    }
}

/// An observation of an anomalous condition from a monitored source.
///
/// Alerts are never mutated once constructed; builders consume `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique identifier for this alert.
    pub id: Uuid,
    /// Monitored source that raised the alert (host, service, cluster).
    pub source: String,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
    /// Alert severity.
    pub severity: AlertSeverity,
    /// Human-readable description.
    pub message: String,
    /// Open-schema attributes attached by the source.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Alert {
    /// Creates an alert stamped with a fresh ID and the current time.
    pub fn new(source: impl Into<String>, severity: AlertSeverity, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            source: source.into(),
            timestamp: Utc::now(),
            severity,
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    /// Adds one metadata attribute.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Returns a metadata value rendered as plain text, if present.
    ///
    /// Strings are returned without quotes; other JSON values use their
    /// compact JSON form.
    pub fn metadata_text(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Handling status of an incident.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum IncidentStatus {
    Open,
    Analyzing,
    Mitigating,
    Closed,
}

impl IncidentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Open => "OPEN",
            IncidentStatus::Analyzing => "ANALYZING",
            IncidentStatus::Mitigating => "MITIGATING",
            IncidentStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(IncidentStatus::Open),
            "ANALYZING" => Ok(IncidentStatus::Analyzing),
            "MITIGATING" => Ok(IncidentStatus::Mitigating),
            "CLOSED" => Ok(IncidentStatus::Closed),
            other => Err(format!("unknown incident status: {}", other)),
        }
    }
}

/// Record of an alert's handling, as kept by the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub source: String,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub status: IncidentStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Incident {
    /// Creates an open incident for an alert.
    pub fn from_alert(alert: &Alert) -> Self {
        Self {
            id: Uuid::new_v4(),
            alert_id: alert.id,
            source: alert.source.clone(),
            severity: alert.severity,
            message: alert.message.clone(),
            metadata: alert.metadata.clone(),
            status: IncidentStatus::Open,
            created_at: Utc::now(),
            closed_at: None,
        }
    }

    /// Updates the status, stamping `closed_at` when the incident closes.
    pub fn set_status(&mut self, status: IncidentStatus) {
        self.status = status;
        if status == IncidentStatus::Closed {
            self.closed_at.get_or_insert_with(Utc::now);
        }
    }
}
