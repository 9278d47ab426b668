//! # sn-observability
//!
//! Logging, metrics, and audit infrastructure for Sentinel.
//!
//! The audit module owns the write-once event record and the sinks that
//! persist it. Every fully processed alert produces exactly one
//! [`AuditEvent`]; sinks only ever append.

pub mod audit;
pub mod logging;
pub mod metrics;

pub use audit::{
    read_audit_events, tail_audit_events, AuditError, AuditEvent, AuditSink, JsonlAuditSink,
    MemoryAuditSink,
};
pub use logging::{init_logging_with_config, LoggingConfig};
pub use metrics::PipelineMetrics;
