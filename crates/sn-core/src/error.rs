//! Failure classification shared by the pipeline stages.
//!
//! Each stage error maps onto one [`ErrorKind`], and the kind decides the
//! local recovery:
//!
//! | Kind | Recovery |
//! |---|---|
//! | `TransientBackend` | enrichment degrades to empty history; diagnosis falls back |
//! | `Validation` | same as `TransientBackend` |
//! | `ApprovalViolation` | execution refused, plan untouched |
//! | `Execution` | plan marked FAILED, never retried |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a pipeline failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A history store or reasoning backend was unreachable or too slow.
    TransientBackend,
    /// A backend answered with a payload that fails the schema.
    Validation,
    /// Execution was attempted on a plan that still needs approval.
    ApprovalViolation,
    /// An action side effect failed.
    Execution,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TransientBackend => "transient_backend",
            ErrorKind::Validation => "validation",
            ErrorKind::ApprovalViolation => "approval_violation",
            ErrorKind::Execution => "execution",
        }
    }

    /// Whether the failure is absorbed by substituting a degraded answer.
    pub fn is_recoverable_by_fallback(&self) -> bool {
        matches!(self, ErrorKind::TransientBackend | ErrorKind::Validation)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
