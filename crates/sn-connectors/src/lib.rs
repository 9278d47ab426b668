//! # sn-connectors
//!
//! Connectors to the external systems Sentinel consults while triaging alerts.
//!
//! Currently this is the structured-reasoning backend used by the diagnosis
//! stage: an OpenAI-compatible HTTP client plus a scriptable mock.

pub mod reasoning;

pub use reasoning::{
    HttpReasoningBackend, MockReasoningBackend, ReasoningBackend, ReasoningConfig,
    ReasoningError, ReasoningPrompt, ReasoningResult,
};
