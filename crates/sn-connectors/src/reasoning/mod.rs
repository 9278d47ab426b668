//! Structured-reasoning backends.
//!
//! A backend receives a system/user prompt pair and answers with a JSON
//! object. Interpreting that object is the caller's job; backends only
//! guarantee that what they return parsed as JSON.

pub mod http;
pub mod mock;

pub use http::HttpReasoningBackend;
pub use mock::MockReasoningBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned by a reasoning backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReasoningError {
    #[error("Reasoning backend is disabled")]
    Disabled,

    #[error("Reasoning backend unavailable: {0}")]
    Unavailable(String),

    #[error("Reasoning request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid reasoning response: {0}")]
    InvalidResponse(String),

    #[error("Reasoning backend returned an empty response")]
    EmptyResponse,

    #[error("Reasoning configuration error: {0}")]
    Config(String),
}

impl ReasoningError {
    /// Whether the failure is about reaching the backend rather than what it said.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ReasoningError::Disabled
                | ReasoningError::Unavailable(_)
                | ReasoningError::Timeout(_)
                | ReasoningError::Config(_)
        )
    }
}

/// Result type for reasoning calls.
pub type ReasoningResult<T> = Result<T, ReasoningError>;

/// Prompt handed to a reasoning backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasoningPrompt {
    /// Instructions framing the backend's role.
    pub system: String,
    /// The per-alert request.
    pub user: String,
}

impl ReasoningPrompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// A backend that answers a prompt with a structured JSON payload.
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    /// Sends the prompt and returns the parsed JSON object.
    async fn complete(&self, prompt: &ReasoningPrompt) -> ReasoningResult<serde_json::Value>;
}

/// Reasoning backend configuration.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ReasoningConfig {
    /// Whether the reasoning engine is used at all.
    #[serde(default)]
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer token, if the endpoint needs one.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Completion token cap.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
}

fn default_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
        }
    }
}

impl fmt::Debug for ReasoningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReasoningConfig")
            .field("enabled", &self.enabled)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}
