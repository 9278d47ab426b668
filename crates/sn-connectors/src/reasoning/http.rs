//! OpenAI-compatible chat-completions backend.

use super::{ReasoningBackend, ReasoningConfig, ReasoningError, ReasoningPrompt, ReasoningResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Reasoning backend that posts to `{endpoint}/v1/chat/completions` and
/// requests a JSON object response.
pub struct HttpReasoningBackend {
    client: Client,
    config: ReasoningConfig,
}

impl HttpReasoningBackend {
    /// Builds the HTTP client. Fails only if the TLS stack cannot be initialised.
    pub fn new(config: ReasoningConfig) -> ReasoningResult<Self> {
        if config.endpoint.trim().is_empty() {
            return Err(ReasoningError::Config("endpoint must not be empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("sentinel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ReasoningError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.endpoint.trim_end_matches('/')
        )
    }

    fn request_body(&self, prompt: &ReasoningPrompt) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": prompt.system},
                {"role": "user", "content": prompt.user},
            ],
            "response_format": {"type": "json_object"},
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        })
    }
}

/// Extracts `choices[0].message.content` and parses it as a JSON object.
pub(crate) fn parse_completion(body: &serde_json::Value) -> ReasoningResult<serde_json::Value> {
    let content = body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .ok_or(ReasoningError::EmptyResponse)?;

    if content.trim().is_empty() {
        return Err(ReasoningError::EmptyResponse);
    }

    let value: serde_json::Value = serde_json::from_str(content).map_err(|e| {
        ReasoningError::InvalidResponse(format!("completion is not valid JSON: {}", e))
    })?;

    if !value.is_object() {
        return Err(ReasoningError::InvalidResponse(
            "completion is not a JSON object".into(),
        ));
    }

    Ok(value)
}

#[async_trait]
impl ReasoningBackend for HttpReasoningBackend {
    fn name(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip(self, prompt), fields(model = %self.config.model))]
    async fn complete(&self, prompt: &ReasoningPrompt) -> ReasoningResult<serde_json::Value> {
        if !self.config.enabled {
            return Err(ReasoningError::Disabled);
        }

        let mut request = self
            .client
            .post(self.completions_url())
            .json(&self.request_body(prompt));

        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ReasoningError::Timeout(self.config.timeout_secs)
            } else {
                ReasoningError::Unavailable(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Reasoning backend returned an error status");
            return Err(ReasoningError::Unavailable(format!(
                "HTTP {} from reasoning backend",
                status
            )));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            ReasoningError::InvalidResponse(format!("Failed to parse response body: {}", e))
        })?;

        let payload = parse_completion(&body)?;
        debug!("Reasoning backend returned a structured payload");
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend(enabled: bool) -> HttpReasoningBackend {
        HttpReasoningBackend::new(ReasoningConfig {
            enabled,
            endpoint: "http://localhost:9/".to_string(),
            model: "test-model".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_completions_url_trims_trailing_slash() {
        assert_eq!(
            backend(true).completions_url(),
            "http://localhost:9/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_asks_for_json_object() {
        let body = backend(true).request_body(&ReasoningPrompt::new("sys", "usr"));
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let result = HttpReasoningBackend::new(ReasoningConfig {
            endpoint: "  ".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(ReasoningError::Config(_))));
    }

    #[test]
    fn test_parse_completion_extracts_object() {
        let body = json!({
            "choices": [{"message": {"content": "{\"root_cause\": \"disk\", \"confidence\": 0.4}"}}]
        });
        let payload = parse_completion(&body).unwrap();
        assert_eq!(payload["root_cause"], "disk");
    }

    #[test]
    fn test_parse_completion_rejects_non_json() {
        let body = json!({"choices": [{"message": {"content": "the disk is full"}}]});
        assert!(matches!(
            parse_completion(&body),
            Err(ReasoningError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_completion_rejects_non_object() {
        let body = json!({"choices": [{"message": {"content": "[1, 2]"}}]});
        assert!(matches!(
            parse_completion(&body),
            Err(ReasoningError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_completion_missing_choices() {
        assert_eq!(
            parse_completion(&json!({"choices": []})),
            Err(ReasoningError::EmptyResponse)
        );
    }

    #[tokio::test]
    async fn test_disabled_backend_short_circuits() {
        let result = backend(false)
            .complete(&ReasoningPrompt::new("sys", "usr"))
            .await;
        assert_eq!(result, Err(ReasoningError::Disabled));
    }
}
