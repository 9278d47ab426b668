//! Reasoning-backed diagnosis with transparent fallback.

use super::{DiagnosisEngine, DiagnosisError};
use crate::enrichment::EnrichedContext;
use crate::incident::Incident;
use crate::remediation::{ActionType, Diagnosis, RemediationPlan};
use async_trait::async_trait;
use serde::Deserialize;
use sn_connectors::{ReasoningBackend, ReasoningPrompt};
use sn_observability::PipelineMetrics;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

const SYSTEM_PROMPT: &str = "You are SENTINEL, a senior site reliability engineering agent. \
Perform strict causal root-cause analysis, not probabilistic guessing. \
Always construct a causal chain of events and weigh past remediation history \
before suggesting actions. Respond with a single JSON object.";

const RESPONSE_SCHEMA: &str = r#"{"root_cause": string, "confidence": number between 0.0 and 1.0, "alternative_hypotheses": [string], "reasoning_trace": string, "suggested_actions": [one of the allowed actions]}"#;

/// What the backend must return. `alert_id` is never taken from the backend.
#[derive(Debug, Deserialize)]
struct ReasoningPayload {
    root_cause: String,
    confidence: f64,
    alternative_hypotheses: Vec<String>,
    reasoning_trace: String,
    suggested_actions: Vec<String>,
}

/// Diagnosis engine that consults a reasoning backend.
///
/// Any failure (transport, timeout, malformed or out-of-range payload) is
/// logged and answered by the fallback engine with the same context. The
/// fallback runs exactly once per failed call and its result is returned
/// unchanged.
pub struct ReasoningEngine {
    backend: Arc<dyn ReasoningBackend>,
    fallback: Arc<dyn DiagnosisEngine>,
    timeout: Duration,
    lookback_hours: u32,
}

impl ReasoningEngine {
    pub fn new(
        backend: Arc<dyn ReasoningBackend>,
        fallback: Arc<dyn DiagnosisEngine>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            fallback,
            timeout,
            lookback_hours: 24,
        }
    }

    /// Lookback window mentioned in the prompt.
    pub fn with_lookback_hours(mut self, hours: u32) -> Self {
        self.lookback_hours = hours;
        self
    }

    /// Builds the prompt for one alert.
    pub fn build_prompt(&self, context: &EnrichedContext) -> ReasoningPrompt {
        let alert = &context.alert;
        let metadata: BTreeMap<&String, &serde_json::Value> = alert.metadata.iter().collect();
        let metadata = serde_json::to_string(&metadata).unwrap_or_else(|_| "{}".to_string());
        let allowed = ActionType::ALL
            .iter()
            .map(ActionType::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let user = format!(
            "ALERT RECEIVED:\n\
             \x20 Source:   {source}\n\
             \x20 Severity: {severity}\n\
             \x20 Message:  {message}\n\
             \x20 Metadata: {metadata}\n\n\
             HISTORICAL CONTEXT:\n\
             \x20 Recent similar incidents (last {hours} h):\n{incidents}\n\n\
             \x20 Past executed remediations for this source:\n{remediations}\n\n\
             INSTRUCTIONS FOR CAUSAL ANALYSIS:\n\
             1. Construct a causal chain of events. Do NOT rely on correlation alone.\n\
             2. Evaluate alternative hypotheses (e.g. memory leak vs. traffic spike vs. query loop) and list them.\n\
             3. If a remediation was already executed for this source and the alert recurred, \
             do NOT suggest the same action again. Escalate or find the real root cause.\n\
             4. Provide a reasoning_trace documenting your step-by-step logic.\n\
             5. Set confidence between 0.0 and 1.0 and keep it low when telemetry is insufficient.\n\
             6. Suggest actions only from: [{allowed}].\n\n\
             Respond with JSON matching: {schema}",
            source = alert.source,
            severity = alert.severity,
            message = alert.message,
            metadata = metadata,
            hours = self.lookback_hours,
            incidents = format_incidents(&context.recent_similar_incidents),
            remediations = format_remediations(&context.past_remediations_for_source),
            allowed = allowed,
            schema = RESPONSE_SCHEMA,
        );

        ReasoningPrompt::new(SYSTEM_PROMPT, user)
    }

    async fn reason(&self, context: &EnrichedContext) -> Result<Diagnosis, DiagnosisError> {
        let prompt = self.build_prompt(context);
        let started = Instant::now();

        let payload = tokio::time::timeout(self.timeout, self.backend.complete(&prompt))
            .await
            .map_err(|_| DiagnosisError::Timeout(self.timeout.as_secs()))??;

        PipelineMetrics::record_reasoning_latency(started.elapsed());
        parse_diagnosis(payload, context.alert.id)
    }
}

fn format_incidents(incidents: &[Incident]) -> String {
    if incidents.is_empty() {
        return "    None.".to_string();
    }
    incidents
        .iter()
        .map(|i| {
            format!(
                "    - [{}] {}: {} (severity={})",
                i.status, i.source, i.message, i.severity
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_remediations(plans: &[RemediationPlan]) -> String {
    if plans.is_empty() {
        return "    None.".to_string();
    }
    plans
        .iter()
        .map(|p| {
            format!(
                "    - [{}] {}: {}",
                p.status, p.action_type, p.diagnosis.root_cause
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Validates a backend payload and turns it into a diagnosis for `alert_id`.
pub fn parse_diagnosis(payload: serde_json::Value, alert_id: Uuid) -> Result<Diagnosis, DiagnosisError> {
    let payload: ReasoningPayload = serde_json::from_value(payload)
        .map_err(|e| DiagnosisError::Validation(format!("payload shape: {}", e)))?;

    if payload.root_cause.trim().is_empty() {
        return Err(DiagnosisError::Validation("root_cause is empty".into()));
    }

    if !payload.confidence.is_finite() || !(0.0..=1.0).contains(&payload.confidence) {
        return Err(DiagnosisError::Validation(format!(
            "confidence {} outside [0.0, 1.0]",
            payload.confidence
        )));
    }

    let suggested_actions = payload
        .suggested_actions
        .iter()
        .map(|a| a.parse::<ActionType>().map_err(DiagnosisError::Validation))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Diagnosis {
        alert_id,
        root_cause: payload.root_cause,
        confidence: payload.confidence,
        alternative_hypotheses: payload.alternative_hypotheses,
        reasoning_trace: payload.reasoning_trace,
        suggested_actions,
    })
}

#[async_trait]
impl DiagnosisEngine for ReasoningEngine {
    fn name(&self) -> &str {
        "reasoning-engine"
    }

    #[instrument(skip(self, context), fields(alert_id = %context.alert.id, backend = %self.backend.name()))]
    async fn analyze(&self, context: &EnrichedContext) -> Result<Diagnosis, DiagnosisError> {
        match self.reason(context).await {
            Ok(diagnosis) => {
                debug!(confidence = diagnosis.confidence, "Reasoning diagnosis accepted");
                Ok(diagnosis)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    kind = %e.kind(),
                    fallback = %self.fallback.name(),
                    "Reasoning diagnosis failed, using fallback engine"
                );
                PipelineMetrics::record_diagnosis_fallback(e.kind().as_str());
                self.fallback.analyze(context).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnosis::RuleEngine;
    use crate::incident::{Alert, AlertSeverity};
    use crate::remediation::RiskLevel;
    use serde_json::json;
    use sn_connectors::{MockReasoningBackend, ReasoningError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and delegates to the built-in rules.
    struct CountingFallback {
        inner: RuleEngine,
        calls: AtomicUsize,
    }

    impl CountingFallback {
        fn new() -> Self {
            Self {
                inner: RuleEngine::builtin(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DiagnosisEngine for CountingFallback {
        fn name(&self) -> &str {
            "counting-fallback"
        }

        async fn analyze(&self, context: &EnrichedContext) -> Result<Diagnosis, DiagnosisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.analyze(context).await
        }
    }

    fn context() -> EnrichedContext {
        EnrichedContext::minimal(
            Alert::new("web-server-01", AlertSeverity::Critical, "High CPU usage detected (95%)")
                .with_metadata("cpu_usage", 95)
                .with_metadata("component", "cpu"),
        )
    }

    fn valid_payload() -> serde_json::Value {
        json!({
            "root_cause": "Runaway report query saturating CPU",
            "confidence": 0.72,
            "alternative_hypotheses": ["traffic spike", "noisy neighbour"],
            "reasoning_trace": "CPU rose after the nightly report job started",
            "suggested_actions": ["SCALE_UP", "NOTIFICATION"]
        })
    }

    fn engine(backend: MockReasoningBackend) -> (ReasoningEngine, Arc<CountingFallback>, Arc<MockReasoningBackend>) {
        let backend = Arc::new(backend);
        let fallback = Arc::new(CountingFallback::new());
        let engine = ReasoningEngine::new(backend.clone(), fallback.clone(), Duration::from_secs(5));
        (engine, fallback, backend)
    }

    #[tokio::test]
    async fn test_valid_payload_becomes_diagnosis() {
        let (engine, fallback, _) = engine(MockReasoningBackend::with_response(valid_payload()));
        let ctx = context();

        let d = engine.analyze(&ctx).await.unwrap();
        assert_eq!(d.alert_id, ctx.alert.id);
        assert_eq!(d.root_cause, "Runaway report query saturating CPU");
        assert_eq!(d.confidence, 0.72);
        assert_eq!(d.alternative_hypotheses.len(), 2);
        assert_eq!(
            d.suggested_actions,
            vec![ActionType::ScaleUp, ActionType::Notification]
        );
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_alert_id_is_ignored() {
        let mut payload = valid_payload();
        payload["alert_id"] = json!(Uuid::new_v4().to_string());
        let (engine, _, _) = engine(MockReasoningBackend::with_response(payload));
        let ctx = context();
        assert_eq!(engine.analyze(&ctx).await.unwrap().alert_id, ctx.alert.id);
    }

    async fn assert_falls_back(backend: MockReasoningBackend) {
        let (engine, fallback, _) = engine(backend);
        let ctx = context();

        let got = engine.analyze(&ctx).await.unwrap();
        let expected = RuleEngine::builtin().analyze(&ctx).await.unwrap();
        assert_eq!(got, expected);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_error_falls_back_once() {
        assert_falls_back(MockReasoningBackend::with_error(ReasoningError::Unavailable(
            "connection refused".into(),
        )))
        .await;
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_falls_back() {
        let mut payload = valid_payload();
        payload["confidence"] = json!(1.7);
        assert_falls_back(MockReasoningBackend::with_response(payload)).await;
    }

    #[tokio::test]
    async fn test_unknown_action_falls_back() {
        let mut payload = valid_payload();
        payload["suggested_actions"] = json!(["REBOOT_DATACENTER"]);
        assert_falls_back(MockReasoningBackend::with_response(payload)).await;
    }

    #[tokio::test]
    async fn test_missing_field_falls_back() {
        assert_falls_back(MockReasoningBackend::with_response(
            json!({"root_cause": "x", "confidence": 0.5}),
        ))
        .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back() {
        assert_falls_back(
            MockReasoningBackend::with_response(valid_payload()).with_delay(Duration::from_secs(60)),
        )
        .await;
    }

    #[test]
    fn test_prompt_embeds_alert_and_history() {
        let (engine, _, _) = engine(MockReasoningBackend::new("unused"));
        let mut ctx = context();

        let past = Alert::new("web-server-01", AlertSeverity::Warning, "CPU at 80%");
        ctx.recent_similar_incidents.push(Incident::from_alert(&past));

        let mut plan = RemediationPlan::new(
            Diagnosis::unknown(past.id),
            ActionType::RestartService,
            RiskLevel::Moderate,
            false,
        );
        plan.mark_executed().unwrap();
        ctx.past_remediations_for_source.push(plan);

        let prompt = engine.build_prompt(&ctx);
        assert!(prompt.system.contains("causal"));
        assert!(prompt.user.contains("Source:   web-server-01"));
        assert!(prompt.user.contains(r#"{"component":"cpu","cpu_usage":95}"#));
        assert!(prompt
            .user
            .contains("- [OPEN] web-server-01: CPU at 80% (severity=WARNING)"));
        assert!(prompt
            .user
            .contains("- [EXECUTED] RESTART_SERVICE: Unknown Anomaly"));
        assert!(prompt.user.contains("MANUAL_INTERVENTION"));
    }

    #[test]
    fn test_prompt_marks_empty_history() {
        let (engine, _, _) = engine(MockReasoningBackend::new("unused"));
        let prompt = engine.build_prompt(&context());
        assert_eq!(prompt.user.matches("    None.").count(), 2);
    }

    #[test]
    fn test_parse_rejects_nan_and_blank_root_cause() {
        let id = Uuid::new_v4();
        let mut blank = valid_payload();
        blank["root_cause"] = json!("   ");
        assert!(matches!(
            parse_diagnosis(blank, id),
            Err(DiagnosisError::Validation(_))
        ));

        let mut negative = valid_payload();
        negative["confidence"] = json!(-0.1);
        assert!(parse_diagnosis(negative, id).is_err());
    }
}
