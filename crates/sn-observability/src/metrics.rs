//! Metrics for the Sentinel pipeline.
//!
//! Uses the `metrics` facade; whichever recorder the binary installs
//! receives the values. Without a recorder every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::sync::Once;
use std::time::Duration;

static REGISTER: Once = Once::new();

/// Recording helpers for pipeline metrics.
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Registers metric descriptions. Safe to call more than once.
    pub fn register() {
        REGISTER.call_once(|| {
            describe_counter!(
                "sn_alerts_processed_total",
                "Alerts that completed the pipeline, by audit result"
            );
            describe_counter!(
                "sn_alerts_failed_total",
                "Alerts abandoned by a stage failure, by stage"
            );
            describe_counter!(
                "sn_enrichment_degraded_total",
                "Enrichments that fell back to an empty history"
            );
            describe_counter!(
                "sn_diagnosis_fallbacks_total",
                "Reasoning failures answered by the fallback engine, by error kind"
            );
            describe_counter!(
                "sn_actions_executed_total",
                "Action executions, by action type and outcome"
            );
            describe_counter!(
                "sn_actions_refused_total",
                "Executions refused because the plan was not approved"
            );
            describe_histogram!(
                "sn_action_duration_seconds",
                "Action side-effect duration"
            );
            describe_histogram!(
                "sn_reasoning_latency_seconds",
                "Reasoning backend round-trip latency"
            );
        });
    }

    /// Records a completed pipeline run.
    pub fn record_alert_processed(result: &str) {
        counter!("sn_alerts_processed_total", "result" => result.to_string()).increment(1);
    }

    /// Records a pipeline run abandoned at `stage`.
    pub fn record_alert_failed(stage: &str) {
        counter!("sn_alerts_failed_total", "stage" => stage.to_string()).increment(1);
    }

    /// Records a degraded enrichment.
    pub fn record_enrichment_degraded() {
        counter!("sn_enrichment_degraded_total").increment(1);
    }

    /// Records a reasoning failure that triggered the fallback engine.
    pub fn record_diagnosis_fallback(kind: &str) {
        counter!("sn_diagnosis_fallbacks_total", "kind" => kind.to_string()).increment(1);
    }

    /// Records the reasoning backend round trip.
    pub fn record_reasoning_latency(elapsed: Duration) {
        histogram!("sn_reasoning_latency_seconds").record(elapsed.as_secs_f64());
    }

    /// Records an action execution outcome.
    pub fn record_action(action_type: &str, success: bool, elapsed: Duration) {
        let outcome = if success { "success" } else { "failure" };
        counter!(
            "sn_actions_executed_total",
            "action" => action_type.to_string(),
            "outcome" => outcome
        )
        .increment(1);
        histogram!("sn_action_duration_seconds", "action" => action_type.to_string())
            .record(elapsed.as_secs_f64());
    }

    /// Records an execution refused by the approval gate.
    pub fn record_action_refused(action_type: &str) {
        counter!("sn_actions_refused_total", "action" => action_type.to_string()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        PipelineMetrics::register();
        PipelineMetrics::register();
        PipelineMetrics::record_alert_processed("EXECUTED");
        PipelineMetrics::record_action("CLEAR_CACHE", true, Duration::from_millis(5));
        PipelineMetrics::record_diagnosis_fallback("validation");
    }
}
