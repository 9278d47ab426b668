//! Rule-based diagnosis.
//!
//! Rules are data: a predicate tree over the alert, a root-cause template,
//! and a fixed list of suggested actions. Rules are evaluated in order and
//! the first match wins.

use super::{DiagnosisEngine, DiagnosisError};
use crate::enrichment::EnrichedContext;
use crate::incident::{Alert, AlertSeverity};
use crate::remediation::{ActionType, Diagnosis};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Rendered in place of a template key the alert's metadata lacks.
pub const MISSING_VALUE: &str = "N/A";

/// Confidence of every rule diagnosis. Rules are deterministic.
pub const RULE_CONFIDENCE: f64 = 1.0;

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

/// Predicate over an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCondition {
    /// Message contains the text, ignoring case.
    MessageContains(String),
    /// Message contains any of the texts, ignoring case.
    MessageContainsAny(Vec<String>),
    /// Message matches the regular expression.
    MessageMatches(String),
    /// Source equals the value exactly.
    SourceIs(String),
    /// Severity is at least the given level.
    SeverityAtLeast(AlertSeverity),
    /// Metadata contains the key.
    MetadataHasKey(String),
    /// All sub-conditions match.
    All(Vec<RuleCondition>),
    /// Any sub-condition matches.
    Any(Vec<RuleCondition>),
    /// Sub-condition does not match.
    Not(Box<RuleCondition>),
}

impl RuleCondition {
    pub fn evaluate(&self, alert: &Alert) -> bool {
        match self {
            RuleCondition::MessageContains(needle) => contains_ignore_case(&alert.message, needle),

            RuleCondition::MessageContainsAny(needles) => needles
                .iter()
                .any(|n| contains_ignore_case(&alert.message, n)),

            RuleCondition::MessageMatches(pattern) => match Regex::new(pattern) {
                Ok(re) => re.is_match(&alert.message),
                Err(_) => false,
            },

            RuleCondition::SourceIs(source) => alert.source == *source,

            RuleCondition::SeverityAtLeast(level) => alert.severity >= *level,

            RuleCondition::MetadataHasKey(key) => alert.metadata.contains_key(key),

            RuleCondition::All(conditions) => conditions.iter().all(|c| c.evaluate(alert)),

            RuleCondition::Any(conditions) => conditions.iter().any(|c| c.evaluate(alert)),

            RuleCondition::Not(condition) => !condition.evaluate(alert),
        }
    }

    fn collect_problems(&self, rule: &str, problems: &mut Vec<String>) {
        match self {
            RuleCondition::MessageMatches(pattern) => {
                if let Err(e) = Regex::new(pattern) {
                    problems.push(format!("rule '{}': invalid regex '{}': {}", rule, pattern, e));
                }
            }
            RuleCondition::MessageContainsAny(needles) if needles.is_empty() => {
                problems.push(format!("rule '{}': message_contains_any has no values", rule));
            }
            RuleCondition::All(conditions) | RuleCondition::Any(conditions) => {
                for c in conditions {
                    c.collect_problems(rule, problems);
                }
            }
            RuleCondition::Not(condition) => condition.collect_problems(rule, problems),
            _ => {}
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// One diagnostic rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub condition: RuleCondition,
    /// Root cause with `{key}` placeholders filled from alert metadata.
    pub root_cause_template: String,
    pub suggested_actions: Vec<ActionType>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    pub fn new(
        name: &str,
        condition: RuleCondition,
        root_cause_template: &str,
        suggested_actions: Vec<ActionType>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            condition,
            root_cause_template: root_cause_template.to_string(),
            suggested_actions,
            enabled: true,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn matches(&self, alert: &Alert) -> bool {
        self.enabled && self.condition.evaluate(alert)
    }

    /// Fills the template from the alert's metadata.
    pub fn render_root_cause(&self, alert: &Alert) -> String {
        placeholder_regex()
            .replace_all(&self.root_cause_template, |caps: &regex::Captures<'_>| {
                alert
                    .metadata_text(&caps[1])
                    .unwrap_or_else(|| MISSING_VALUE.to_string())
            })
            .into_owned()
    }

    pub fn diagnose(&self, alert: &Alert) -> Diagnosis {
        Diagnosis {
            alert_id: alert.id,
            root_cause: self.render_root_cause(alert),
            confidence: RULE_CONFIDENCE,
            alternative_hypotheses: Vec::new(),
            reasoning_trace: format!("Matched rule '{}'", self.name),
            suggested_actions: self.suggested_actions.clone(),
        }
    }
}

/// An ordered rule library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The built-in library for common infrastructure alerts.
    pub fn builtin() -> Self {
        Self::new(vec![
            Rule::new(
                "High CPU",
                RuleCondition::MessageContains("cpu".into()),
                "CPU saturation on {component} at {cpu_usage}%",
                vec![ActionType::ScaleUp, ActionType::RestartService],
            ),
            Rule::new(
                "Memory Leak",
                RuleCondition::MessageContains("memory".into()),
                "Memory leak detected in {component}",
                vec![ActionType::RestartService],
            ),
            Rule::new(
                "Disk Space",
                RuleCondition::MessageContainsAny(vec!["disk".into(), "space".into()]),
                "Disk {mount} nearly full",
                vec![ActionType::ClearCache, ActionType::Notification],
            ),
            Rule::new(
                "DB Connection",
                RuleCondition::MessageContains("connection".into()),
                "Database unavailable (Code {error_code})",
                vec![ActionType::RestartService, ActionType::ManualIntervention],
            ),
        ])
    }

    /// Every problem in the library. Empty when the library is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for rule in &self.rules {
            if rule.name.trim().is_empty() {
                problems.push("rule with empty name".to_string());
            }
            if rule.root_cause_template.trim().is_empty() {
                problems.push(format!("rule '{}': empty root_cause_template", rule.name));
            }
            let stripped = placeholder_regex().replace_all(&rule.root_cause_template, "");
            if stripped.contains('{') || stripped.contains('}') {
                problems.push(format!(
                    "rule '{}': malformed placeholder in template '{}'",
                    rule.name, rule.root_cause_template
                ));
            }
            rule.condition.collect_problems(&rule.name, &mut problems);
        }
        problems
    }
}

/// Deterministic diagnosis by ordered rule matching.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: RuleSet,
}

impl RuleEngine {
    /// Creates an engine, rejecting libraries with invalid rules.
    pub fn new(rules: RuleSet) -> Result<Self, DiagnosisError> {
        let problems = rules.validate();
        if !problems.is_empty() {
            return Err(DiagnosisError::Validation(problems.join("; ")));
        }
        Ok(Self { rules })
    }

    pub fn builtin() -> Self {
        Self {
            rules: RuleSet::builtin(),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// First matching rule's diagnosis, or the unknown-anomaly diagnosis.
    pub fn diagnose(&self, alert: &Alert) -> Diagnosis {
        match self.rules.rules.iter().find(|r| r.matches(alert)) {
            Some(rule) => {
                info!(alert_id = %alert.id, rule = %rule.name, "Alert matched rule");
                rule.diagnose(alert)
            }
            None => {
                warn!(alert_id = %alert.id, message = %alert.message, "No rule matched alert");
                Diagnosis::unknown(alert.id)
            }
        }
    }
}

#[async_trait]
impl DiagnosisEngine for RuleEngine {
    fn name(&self) -> &str {
        "rule-engine"
    }

    async fn analyze(&self, context: &EnrichedContext) -> Result<Diagnosis, DiagnosisError> {
        Ok(self.diagnose(&context.alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RuleEngine {
        RuleEngine::builtin()
    }

    #[test]
    fn test_cpu_rule() {
        let alert = Alert::new("web-server-01", AlertSeverity::Critical, "High CPU usage detected (95%)")
            .with_metadata("cpu_usage", 95)
            .with_metadata("component", "cpu");

        let d = engine().diagnose(&alert);
        assert_eq!(d.root_cause, "CPU saturation on cpu at 95%");
        assert_eq!(
            d.suggested_actions,
            vec![ActionType::ScaleUp, ActionType::RestartService]
        );
        assert_eq!(d.confidence, 1.0);
        assert_eq!(d.alert_id, alert.id);
    }

    #[test]
    fn test_disk_rule() {
        let alert = Alert::new("db-primary", AlertSeverity::Warning, "Disk space low (/var/log)")
            .with_metadata("mount", "/var/log");

        let d = engine().diagnose(&alert);
        assert_eq!(d.root_cause, "Disk /var/log nearly full");
        assert_eq!(
            d.suggested_actions,
            vec![ActionType::ClearCache, ActionType::Notification]
        );
    }

    #[test]
    fn test_db_connection_rule_renders_numbers() {
        let alert = Alert::new("inventory-db", AlertSeverity::Fatal, "Database connection refused")
            .with_metadata("error_code", 5003);
        let d = engine().diagnose(&alert);
        assert_eq!(d.root_cause, "Database unavailable (Code 5003)");
    }

    #[test]
    fn test_matching_ignores_case() {
        let alert = Alert::new("api-gateway", AlertSeverity::Warning, "MEMORY LEAK DETECTED")
            .with_metadata("component", "memory");
        let d = engine().diagnose(&alert);
        assert_eq!(d.root_cause, "Memory leak detected in memory");
    }

    #[test]
    fn test_missing_metadata_renders_placeholder() {
        let alert = Alert::new("web-01", AlertSeverity::Critical, "cpu pegged");
        let d = engine().diagnose(&alert);
        assert_eq!(d.root_cause, "CPU saturation on N/A at N/A%");
    }

    #[test]
    fn test_first_match_wins() {
        // Mentions both cpu and memory; cpu comes first in the library.
        let alert = Alert::new("web-01", AlertSeverity::Critical, "cpu and memory pressure");
        let d = engine().diagnose(&alert);
        assert!(d.root_cause.starts_with("CPU saturation"));
    }

    #[test]
    fn test_unmatched_alert_is_unknown_anomaly() {
        let alert = Alert::new("search-service", AlertSeverity::Info, "Something weird happened");
        let d = engine().diagnose(&alert);
        assert_eq!(d.root_cause, "Unknown Anomaly");
        assert_eq!(d.confidence, 0.0);
        assert_eq!(d.suggested_actions, vec![ActionType::ManualIntervention]);
    }

    #[test]
    fn test_disabled_rule_is_skipped() {
        let mut rules = RuleSet::builtin();
        rules.rules[0].enabled = false;
        let engine = RuleEngine::new(rules).unwrap();
        let alert = Alert::new("web-01", AlertSeverity::Critical, "High CPU");
        assert_eq!(engine.diagnose(&alert).root_cause, "Unknown Anomaly");
    }

    #[test]
    fn test_composite_conditions() {
        let condition = RuleCondition::All(vec![
            RuleCondition::SeverityAtLeast(AlertSeverity::Critical),
            RuleCondition::Any(vec![
                RuleCondition::SourceIs("edge-fw".into()),
                RuleCondition::MessageMatches(r"(?i)syn flood".into()),
            ]),
            RuleCondition::Not(Box::new(RuleCondition::MetadataHasKey("test".into()))),
        ]);

        let hit = Alert::new("lb-01", AlertSeverity::Fatal, "SYN flood from 10.0.0.7");
        let low = Alert::new("edge-fw", AlertSeverity::Warning, "SYN flood");
        let tagged = Alert::new("edge-fw", AlertSeverity::Critical, "probe").with_metadata("test", true);

        assert!(condition.evaluate(&hit));
        assert!(!condition.evaluate(&low));
        assert!(!condition.evaluate(&tagged));
    }

    #[test]
    fn test_builtin_library_is_valid() {
        assert!(RuleSet::builtin().validate().is_empty());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let rules = RuleSet::new(vec![
            Rule::new(
                "bad regex",
                RuleCondition::MessageMatches("(unclosed".into()),
                "x",
                vec![],
            ),
            Rule::new(
                "bad template",
                RuleCondition::MessageContains("x".into()),
                "Disk {mount nearly full",
                vec![],
            ),
        ]);
        let problems = rules.validate();
        assert_eq!(problems.len(), 2);
        assert!(RuleEngine::new(rules).is_err());
    }

    #[test]
    fn test_rule_library_from_yaml() {
        let yaml = r#"
rules:
  - name: Certificate Expiry
    condition:
      all:
        - message_contains: certificate
        - severity_at_least: WARNING
    root_cause_template: "Certificate for {domain} expires in {days} days"
    suggested_actions: [NOTIFICATION]
"#;
        let rules: RuleSet = serde_yaml::from_str(yaml).unwrap();
        let engine = RuleEngine::new(rules).unwrap();

        let alert = Alert::new("ingress", AlertSeverity::Critical, "TLS certificate expiring")
            .with_metadata("domain", "shop.example.com")
            .with_metadata("days", 3);
        let d = engine.diagnose(&alert);
        assert_eq!(d.root_cause, "Certificate for shop.example.com expires in 3 days");
        assert_eq!(d.suggested_actions, vec![ActionType::Notification]);
    }
}
