//! Configuration validation for Sentinel.
//!
//! Every section is checked and all problems are reported together, so a
//! broken file can be fixed in one pass.

use crate::config::{AppConfig, HistoryBackend};
use colored::Colorize;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Problems that prevent the pipeline from starting.
    pub errors: Vec<String>,
    /// Problems worth fixing that do not prevent startup.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Longest accepted history lookback window, ten years.
const MAX_LOOKBACK_HOURS: u32 = 24 * 365 * 10;

/// Validates application configuration before startup.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_enrichment(config, &mut result);
        Self::validate_reasoning(config, &mut result);
        Self::validate_rules(config, &mut result);
        Self::validate_executor(config, &mut result);
        Self::validate_storage(config, &mut result);
        Self::validate_ingestion(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_enrichment(config: &AppConfig, result: &mut ValidationResult) {
        let enrichment = &config.enrichment;
        if enrichment.lookback_hours == 0 {
            result.add_error("enrichment.lookback_hours must be greater than 0");
        } else if enrichment.lookback_hours > MAX_LOOKBACK_HOURS {
            result.add_error(format!(
                "enrichment.lookback_hours must be at most {}, got {}",
                MAX_LOOKBACK_HOURS, enrichment.lookback_hours
            ));
        }
        if enrichment.recent_incident_limit == 0 {
            result.add_error("enrichment.recent_incident_limit must be greater than 0");
        }
        if enrichment.past_remediation_limit == 0 {
            result.add_error("enrichment.past_remediation_limit must be greater than 0");
        }
        if enrichment.query_timeout_secs == 0 {
            result.add_error("enrichment.query_timeout_secs must be greater than 0");
        }
    }

    fn validate_reasoning(config: &AppConfig, result: &mut ValidationResult) {
        let reasoning = &config.reasoning;
        if !reasoning.enabled {
            return;
        }
        if reasoning.endpoint.trim().is_empty() {
            result.add_error("reasoning.endpoint is required when reasoning is enabled");
        } else if !reasoning.endpoint.starts_with("http://")
            && !reasoning.endpoint.starts_with("https://")
        {
            result.add_error(format!(
                "reasoning.endpoint must be an http(s) URL, got '{}'",
                reasoning.endpoint
            ));
        }
        if reasoning.model.trim().is_empty() {
            result.add_error("reasoning.model is required when reasoning is enabled");
        }
        if reasoning.timeout_secs == 0 {
            result.add_error("reasoning.timeout_secs must be greater than 0");
        }
        if !(0.0..=2.0).contains(&reasoning.temperature) {
            result.add_error(format!(
                "reasoning.temperature must be within [0.0, 2.0], got {}",
                reasoning.temperature
            ));
        }
        if reasoning.api_key.as_deref().map_or(true, str::is_empty) {
            result.add_warning(
                "reasoning.api_key is not set (SENTINEL_REASONING_API_KEY); requests are sent unauthenticated",
            );
        }
    }

    fn validate_rules(config: &AppConfig, result: &mut ValidationResult) {
        match config.rules.load() {
            Ok(rules) => {
                if rules.rules.iter().all(|r| !r.enabled) {
                    result.add_warning("no diagnostic rule is enabled; every alert will be Unknown Anomaly");
                }
                for problem in rules.validate() {
                    result.add_error(format!("rules: {}", problem));
                }
            }
            Err(e) => result.add_error(format!("rules: {:#}", e)),
        }
    }

    fn validate_executor(config: &AppConfig, result: &mut ValidationResult) {
        if config.executor.action_timeout_secs == 0 {
            result.add_error("executor.action_timeout_secs must be greater than 0");
        }
        if config.executor.simulated_latency_ms >= config.executor.action_timeout_secs * 1000 {
            result.add_warning("executor.simulated_latency_ms exceeds the action timeout; every action will fail");
        }
    }

    fn validate_storage(config: &AppConfig, result: &mut ValidationResult) {
        if config.history.backend == HistoryBackend::Sqlite {
            let url = config.history.database_url.trim();
            if url.is_empty() {
                result.add_error("history.database_url is required for the sqlite backend");
            } else if !url.starts_with("sqlite:") {
                result.add_error(format!(
                    "history.database_url must be a sqlite URL, got '{}'",
                    url
                ));
            }
        }
        if config.audit.file_path.as_os_str().is_empty() {
            result.add_error("audit.file_path must not be empty");
        }
    }

    fn validate_ingestion(config: &AppConfig, result: &mut ValidationResult) {
        let ingestion = &config.ingestion;
        if ingestion.interval_secs == 0 {
            result.add_error("ingestion.interval_secs must be greater than 0");
        }
        if ingestion.channel_capacity == 0 {
            result.add_error("ingestion.channel_capacity must be greater than 0");
        }
        if !(0.0..=1.0).contains(&ingestion.emission_probability) {
            result.add_error(format!(
                "ingestion.emission_probability must be within [0.0, 1.0], got {}",
                ingestion.emission_probability
            ));
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if config.logging.level.parse::<tracing::Level>().is_err() {
            result.add_error(format!(
                "logging.level must be one of trace, debug, info, warn, error; got '{}'",
                config.logging.level
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sn_core::{ActionType, Rule, RuleCondition};

    #[test]
    fn test_default_config_is_valid() {
        let result = ConfigValidator::validate(&AppConfig::default());
        assert!(!result.has_errors(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = AppConfig::default();
        config.enrichment.lookback_hours = 0;
        config.enrichment.recent_incident_limit = 0;
        config.ingestion.channel_capacity = 0;
        config.logging.level = "loud".to_string();

        let result = config.validate();
        assert_eq!(result.errors.len(), 4, "{:?}", result.errors);
    }

    #[test]
    fn test_lookback_window_is_bounded() {
        let mut config = AppConfig::default();
        config.enrichment.lookback_hours = u32::MAX;

        let result = config.validate();
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("lookback_hours must be at most"));

        config.enrichment.lookback_hours = MAX_LOOKBACK_HOURS;
        assert!(!config.validate().has_errors());
    }

    #[test]
    fn test_url_ignored_without_sqlite_backend() {
        let mut config = AppConfig::default();
        config.history.backend = HistoryBackend::Disabled;
        config.history.database_url = String::new();
        assert!(!config.validate().has_errors());
    }

    #[test]
    fn test_reasoning_requires_endpoint() {
        let mut config = AppConfig::default();
        config.reasoning.enabled = true;
        config.reasoning.endpoint = String::new();

        let result = config.validate();
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("reasoning.endpoint is required")));
        assert!(result.warnings.iter().any(|w| w.contains("api_key")));
    }

    #[test]
    fn test_disabled_reasoning_is_not_checked() {
        let mut config = AppConfig::default();
        config.reasoning.endpoint = String::new();
        assert!(!config.validate().has_errors());
    }

    #[test]
    fn test_invalid_rules_reported() {
        let mut config = AppConfig::default();
        config.rules.inline = vec![Rule::new(
            "Broken",
            RuleCondition::MessageMatches("(unclosed".to_string()),
            "Something on {host",
            vec![ActionType::Notification],
        )];

        let result = config.validate();
        assert!(result.has_errors());
        assert!(result.errors.iter().all(|e| e.starts_with("rules: ")));
    }

    #[test]
    fn test_missing_rules_file_reported() {
        let mut config = AppConfig::default();
        config.rules.path = Some("/nonexistent/rules.yaml".into());

        let result = config.validate();
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("Failed to read rules file"));
    }

    #[test]
    fn test_history_requires_sqlite_url() {
        let mut config = AppConfig::default();
        config.history.backend = HistoryBackend::Sqlite;
        config.history.database_url = "postgres://db/sentinel".to_string();

        let result = config.validate();
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("sqlite"));
    }
}
