//! Structured logging setup.
//!
//! One global `tracing` subscriber, filtered per workspace crate. `RUST_LOG`
//! overrides the configured level when set.

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Crates whose events pass the default filter.
const LOG_TARGETS: [&str; 6] = [
    "sn_core",
    "sn_policy",
    "sn_actions",
    "sn_connectors",
    "sn_observability",
    "sentinel",
];

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    /// Emit one JSON object per event instead of human-readable lines.
    pub json_format: bool,
    /// Log span open and close, which shows per-alert stage timing.
    pub include_spans: bool,
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            include_spans: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Debug level with span timing and source locations, for `--verbose`.
    pub fn verbose() -> Self {
        Self {
            level: Level::DEBUG,
            include_spans: true,
            include_location: true,
            ..Self::default()
        }
    }

    /// Sets the level from its name, keeping the current level when the
    /// name is not one of `trace`, `debug`, `info`, `warn`, `error`.
    pub fn with_level_name(mut self, name: &str) -> Self {
        if let Ok(level) = name.parse::<Level>() {
            self.level = level;
        }
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json_format = json;
        self
    }

    fn filter_directive(&self) -> String {
        LOG_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Installs the global subscriber. A second call leaves the first one in place.
pub fn init_logging_with_config(config: LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let json_layer = config.json_format.then(|| {
        fmt::layer()
            .json()
            .with_span_events(config.span_events())
            .with_file(config.include_location)
            .with_line_number(config.include_location)
    });
    let text_layer = (!config.json_format).then(|| {
        fmt::layer()
            .with_span_events(config.span_events())
            .with_file(config.include_location)
            .with_line_number(config.include_location)
    });

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init();
    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.json_format);
        assert_eq!(config.span_events(), FmtSpan::NONE);
    }

    #[test]
    fn test_verbose_config() {
        let config = LoggingConfig::verbose().with_json(true);
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.json_format);
        assert_eq!(config.span_events(), FmtSpan::NEW | FmtSpan::CLOSE);
    }

    #[test]
    fn test_level_name_override() {
        let config = LoggingConfig::default().with_level_name("warn");
        assert_eq!(config.level, Level::WARN);

        let config = LoggingConfig::default().with_level_name("chatty");
        assert_eq!(config.level, Level::INFO);
    }

    #[test]
    fn test_filter_directive_covers_workspace_crates() {
        let directive = LoggingConfig::verbose().filter_directive();
        assert!(directive.contains("sn_core=DEBUG"));
        assert!(directive.contains("sentinel=DEBUG"));
        assert_eq!(directive.split(',').count(), LOG_TARGETS.len());
    }

    #[test]
    fn test_repeated_init_does_not_panic() {
        init_logging_with_config(LoggingConfig::default());
        init_logging_with_config(LoggingConfig::default().with_json(true));
    }
}
